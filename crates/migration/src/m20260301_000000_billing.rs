//! Initial schema migration - creates all tables from scratch.
//!
//! It creates the complete schema for the billing engine:
//!
//! - `accounts`, `clients`, `bank_accounts`: lookups owned by the wider
//!   system, kept minimal
//! - `invoices`: invoice header with its money fields and lifecycle state
//! - `invoice_line_items`: priced lines of an invoice
//! - `payments`: ledger of an invoice
//! - `invoice_sequences`: per-account numbering counter
//! - `recurring_invoices`: recurring templates
//! - `recurring_invoice_items`: lines of a template
//!
//! Money columns are two decimal strings.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    Name,
    Email,
}

#[derive(Iden)]
enum Clients {
    Table,
    Id,
    AccountId,
    Name,
    Email,
}

#[derive(Iden)]
enum BankAccounts {
    Table,
    Id,
    AccountId,
    Name,
}

#[derive(Iden)]
enum Invoices {
    Table,
    Id,
    AccountId,
    Number,
    ClientId,
    BankAccountId,
    RecurringTemplateId,
    IssueDate,
    ScheduledAt,
    Status,
    OrderNumber,
    ProjectNumber,
    Notes,
    Subtotal,
    Tax,
    TaxRate,
    Total,
    AmountPaid,
    PaidDate,
    SentAt,
    DispatchClaimedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum InvoiceLineItems {
    Table,
    Id,
    InvoiceId,
    Description,
    Quantity,
    UnitPrice,
    Amount,
    Position,
}

#[derive(Iden)]
enum Payments {
    Table,
    Id,
    InvoiceId,
    Amount,
    PaidOn,
    Method,
    CreatedAt,
}

#[derive(Iden)]
enum InvoiceSequences {
    Table,
    AccountId,
    LastValue,
}

#[derive(Iden)]
enum RecurringInvoices {
    Table,
    Id,
    AccountId,
    ClientId,
    BankAccountId,
    Cadence,
    StartDate,
    EndDate,
    NextGenerationDate,
    Active,
    TaxRate,
    Notes,
    LastGeneratedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum RecurringInvoiceItems {
    Table,
    Id,
    TemplateId,
    Description,
    Quantity,
    UnitPrice,
    Position,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Lookups
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(ColumnDef::new(Accounts::Email).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Clients::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Clients::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Clients::AccountId).string().not_null())
                    .col(ColumnDef::new(Clients::Name).string().not_null())
                    .col(ColumnDef::new(Clients::Email).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-clients-account_id")
                    .table(Clients::Table)
                    .col(Clients::AccountId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BankAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BankAccounts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BankAccounts::AccountId).string().not_null())
                    .col(ColumnDef::new(BankAccounts::Name).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Invoices
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Invoices::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Invoices::AccountId).string().not_null())
                    .col(ColumnDef::new(Invoices::Number).string().not_null())
                    .col(ColumnDef::new(Invoices::ClientId).string().not_null())
                    .col(ColumnDef::new(Invoices::BankAccountId).string())
                    .col(ColumnDef::new(Invoices::RecurringTemplateId).string())
                    .col(ColumnDef::new(Invoices::IssueDate).date().not_null())
                    .col(ColumnDef::new(Invoices::ScheduledAt).timestamp())
                    .col(
                        ColumnDef::new(Invoices::Status)
                            .string()
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(Invoices::OrderNumber).string())
                    .col(ColumnDef::new(Invoices::ProjectNumber).string())
                    .col(ColumnDef::new(Invoices::Notes).text())
                    .col(ColumnDef::new(Invoices::Subtotal).string().not_null())
                    .col(ColumnDef::new(Invoices::Tax).string().not_null())
                    .col(ColumnDef::new(Invoices::TaxRate).string().not_null())
                    .col(ColumnDef::new(Invoices::Total).string().not_null())
                    .col(
                        ColumnDef::new(Invoices::AmountPaid)
                            .string()
                            .not_null()
                            .default("0.00"),
                    )
                    .col(ColumnDef::new(Invoices::PaidDate).date())
                    .col(ColumnDef::new(Invoices::SentAt).timestamp())
                    .col(ColumnDef::new(Invoices::DispatchClaimedAt).timestamp())
                    .col(ColumnDef::new(Invoices::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Invoices::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-invoices-client_id")
                            .from(Invoices::Table, Invoices::ClientId)
                            .to(Clients::Table, Clients::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invoices-account_id-number-unique")
                    .table(Invoices::Table)
                    .col(Invoices::AccountId)
                    .col(Invoices::Number)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invoices-status-scheduled_at")
                    .table(Invoices::Table)
                    .col(Invoices::Status)
                    .col(Invoices::ScheduledAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InvoiceLineItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InvoiceLineItems::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InvoiceLineItems::InvoiceId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvoiceLineItems::Description)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InvoiceLineItems::Quantity).string().not_null())
                    .col(ColumnDef::new(InvoiceLineItems::UnitPrice).string().not_null())
                    .col(ColumnDef::new(InvoiceLineItems::Amount).string().not_null())
                    .col(
                        ColumnDef::new(InvoiceLineItems::Position)
                            .integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-invoice_line_items-invoice_id")
                            .from(InvoiceLineItems::Table, InvoiceLineItems::InvoiceId)
                            .to(Invoices::Table, Invoices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invoice_line_items-invoice_id")
                    .table(InvoiceLineItems::Table)
                    .col(InvoiceLineItems::InvoiceId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Payments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payments::InvoiceId).string().not_null())
                    .col(ColumnDef::new(Payments::Amount).string().not_null())
                    .col(ColumnDef::new(Payments::PaidOn).date().not_null())
                    .col(ColumnDef::new(Payments::Method).string().not_null())
                    .col(ColumnDef::new(Payments::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-invoice_id")
                            .from(Payments::Table, Payments::InvoiceId)
                            .to(Invoices::Table, Invoices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payments-invoice_id")
                    .table(Payments::Table)
                    .col(Payments::InvoiceId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Invoice sequences
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(InvoiceSequences::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InvoiceSequences::AccountId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InvoiceSequences::LastValue)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Recurring templates
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(RecurringInvoices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RecurringInvoices::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RecurringInvoices::AccountId).string().not_null())
                    .col(ColumnDef::new(RecurringInvoices::ClientId).string().not_null())
                    .col(ColumnDef::new(RecurringInvoices::BankAccountId).string())
                    .col(ColumnDef::new(RecurringInvoices::Cadence).string().not_null())
                    .col(ColumnDef::new(RecurringInvoices::StartDate).date().not_null())
                    .col(ColumnDef::new(RecurringInvoices::EndDate).date())
                    .col(
                        ColumnDef::new(RecurringInvoices::NextGenerationDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoices::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(RecurringInvoices::TaxRate).string().not_null())
                    .col(ColumnDef::new(RecurringInvoices::Notes).text())
                    .col(ColumnDef::new(RecurringInvoices::LastGeneratedAt).timestamp())
                    .col(
                        ColumnDef::new(RecurringInvoices::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoices::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-recurring_invoices-client_id")
                            .from(RecurringInvoices::Table, RecurringInvoices::ClientId)
                            .to(Clients::Table, Clients::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-recurring_invoices-active-next_generation_date")
                    .table(RecurringInvoices::Table)
                    .col(RecurringInvoices::Active)
                    .col(RecurringInvoices::NextGenerationDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RecurringInvoiceItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RecurringInvoiceItems::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoiceItems::TemplateId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoiceItems::Description)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoiceItems::Quantity)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoiceItems::UnitPrice)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RecurringInvoiceItems::Position)
                            .integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-recurring_invoice_items-template_id")
                            .from(RecurringInvoiceItems::Table, RecurringInvoiceItems::TemplateId)
                            .to(RecurringInvoices::Table, RecurringInvoices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RecurringInvoiceItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RecurringInvoices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InvoiceSequences::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InvoiceLineItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BankAccounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Clients::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        Ok(())
    }
}
