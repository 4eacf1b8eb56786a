use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    BulkItem, BulkReport, CreateInvoiceCmd, EngineError, Invoice, InvoiceListFilter, InvoiceMeta,
    InvoiceStatus, LineItem, MAX_BULK_ITEMS, ResultEngine, Totals, TransitionCause,
    UpdateInvoiceCmd, invoices, line_items,
    money::{self, format_money},
    payments,
    status::{self, ledger_status_after_removal},
    util::{normalize_optional_text, normalize_required_id},
};

use super::{Engine, payments::apply_ledger_status, with_tx};

/// Everything needed to persist a new invoice, already validated and priced.
pub(super) struct NewInvoice {
    pub account_id: String,
    pub client_id: String,
    pub bank_account_id: Option<String>,
    pub recurring_template_id: Option<Uuid>,
    pub issue_date: NaiveDate,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub meta: InvoiceMeta,
    pub totals: Totals,
}

fn normalize_meta(meta: &InvoiceMeta) -> InvoiceMeta {
    InvoiceMeta {
        order_number: normalize_optional_text(meta.order_number.as_deref()),
        project_number: normalize_optional_text(meta.project_number.as_deref()),
        notes: normalize_optional_text(meta.notes.as_deref()),
    }
}

fn priced_items(totals: &Totals) -> Vec<LineItem> {
    totals
        .lines
        .iter()
        .enumerate()
        .map(|(position, line)| LineItem::from_priced(line, position))
        .collect()
}

impl Engine {
    /// Create an invoice with its line items.
    ///
    /// Totals are always computed here; a caller supplied total is only
    /// compared against them. The number is issued inside the same
    /// transaction as the insert, so a failed create leaves no gap and no
    /// partial invoice.
    pub async fn create_invoice(&self, cmd: CreateInvoiceCmd) -> ResultEngine<Invoice> {
        let now = Utc::now();
        let account_id = normalize_required_id(&cmd.account_id, "account id")?;
        let client_id = normalize_required_id(&cmd.client_id, "client id")?;
        let totals = money::calculate_totals(&cmd.items, &cmd.tax_rate)?;
        if let Some(client_total) = cmd.client_total.as_deref() {
            self.check_client_total(totals.total, client_total)?;
        }

        let new_invoice = NewInvoice {
            account_id,
            client_id,
            bank_account_id: normalize_optional_text(cmd.bank_account_id.as_deref()),
            recurring_template_id: None,
            issue_date: cmd.issue_date.unwrap_or_else(|| now.date_naive()),
            scheduled_at: cmd.scheduled_at,
            meta: normalize_meta(&cmd.meta),
            totals,
        };

        let invoice = with_tx!(self, |db_tx| {
            self.insert_invoice(&db_tx, new_invoice, now).await
        })?;

        tracing::info!(
            account_id = %invoice.account_id,
            number = %invoice.number,
            total = %invoice.total,
            status = %invoice.status,
            "invoice created"
        );
        Ok(invoice)
    }

    /// Create up to [`MAX_BULK_ITEMS`] invoices, each in its own transaction.
    ///
    /// A failing item is recorded with its index and does not affect the
    /// others.
    pub async fn bulk_create_invoices(
        &self,
        cmds: Vec<CreateInvoiceCmd>,
    ) -> ResultEngine<BulkReport<Invoice>> {
        if cmds.is_empty() {
            return Err(EngineError::Validation(
                "at least one invoice is required".to_string(),
            ));
        }
        if cmds.len() > MAX_BULK_ITEMS {
            return Err(EngineError::Validation(format!(
                "at most {MAX_BULK_ITEMS} invoices per batch, got {}",
                cmds.len()
            )));
        }

        let mut results = Vec::with_capacity(cmds.len());
        for (index, cmd) in cmds.into_iter().enumerate() {
            let result = self.create_invoice(cmd).await;
            if let Err(err) = &result {
                tracing::warn!(index, "bulk invoice create failed: {err}");
            }
            results.push(BulkItem { index, result });
        }

        let report = BulkReport { results };
        tracing::info!(
            created = report.created(),
            failed = report.failed(),
            "bulk invoice create finished"
        );
        Ok(report)
    }

    /// Return an invoice with its line items.
    pub async fn invoice(&self, account_id: &str, invoice_id: Uuid) -> ResultEngine<Invoice> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_invoice(&db_tx, account_id, invoice_id)
                .await?;
            self.load_invoice(&db_tx, model).await
        })
    }

    /// List the invoices of an account, newest first.
    pub async fn list_invoices(
        &self,
        account_id: &str,
        filter: &InvoiceListFilter,
    ) -> ResultEngine<Vec<Invoice>> {
        with_tx!(self, |db_tx| {
            let mut query =
                invoices::Entity::find().filter(invoices::Column::AccountId.eq(account_id));
            if let Some(status) = filter.status {
                query = query.filter(invoices::Column::Status.eq(status.as_str()));
            }
            if let Some(client_id) = &filter.client_id {
                query = query.filter(invoices::Column::ClientId.eq(client_id.as_str()));
            }
            if let Some(template_id) = filter.recurring_template_id {
                query = query
                    .filter(invoices::Column::RecurringTemplateId.eq(template_id.to_string()));
            }
            let models = query
                .order_by_desc(invoices::Column::CreatedAt)
                .order_by_desc(invoices::Column::Number)
                .all(&db_tx)
                .await?;

            let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();
            let mut lines_by_invoice: HashMap<String, Vec<line_items::Model>> = HashMap::new();
            if !ids.is_empty() {
                for line in line_items::Entity::find()
                    .filter(line_items::Column::InvoiceId.is_in(ids))
                    .all(&db_tx)
                    .await?
                {
                    lines_by_invoice
                        .entry(line.invoice_id.clone())
                        .or_default()
                        .push(line);
                }
            }

            models
                .into_iter()
                .map(|model| {
                    let lines = lines_by_invoice.remove(&model.id).unwrap_or_default();
                    Invoice::try_from((model, lines))
                })
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Apply a partial update.
    ///
    /// New line items replace the old ones and recompute the totals; a new
    /// tax rate alone recomputes them from the stored lines. Scheduling and
    /// explicit status changes go through the lifecycle rules.
    pub async fn update_invoice(&self, cmd: UpdateInvoiceCmd) -> ResultEngine<Invoice> {
        let now = Utc::now();
        let invoice = with_tx!(self, |db_tx| {
            let model = self
                .require_invoice(&db_tx, &cmd.account_id, cmd.invoice_id)
                .await?;
            let current = self.load_invoice(&db_tx, model).await?;
            if cmd.respect_edit_lock
                && !current.status.allows_edits()
                && !cmd.is_status_only()
            {
                return Err(EngineError::InvoiceLocked(format!(
                    "invoice {} is {} and can no longer be edited",
                    current.number, current.status
                )));
            }
            self.apply_update(&db_tx, current, &cmd, now).await
        })?;

        tracing::info!(
            account_id = %invoice.account_id,
            number = %invoice.number,
            status = %invoice.status,
            "invoice updated"
        );
        Ok(invoice)
    }

    /// Delete an invoice with its line items and payments.
    pub async fn delete_invoice(&self, account_id: &str, invoice_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_invoice(&db_tx, account_id, invoice_id)
                .await?;
            payments::Entity::delete_many()
                .filter(payments::Column::InvoiceId.eq(model.id.clone()))
                .exec(&db_tx)
                .await?;
            line_items::Entity::delete_many()
                .filter(line_items::Column::InvoiceId.eq(model.id.clone()))
                .exec(&db_tx)
                .await?;
            invoices::Entity::delete_by_id(model.id.clone())
                .exec(&db_tx)
                .await?;
            tracing::info!(account_id, number = %model.number, "invoice deleted");
            Ok(())
        })
    }

    fn check_client_total(&self, server_total: Decimal, client_total: &str) -> ResultEngine<()> {
        let client_total = money::parse_decimal(client_total, "total")?;
        money::validate_total_match_with(server_total, client_total, self.policy.total_tolerance)
    }

    /// Number and insert a priced invoice with its lines.
    pub(super) async fn insert_invoice<C: ConnectionTrait>(
        &self,
        db: &C,
        new_invoice: NewInvoice,
        now: DateTime<Utc>,
    ) -> ResultEngine<Invoice> {
        self.require_client(db, &new_invoice.account_id, &new_invoice.client_id)
            .await?;
        self.check_bank_account(
            db,
            &new_invoice.account_id,
            new_invoice.bank_account_id.as_deref(),
        )
        .await?;
        let number = self.next_number_in(db, &new_invoice.account_id).await?;

        let NewInvoice {
            account_id,
            client_id,
            bank_account_id,
            recurring_template_id,
            issue_date,
            scheduled_at,
            meta,
            totals,
        } = new_invoice;

        let invoice = Invoice {
            id: Uuid::new_v4(),
            account_id,
            number,
            client_id,
            bank_account_id,
            recurring_template_id,
            issue_date,
            scheduled_at,
            status: status::initial_status(scheduled_at, now),
            order_number: meta.order_number,
            project_number: meta.project_number,
            notes: meta.notes,
            subtotal: totals.subtotal,
            tax: totals.tax,
            tax_rate: totals.tax_rate,
            total: totals.total,
            amount_paid: Decimal::ZERO,
            paid_date: None,
            sent_at: None,
            created_at: now,
            updated_at: now,
            items: priced_items(&totals),
        };

        invoices::ActiveModel::from(&invoice).insert(db).await?;
        self.insert_lines(db, invoice.id, &invoice.items).await?;
        Ok(invoice)
    }

    async fn insert_lines<C: ConnectionTrait>(
        &self,
        db: &C,
        invoice_id: Uuid,
        items: &[LineItem],
    ) -> ResultEngine<()> {
        for item in items {
            item.to_active_model(invoice_id).insert(db).await?;
        }
        Ok(())
    }

    async fn apply_update<C: ConnectionTrait>(
        &self,
        db: &C,
        mut invoice: Invoice,
        cmd: &UpdateInvoiceCmd,
        now: DateTime<Utc>,
    ) -> ResultEngine<Invoice> {
        if let Some(number) = &cmd.number
            && number.trim() != invoice.number
        {
            return Err(EngineError::ImmutableField(format!(
                "invoice number {} cannot be changed",
                invoice.number
            )));
        }

        if let Some(client_id) = &cmd.client_id {
            let client_id = normalize_required_id(client_id, "client id")?;
            self.require_client(db, &invoice.account_id, &client_id)
                .await?;
            invoice.client_id = client_id;
        }
        if let Some(bank_account_id) = &cmd.bank_account_id {
            let bank_account_id = normalize_optional_text(bank_account_id.as_deref());
            self.check_bank_account(db, &invoice.account_id, bank_account_id.as_deref())
                .await?;
            invoice.bank_account_id = bank_account_id;
        }

        let replace_lines = cmd.items.is_some();
        if replace_lines || cmd.tax_rate.is_some() {
            let items = match &cmd.items {
                Some(items) => items.clone(),
                None => invoice.items.iter().map(LineItem::as_input).collect(),
            };
            let tax_rate = cmd
                .tax_rate
                .clone()
                .unwrap_or_else(|| format_money(invoice.tax_rate));
            let totals = money::calculate_totals(&items, &tax_rate)?;

            invoice.subtotal = totals.subtotal;
            invoice.tax = totals.tax;
            invoice.tax_rate = totals.tax_rate;
            invoice.total = totals.total;
            if replace_lines {
                invoice.items = priced_items(&totals);
            }

            if invoice.amount_paid > Decimal::ZERO {
                let next =
                    ledger_status_after_removal(invoice.status, invoice.amount_paid, invoice.total);
                apply_ledger_status(&mut invoice, next, now);
            }
        }
        if let Some(client_total) = cmd.client_total.as_deref() {
            self.check_client_total(invoice.total, client_total)?;
        }

        if let Some(issue_date) = cmd.issue_date {
            invoice.issue_date = issue_date;
        }
        if let Some(scheduled_at) = cmd.scheduled_at {
            invoice.scheduled_at = scheduled_at;
            invoice.status = status::reschedule(invoice.status, scheduled_at, now);
        }
        if let Some(target) = cmd.status {
            let next = status::transition(invoice.status, target, TransitionCause::User)?;
            if next == InvoiceStatus::Sent && invoice.status != InvoiceStatus::Sent {
                invoice.sent_at = Some(now);
            }
            invoice.status = next;
        }

        if let Some(order_number) = &cmd.order_number {
            invoice.order_number = normalize_optional_text(order_number.as_deref());
        }
        if let Some(project_number) = &cmd.project_number {
            invoice.project_number = normalize_optional_text(project_number.as_deref());
        }
        if let Some(notes) = &cmd.notes {
            invoice.notes = normalize_optional_text(notes.as_deref());
        }
        invoice.updated_at = now;

        let mut model = invoices::ActiveModel::from(&invoice);
        // A running dispatch keeps its claim.
        model.dispatch_claimed_at = ActiveValue::NotSet;
        model.update(db).await?;

        if replace_lines {
            line_items::Entity::delete_many()
                .filter(line_items::Column::InvoiceId.eq(invoice.id.to_string()))
                .exec(db)
                .await?;
            self.insert_lines(db, invoice.id, &invoice.items).await?;
        }
        Ok(invoice)
    }
}
