//! Invoice primitives.
//!
//! An `Invoice` carries its money fields as exact decimals; in storage they
//! are two decimal strings so no backend float ever touches them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, InvoiceStatus, ResultEngine,
    line_items::{self, LineItem},
    money::format_money,
    util::{parse_optional_uuid, parse_uuid, stored_money},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invoice {
    pub id: Uuid,
    pub account_id: String,
    /// Human facing number, unique per account and never changed.
    pub number: String,
    pub client_id: String,
    pub bank_account_id: Option<String>,
    /// Template this invoice was generated from, if any.
    pub recurring_template_id: Option<Uuid>,
    pub issue_date: NaiveDate,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: InvoiceStatus,
    pub order_number: Option<String>,
    pub project_number: Option<String>,
    pub notes: Option<String>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub tax_rate: Decimal,
    pub total: Decimal,
    pub amount_paid: Decimal,
    pub paid_date: Option<NaiveDate>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<LineItem>,
}

impl Invoice {
    /// What is still owed; negative after an overpayment.
    pub fn balance_due(&self) -> Decimal {
        self.total - self.amount_paid
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub account_id: String,
    pub number: String,
    pub client_id: String,
    pub bank_account_id: Option<String>,
    pub recurring_template_id: Option<String>,
    pub issue_date: Date,
    pub scheduled_at: Option<DateTimeUtc>,
    pub status: String,
    pub order_number: Option<String>,
    pub project_number: Option<String>,
    pub notes: Option<String>,
    pub subtotal: String,
    pub tax: String,
    pub tax_rate: String,
    pub total: String,
    pub amount_paid: String,
    pub paid_date: Option<Date>,
    pub sent_at: Option<DateTimeUtc>,
    pub dispatch_claimed_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::line_items::Entity")]
    LineItems,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::line_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LineItems.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub(crate) fn parsed_status(&self) -> ResultEngine<InvoiceStatus> {
        InvoiceStatus::try_from(self.status.as_str())
    }

    pub(crate) fn parsed_total(&self) -> ResultEngine<Decimal> {
        stored_money(&self.total, "total")
    }

    pub(crate) fn parsed_tax_rate(&self) -> ResultEngine<Decimal> {
        stored_money(&self.tax_rate, "tax rate")
    }
}

impl From<&Invoice> for ActiveModel {
    fn from(invoice: &Invoice) -> Self {
        Self {
            id: ActiveValue::Set(invoice.id.to_string()),
            account_id: ActiveValue::Set(invoice.account_id.clone()),
            number: ActiveValue::Set(invoice.number.clone()),
            client_id: ActiveValue::Set(invoice.client_id.clone()),
            bank_account_id: ActiveValue::Set(invoice.bank_account_id.clone()),
            recurring_template_id: ActiveValue::Set(
                invoice.recurring_template_id.map(|id| id.to_string()),
            ),
            issue_date: ActiveValue::Set(invoice.issue_date),
            scheduled_at: ActiveValue::Set(invoice.scheduled_at),
            status: ActiveValue::Set(invoice.status.as_str().to_string()),
            order_number: ActiveValue::Set(invoice.order_number.clone()),
            project_number: ActiveValue::Set(invoice.project_number.clone()),
            notes: ActiveValue::Set(invoice.notes.clone()),
            subtotal: ActiveValue::Set(format_money(invoice.subtotal)),
            tax: ActiveValue::Set(format_money(invoice.tax)),
            tax_rate: ActiveValue::Set(format_money(invoice.tax_rate)),
            total: ActiveValue::Set(format_money(invoice.total)),
            amount_paid: ActiveValue::Set(format_money(invoice.amount_paid)),
            paid_date: ActiveValue::Set(invoice.paid_date),
            sent_at: ActiveValue::Set(invoice.sent_at),
            dispatch_claimed_at: ActiveValue::Set(None),
            created_at: ActiveValue::Set(invoice.created_at),
            updated_at: ActiveValue::Set(invoice.updated_at),
        }
    }
}

impl TryFrom<(Model, Vec<line_items::Model>)> for Invoice {
    type Error = EngineError;

    fn try_from((model, lines): (Model, Vec<line_items::Model>)) -> ResultEngine<Self> {
        let mut items = lines
            .into_iter()
            .map(LineItem::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        items.sort_by_key(|item| item.position);

        Ok(Self {
            id: parse_uuid(&model.id, "invoice")?,
            status: model.parsed_status()?,
            subtotal: stored_money(&model.subtotal, "subtotal")?,
            tax: stored_money(&model.tax, "tax")?,
            tax_rate: model.parsed_tax_rate()?,
            total: model.parsed_total()?,
            amount_paid: stored_money(&model.amount_paid, "amount paid")?,
            recurring_template_id: parse_optional_uuid(
                model.recurring_template_id.as_deref(),
                "recurring template",
            )?,
            account_id: model.account_id,
            number: model.number,
            client_id: model.client_id,
            bank_account_id: model.bank_account_id,
            issue_date: model.issue_date,
            scheduled_at: model.scheduled_at,
            order_number: model.order_number,
            project_number: model.project_number,
            notes: model.notes,
            paid_date: model.paid_date,
            sent_at: model.sent_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
            items,
        })
    }
}
