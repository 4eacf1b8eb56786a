//! Command structs for engine operations.
//!
//! These types group parameters for write operations (invoice create/update,
//! payments, recurring templates), keeping call sites readable and avoiding
//! long argument lists.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{Cadence, InvoiceStatus, money::LineItemInput};

/// Optional invoice metadata shared by create and generation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InvoiceMeta {
    pub order_number: Option<String>,
    pub project_number: Option<String>,
    pub notes: Option<String>,
}

/// Create an invoice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateInvoiceCmd {
    pub account_id: String,
    pub client_id: String,
    pub items: Vec<LineItemInput>,
    pub tax_rate: String,
    pub bank_account_id: Option<String>,
    /// Defaults to today.
    pub issue_date: Option<NaiveDate>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub meta: InvoiceMeta,
    /// Total computed by the caller; only checked, never stored.
    pub client_total: Option<String>,
}

impl CreateInvoiceCmd {
    #[must_use]
    pub fn new(
        account_id: impl Into<String>,
        client_id: impl Into<String>,
        items: Vec<LineItemInput>,
        tax_rate: impl ToString,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            client_id: client_id.into(),
            items,
            tax_rate: tax_rate.to_string(),
            bank_account_id: None,
            issue_date: None,
            scheduled_at: None,
            meta: InvoiceMeta::default(),
            client_total: None,
        }
    }

    #[must_use]
    pub fn bank_account_id(mut self, bank_account_id: impl Into<String>) -> Self {
        self.bank_account_id = Some(bank_account_id.into());
        self
    }

    #[must_use]
    pub fn issue_date(mut self, issue_date: NaiveDate) -> Self {
        self.issue_date = Some(issue_date);
        self
    }

    #[must_use]
    pub fn scheduled_at(mut self, scheduled_at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(scheduled_at);
        self
    }

    #[must_use]
    pub fn order_number(mut self, order_number: impl Into<String>) -> Self {
        self.meta.order_number = Some(order_number.into());
        self
    }

    #[must_use]
    pub fn project_number(mut self, project_number: impl Into<String>) -> Self {
        self.meta.project_number = Some(project_number.into());
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.meta.notes = Some(notes.into());
        self
    }

    #[must_use]
    pub fn client_total(mut self, total: impl ToString) -> Self {
        self.client_total = Some(total.to_string());
        self
    }
}

/// Partial update of an invoice.
///
/// `None` leaves a field untouched. For nullable fields `Some(None)` clears
/// the value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateInvoiceCmd {
    pub account_id: String,
    pub invoice_id: Uuid,

    /// Must equal the stored number when present.
    pub number: Option<String>,
    pub client_id: Option<String>,
    pub bank_account_id: Option<Option<String>>,

    /// Replaces every line and recomputes the totals.
    pub items: Option<Vec<LineItemInput>>,
    pub tax_rate: Option<String>,
    pub client_total: Option<String>,

    pub issue_date: Option<NaiveDate>,
    pub scheduled_at: Option<Option<DateTime<Utc>>>,
    pub status: Option<InvoiceStatus>,

    pub order_number: Option<Option<String>>,
    pub project_number: Option<Option<String>>,
    pub notes: Option<Option<String>>,

    /// Refuse content edits on invoices past the editable statuses; status
    /// only updates still go through.
    pub respect_edit_lock: bool,
}

impl UpdateInvoiceCmd {
    #[must_use]
    pub fn new(account_id: impl Into<String>, invoice_id: Uuid) -> Self {
        Self {
            account_id: account_id.into(),
            invoice_id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn items(mut self, items: Vec<LineItemInput>) -> Self {
        self.items = Some(items);
        self
    }

    #[must_use]
    pub fn tax_rate(mut self, tax_rate: impl ToString) -> Self {
        self.tax_rate = Some(tax_rate.to_string());
        self
    }

    #[must_use]
    pub fn status(mut self, status: InvoiceStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn scheduled_at(mut self, scheduled_at: Option<DateTime<Utc>>) -> Self {
        self.scheduled_at = Some(scheduled_at);
        self
    }

    #[must_use]
    pub fn number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = Some(notes);
        self
    }

    #[must_use]
    pub fn respect_edit_lock(mut self) -> Self {
        self.respect_edit_lock = true;
        self
    }

    /// True when the update touches nothing but the status (and possibly
    /// repeats the number).
    pub fn is_status_only(&self) -> bool {
        self.status.is_some()
            && self.client_id.is_none()
            && self.bank_account_id.is_none()
            && self.items.is_none()
            && self.tax_rate.is_none()
            && self.client_total.is_none()
            && self.issue_date.is_none()
            && self.scheduled_at.is_none()
            && self.order_number.is_none()
            && self.project_number.is_none()
            && self.notes.is_none()
    }
}

/// Filters for invoice listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InvoiceListFilter {
    pub status: Option<InvoiceStatus>,
    pub client_id: Option<String>,
    pub recurring_template_id: Option<Uuid>,
}

/// Record a payment against an invoice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordPaymentCmd {
    pub account_id: String,
    pub invoice_id: Uuid,
    pub amount: String,
    pub paid_on: NaiveDate,
    pub method: String,
}

impl RecordPaymentCmd {
    #[must_use]
    pub fn new(
        account_id: impl Into<String>,
        invoice_id: Uuid,
        amount: impl ToString,
        paid_on: NaiveDate,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            invoice_id,
            amount: amount.to_string(),
            paid_on,
            method: "bank_transfer".to_string(),
        }
    }

    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }
}

/// Create a recurring invoice template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateTemplateCmd {
    pub account_id: String,
    pub client_id: String,
    pub bank_account_id: Option<String>,
    pub cadence: Cadence,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub tax_rate: String,
    pub notes: Option<String>,
    pub items: Vec<LineItemInput>,
}

impl CreateTemplateCmd {
    #[must_use]
    pub fn new(
        account_id: impl Into<String>,
        client_id: impl Into<String>,
        cadence: Cadence,
        start_date: NaiveDate,
        items: Vec<LineItemInput>,
        tax_rate: impl ToString,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            client_id: client_id.into(),
            bank_account_id: None,
            cadence,
            start_date,
            end_date: None,
            tax_rate: tax_rate.to_string(),
            notes: None,
            items,
        }
    }

    #[must_use]
    pub fn bank_account_id(mut self, bank_account_id: impl Into<String>) -> Self {
        self.bank_account_id = Some(bank_account_id.into());
        self
    }

    #[must_use]
    pub fn end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Partial update of a recurring template. Items are replaced wholesale.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateTemplateCmd {
    pub account_id: String,
    pub template_id: Uuid,
    pub client_id: Option<String>,
    pub bank_account_id: Option<Option<String>>,
    pub cadence: Option<Cadence>,
    /// Also resets the next generation date.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<Option<NaiveDate>>,
    pub tax_rate: Option<String>,
    pub notes: Option<Option<String>>,
    pub items: Option<Vec<LineItemInput>>,
}

impl UpdateTemplateCmd {
    #[must_use]
    pub fn new(account_id: impl Into<String>, template_id: Uuid) -> Self {
        Self {
            account_id: account_id.into(),
            template_id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = Some(cadence);
        self
    }

    #[must_use]
    pub fn start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }

    #[must_use]
    pub fn end_date(mut self, end_date: Option<NaiveDate>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    #[must_use]
    pub fn items(mut self, items: Vec<LineItemInput>) -> Self {
        self.items = Some(items);
        self
    }

    #[must_use]
    pub fn tax_rate(mut self, tax_rate: impl ToString) -> Self {
        self.tax_rate = Some(tax_rate.to_string());
        self
    }
}
