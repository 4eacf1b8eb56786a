//! Request and response bodies of the billing HTTP API.
//!
//! Money always leaves the API as a two decimal string. On the way in,
//! quantities, prices, rates and totals are accepted as JSON numbers or
//! strings (see [`Amount`]).

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use uuid::Uuid;

/// A decimal value sent either as a JSON number or as a string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for Amount {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// Deserialize a field that distinguishes "absent" from `null`.
///
/// Use with `#[serde(default, deserialize_with = "api_types::double_option")]`:
/// a missing field stays `None`, `null` becomes `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Error body of every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}

/// One entry of a bulk request.
///
/// Entries are decoded one by one: a malformed entry keeps its decoding
/// error and the rest of the batch still goes through.
#[derive(Debug)]
pub struct BulkEntry<T>(pub Result<T, String>);

impl<'de, T> Deserialize<'de> for BulkEntry<T>
where
    T: DeserializeOwned,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self(
            serde_json::from_value(value).map_err(|err| err.to_string()),
        ))
    }
}

/// Outcome of a bulk create, one entry per submitted item.
#[derive(Debug, Serialize, Deserialize)]
pub struct BulkResponse<T> {
    pub created: usize,
    pub failed: usize,
    pub results: Vec<BulkItemResult<T>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkItemResult<T> {
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub mod invoice {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum InvoiceStatus {
        Draft,
        Scheduled,
        Sent,
        Viewed,
        Partial,
        Paid,
        Overdue,
        Cancelled,
        Refunded,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct LineItemNew {
        pub description: String,
        pub quantity: Amount,
        pub unit_price: Amount,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct InvoiceNew {
        pub client_id: String,
        pub items: Vec<LineItemNew>,
        pub tax_rate: Amount,
        pub bank_account_id: Option<String>,
        /// Defaults to today.
        pub issue_date: Option<NaiveDate>,
        /// A future send time creates the invoice as `scheduled`.
        pub scheduled_at: Option<DateTime<Utc>>,
        pub order_number: Option<String>,
        pub project_number: Option<String>,
        pub notes: Option<String>,
        /// Total computed by the client. Checked against the server total,
        /// never stored.
        pub total: Option<Amount>,
    }

    /// Partial update. Fields set to `null` are cleared.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct InvoiceUpdate {
        pub number: Option<String>,
        pub client_id: Option<String>,
        #[serde(default, deserialize_with = "double_option")]
        pub bank_account_id: Option<Option<String>>,
        /// Replaces every line.
        pub items: Option<Vec<LineItemNew>>,
        pub tax_rate: Option<Amount>,
        pub total: Option<Amount>,
        pub issue_date: Option<NaiveDate>,
        #[serde(default, deserialize_with = "double_option")]
        pub scheduled_at: Option<Option<DateTime<Utc>>>,
        pub status: Option<InvoiceStatus>,
        #[serde(default, deserialize_with = "double_option")]
        pub order_number: Option<Option<String>>,
        #[serde(default, deserialize_with = "double_option")]
        pub project_number: Option<Option<String>>,
        #[serde(default, deserialize_with = "double_option")]
        pub notes: Option<Option<String>>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct InvoiceListQuery {
        pub status: Option<InvoiceStatus>,
        pub client_id: Option<String>,
        pub recurring_template_id: Option<Uuid>,
    }

    #[derive(Debug, Deserialize)]
    pub struct BulkInvoiceNew {
        pub invoices: Vec<BulkEntry<InvoiceNew>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LineItemView {
        pub id: Uuid,
        pub description: String,
        pub quantity: String,
        pub unit_price: String,
        pub amount: String,
        pub position: i32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvoiceView {
        pub id: Uuid,
        pub number: String,
        pub client_id: String,
        pub bank_account_id: Option<String>,
        pub recurring_template_id: Option<Uuid>,
        pub issue_date: NaiveDate,
        pub scheduled_at: Option<DateTime<Utc>>,
        pub status: InvoiceStatus,
        pub order_number: Option<String>,
        pub project_number: Option<String>,
        pub notes: Option<String>,
        pub subtotal: String,
        pub tax_rate: String,
        pub tax: String,
        pub total: String,
        pub amount_paid: String,
        pub balance_due: String,
        pub paid_date: Option<NaiveDate>,
        pub sent_at: Option<DateTime<Utc>>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub items: Vec<LineItemView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvoiceListResponse {
        pub invoices: Vec<InvoiceView>,
    }

    /// Counts of one scheduled dispatch run.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct DispatchReport {
        pub processed: usize,
        pub sent: usize,
        pub skipped: usize,
        pub deactivated: usize,
        pub errors: usize,
        pub error_messages: Vec<String>,
    }
}

pub mod payment {
    use super::*;
    use crate::invoice::InvoiceView;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentNew {
        pub amount: Amount,
        /// Defaults to today.
        pub paid_on: Option<NaiveDate>,
        /// Defaults to `bank_transfer`.
        pub method: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentView {
        pub id: Uuid,
        pub invoice_id: Uuid,
        pub amount: String,
        pub paid_on: NaiveDate,
        pub method: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentRecorded {
        pub payment: PaymentView,
        pub invoice: InvoiceView,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentListResponse {
        pub payments: Vec<PaymentView>,
    }
}

pub mod recurring {
    use super::*;
    use crate::invoice::LineItemNew;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Cadence {
        Weekly,
        Biweekly,
        Monthly,
        Quarterly,
        Yearly,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct TemplateNew {
        pub client_id: String,
        pub bank_account_id: Option<String>,
        pub cadence: Cadence,
        pub start_date: NaiveDate,
        pub end_date: Option<NaiveDate>,
        pub tax_rate: Amount,
        pub notes: Option<String>,
        pub items: Vec<LineItemNew>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TemplateUpdate {
        pub client_id: Option<String>,
        #[serde(default, deserialize_with = "double_option")]
        pub bank_account_id: Option<Option<String>>,
        pub cadence: Option<Cadence>,
        /// Also resets the next generation date.
        pub start_date: Option<NaiveDate>,
        #[serde(default, deserialize_with = "double_option")]
        pub end_date: Option<Option<NaiveDate>>,
        pub tax_rate: Option<Amount>,
        #[serde(default, deserialize_with = "double_option")]
        pub notes: Option<Option<String>>,
        pub items: Option<Vec<LineItemNew>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct BulkTemplateNew {
        pub templates: Vec<BulkEntry<TemplateNew>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TemplateItemView {
        pub id: Uuid,
        pub description: String,
        pub quantity: String,
        pub unit_price: String,
        pub position: i32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TemplateView {
        pub id: Uuid,
        pub client_id: String,
        pub bank_account_id: Option<String>,
        pub cadence: Cadence,
        pub start_date: NaiveDate,
        pub end_date: Option<NaiveDate>,
        pub next_generation_date: NaiveDate,
        pub active: bool,
        pub tax_rate: String,
        pub notes: Option<String>,
        pub last_generated_at: Option<DateTime<Utc>>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub items: Vec<TemplateItemView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TemplateListResponse {
        pub templates: Vec<TemplateView>,
    }

    /// Counts of one recurring generation run.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct GenerationReport {
        pub processed: usize,
        pub generated: usize,
        pub skipped: usize,
        pub deactivated: usize,
        pub errors: usize,
        pub error_messages: Vec<String>,
    }
}
