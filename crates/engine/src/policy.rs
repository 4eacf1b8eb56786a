//! Tunables of the billing engine.

use chrono::Duration;
use rust_decimal::Decimal;

use crate::money::default_total_tolerance;

/// Numbering format, total tolerance and dispatch settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BillingPolicy {
    /// Prefix of every invoice number (`INV-`).
    pub invoice_prefix: String,
    /// Zero padded width of the numeric part.
    pub number_width: usize,
    /// Largest accepted gap between a submitted total and the computed one.
    pub total_tolerance: Decimal,
    /// Base of the public view link sent to clients.
    pub public_base_url: String,
    /// How long a dispatch claim is honoured before another worker may take
    /// the invoice over.
    pub dispatch_lease: Duration,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            invoice_prefix: "INV-".to_string(),
            number_width: 6,
            total_tolerance: default_total_tolerance(),
            public_base_url: "http://localhost:3000".to_string(),
            dispatch_lease: Duration::seconds(300),
        }
    }
}

impl BillingPolicy {
    /// Format a sequence value as an invoice number (`INV-000123`).
    pub fn format_number(&self, value: i64) -> String {
        format!(
            "{}{:0width$}",
            self.invoice_prefix,
            value,
            width = self.number_width
        )
    }

    /// Public view link of an invoice.
    pub fn view_url(&self, invoice_id: &str) -> String {
        format!(
            "{}/invoices/{invoice_id}/view",
            self.public_base_url.trim_end_matches('/')
        )
    }
}
