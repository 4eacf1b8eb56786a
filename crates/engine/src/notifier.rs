//! Outbound delivery of invoices.
//!
//! The engine does not send mail itself. The dispatch job hands an
//! [`InvoiceEmail`] to whatever [`InvoiceNotifier`] the host process wires in.

use async_trait::async_trait;
use thiserror::Error;

/// Everything a notifier needs to deliver an invoice to a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvoiceEmail {
    pub to: String,
    pub client_name: String,
    pub invoice_number: String,
    /// Invoice total, already formatted with two decimals.
    pub total: String,
    /// Stable link where the client can view the invoice.
    pub view_url: String,
    pub sender_name: String,
}

#[derive(Error, Debug)]
#[error("{0}")]
pub struct NotifyError(pub String);

#[async_trait]
pub trait InvoiceNotifier: Send + Sync {
    async fn send_invoice_email(&self, email: &InvoiceEmail) -> Result<(), NotifyError>;
}
