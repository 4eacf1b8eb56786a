//! Invoice delivery backends wired into the dispatch job.

use std::time::Duration;

use async_trait::async_trait;
use engine::{InvoiceEmail, InvoiceNotifier, NotifyError};
use reqwest::Client;
use serde::Serialize;

/// JSON body POSTed to the mail relay.
#[derive(Debug, Serialize)]
struct InvoiceEmailRequest<'a> {
    to: &'a str,
    client_name: &'a str,
    invoice_number: &'a str,
    total: &'a str,
    view_url: &'a str,
    sender_name: &'a str,
}

impl<'a> From<&'a InvoiceEmail> for InvoiceEmailRequest<'a> {
    fn from(email: &'a InvoiceEmail) -> Self {
        Self {
            to: &email.to,
            client_name: &email.client_name,
            invoice_number: &email.invoice_number,
            total: &email.total,
            view_url: &email.view_url,
            sender_name: &email.sender_name,
        }
    }
}

/// Hands invoices to an HTTP mail relay.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    /// Every request gives up after `timeout`, so a hung relay cannot stall
    /// a dispatch run.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl InvoiceNotifier for WebhookNotifier {
    async fn send_invoice_email(&self, email: &InvoiceEmail) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&InvoiceEmailRequest::from(email))
            .send()
            .await
            .map_err(|err| NotifyError(format!("webhook request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError(format!("webhook answered {status}")));
        }

        tracing::debug!(number = %email.invoice_number, "invoice handed to webhook");
        Ok(())
    }
}

/// Logs invoices instead of delivering them.
pub struct LogNotifier;

#[async_trait]
impl InvoiceNotifier for LogNotifier {
    async fn send_invoice_email(&self, email: &InvoiceEmail) -> Result<(), NotifyError> {
        tracing::info!(
            to = %email.to,
            number = %email.invoice_number,
            total = %email.total,
            view_url = %email.view_url,
            "no webhook configured, invoice email logged only"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> InvoiceEmail {
        InvoiceEmail {
            to: "ap@wayne.test".to_string(),
            client_name: "Wayne Enterprises".to_string(),
            invoice_number: "INV-000042".to_string(),
            total: "2310.00".to_string(),
            view_url: "http://localhost:3000/invoices/abc/view".to_string(),
            sender_name: "Acme Studio".to_string(),
        }
    }

    #[test]
    fn webhook_body_carries_every_field() {
        let email = email();
        let body = serde_json::to_value(InvoiceEmailRequest::from(&email)).unwrap();
        assert_eq!(body["to"], "ap@wayne.test");
        assert_eq!(body["invoice_number"], "INV-000042");
        assert_eq!(body["total"], "2310.00");
        assert_eq!(body["view_url"], "http://localhost:3000/invoices/abc/view");
        assert_eq!(body["sender_name"], "Acme Studio");
    }

    #[tokio::test]
    async fn log_notifier_never_fails() {
        assert!(LogNotifier.send_invoice_email(&email()).await.is_ok());
    }

    #[tokio::test]
    async fn unreachable_webhook_is_a_notify_error() {
        let notifier =
            WebhookNotifier::new("http://127.0.0.1:9/relay", Duration::from_secs(2)).unwrap();
        assert!(notifier.send_invoice_email(&email()).await.is_err());
    }

    #[tokio::test]
    async fn hung_relay_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/relay", listener.local_addr().unwrap());
        // Accept the connection and never answer.
        let _hold = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let notifier = WebhookNotifier::new(url, Duration::from_millis(200)).unwrap();
        let started = std::time::Instant::now();
        let result = notifier.send_invoice_email(&email()).await;
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
