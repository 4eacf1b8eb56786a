//! Periodic jobs running next to the HTTP server.
//!
//! Both loops only talk to the database through the engine, so several
//! processes can run them side by side; the engine's claims keep them from
//! acting twice on the same invoice or template.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use engine::{Engine, InvoiceNotifier};
use tokio::time::{self, MissedTickBehavior};

/// Send due scheduled invoices every `every`.
pub async fn run_dispatch(engine: Engine, notifier: Arc<dyn InvoiceNotifier>, every: Duration) {
    let mut interval = time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        match engine
            .process_scheduled_invoices(Utc::now(), notifier.as_ref())
            .await
        {
            Ok(report) if report.errors > 0 => {
                tracing::warn!(errors = report.errors, "dispatch run had failures");
            }
            Ok(_) => {}
            Err(err) => tracing::error!("dispatch run failed: {err}"),
        }
    }
}

/// Generate due recurring invoices every `every`.
pub async fn run_recurring(engine: Engine, every: Duration) {
    let mut interval = time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        match engine.generate_due(Utc::now().date_naive()).await {
            Ok(report) if report.errors > 0 => {
                tracing::warn!(errors = report.errors, "recurring run had failures");
            }
            Ok(_) => {}
            Err(err) => tracing::error!("recurring run failed: {err}"),
        }
    }
}
