//! Scheduled dispatch job.
//!
//! Sends every `scheduled` invoice whose send time has passed. Each invoice
//! is claimed before the notifier is called: the claim is a conditional
//! write of `dispatch_claimed_at`, which succeeds for only one worker until
//! the lease expires. A worker that crashes after sending leaves a claim
//! behind, so the invoice is not picked up again before the lease runs out.

use chrono::{DateTime, Utc};
use sea_orm::{Condition, QueryFilter, QueryOrder, prelude::*, sea_query::Expr};

use crate::{
    DispatchReport, EngineError, InvoiceEmail, InvoiceNotifier, InvoiceStatus, ResultEngine,
    TransitionCause, accounts, clients, invoices,
    money::format_money,
    status,
    util::stored_money,
};

use super::Engine;

enum DispatchOutcome {
    Sent,
    Skipped,
}

impl Engine {
    /// Deliver all invoices due at `now` and move them to `sent`.
    ///
    /// Only a failure of the due-invoice query fails the run; per-invoice
    /// problems are counted in the report.
    pub async fn process_scheduled_invoices(
        &self,
        now: DateTime<Utc>,
        notifier: &dyn InvoiceNotifier,
    ) -> ResultEngine<DispatchReport> {
        let due = invoices::Entity::find()
            .filter(invoices::Column::Status.eq(InvoiceStatus::Scheduled.as_str()))
            .filter(invoices::Column::ScheduledAt.lte(now))
            .order_by_asc(invoices::Column::ScheduledAt)
            .all(&self.database)
            .await?;

        let mut report = DispatchReport {
            processed: due.len(),
            ..DispatchReport::default()
        };

        for model in due {
            let number = model.number.clone();
            match self.dispatch_one(model, now, notifier).await {
                Ok(DispatchOutcome::Sent) => report.sent += 1,
                Ok(DispatchOutcome::Skipped) => {
                    tracing::debug!(number = %number, "invoice claimed by another worker");
                    report.skipped += 1;
                }
                Err(err) => {
                    tracing::error!(number = %number, "scheduled dispatch failed: {err}");
                    report.errors += 1;
                    report.error_messages.push(format!("invoice {number}: {err}"));
                }
            }
        }

        tracing::info!(
            processed = report.processed,
            sent = report.sent,
            skipped = report.skipped,
            errors = report.errors,
            "scheduled dispatch finished"
        );
        Ok(report)
    }

    async fn dispatch_one(
        &self,
        model: invoices::Model,
        now: DateTime<Utc>,
        notifier: &dyn InvoiceNotifier,
    ) -> ResultEngine<DispatchOutcome> {
        if !self.claim_dispatch(&model.id, now).await? {
            return Ok(DispatchOutcome::Skipped);
        }

        if let Err(err) = self.deliver(&model, notifier).await {
            if let Err(release_err) = self.release_dispatch(&model.id, now).await {
                tracing::error!(number = %model.number, "failed to release dispatch claim: {release_err}");
            }
            return Err(err);
        }

        self.mark_sent(&model.id, now).await?;
        tracing::info!(number = %model.number, "scheduled invoice sent");
        Ok(DispatchOutcome::Sent)
    }

    async fn deliver(
        &self,
        model: &invoices::Model,
        notifier: &dyn InvoiceNotifier,
    ) -> ResultEngine<()> {
        let client = clients::Entity::find_by_id(model.client_id.clone())
            .filter(clients::Column::AccountId.eq(model.account_id.clone()))
            .one(&self.database)
            .await?
            .ok_or_else(|| {
                EngineError::KeyNotFound(format!("client {} not exists", model.client_id))
            })?;
        let account = accounts::Entity::find_by_id(model.account_id.clone())
            .one(&self.database)
            .await?
            .ok_or_else(|| {
                EngineError::KeyNotFound(format!("account {} not exists", model.account_id))
            })?;

        let email = InvoiceEmail {
            to: client.email,
            client_name: client.name,
            invoice_number: model.number.clone(),
            total: format_money(stored_money(&model.total, "total")?),
            view_url: self.policy.view_url(&model.id),
            sender_name: account.name,
        };

        notifier
            .send_invoice_email(&email)
            .await
            .map_err(|err| EngineError::Delivery(err.to_string()))
    }

    /// Claim an invoice for dispatch; false if another worker holds it.
    async fn claim_dispatch(&self, invoice_id: &str, now: DateTime<Utc>) -> ResultEngine<bool> {
        let lease_expired = now - self.policy.dispatch_lease;
        let claimed = invoices::Entity::update_many()
            .col_expr(invoices::Column::DispatchClaimedAt, Expr::value(Some(now)))
            .filter(invoices::Column::Id.eq(invoice_id))
            .filter(invoices::Column::Status.eq(InvoiceStatus::Scheduled.as_str()))
            .filter(invoices::Column::ScheduledAt.lte(now))
            .filter(
                Condition::any()
                    .add(invoices::Column::DispatchClaimedAt.is_null())
                    .add(invoices::Column::DispatchClaimedAt.lt(lease_expired)),
            )
            .exec(&self.database)
            .await?;
        Ok(claimed.rows_affected == 1)
    }

    async fn release_dispatch(&self, invoice_id: &str, claimed_at: DateTime<Utc>) -> ResultEngine<()> {
        invoices::Entity::update_many()
            .col_expr(
                invoices::Column::DispatchClaimedAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .filter(invoices::Column::Id.eq(invoice_id))
            .filter(invoices::Column::DispatchClaimedAt.eq(claimed_at))
            .exec(&self.database)
            .await?;
        Ok(())
    }

    async fn mark_sent(&self, invoice_id: &str, claimed_at: DateTime<Utc>) -> ResultEngine<()> {
        let next = status::transition(
            InvoiceStatus::Scheduled,
            InvoiceStatus::Sent,
            TransitionCause::Dispatch,
        )?;
        let updated = invoices::Entity::update_many()
            .col_expr(invoices::Column::Status, Expr::value(next.as_str()))
            .col_expr(invoices::Column::SentAt, Expr::value(Some(claimed_at)))
            .col_expr(
                invoices::Column::DispatchClaimedAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .col_expr(invoices::Column::UpdatedAt, Expr::value(claimed_at))
            .filter(invoices::Column::Id.eq(invoice_id))
            .filter(invoices::Column::Status.eq(InvoiceStatus::Scheduled.as_str()))
            .filter(invoices::Column::DispatchClaimedAt.eq(claimed_at))
            .exec(&self.database)
            .await?;
        if updated.rows_affected == 0 {
            return Err(EngineError::InvalidTransition(format!(
                "invoice {invoice_id} changed while being dispatched"
            )));
        }
        Ok(())
    }
}
