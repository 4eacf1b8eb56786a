//! Payment ledger.
//!
//! Every payment write first touches the invoice row, so concurrent payment
//! writes on the same invoice serialize on it; `amount_paid` and the derived
//! status are then recomputed from the stored payments in the same
//! transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    EngineError, Invoice, InvoiceStatus, Payment, RecordPaymentCmd, ResultEngine,
    TransitionCause, invoices, money, payments,
    status::{self, ledger_status, ledger_status_after_removal},
    util::{normalize_required_id, stored_money},
};

use super::{Engine, with_tx};

/// A payment write together with the invoice it left behind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerUpdate {
    pub payment: Payment,
    pub invoice: Invoice,
}

/// Set a ledger derived status and keep `paid_date` in sync with it.
pub(super) fn apply_ledger_status(invoice: &mut Invoice, next: InvoiceStatus, now: DateTime<Utc>) {
    match next {
        InvoiceStatus::Paid => {
            if invoice.status != InvoiceStatus::Paid || invoice.paid_date.is_none() {
                invoice.paid_date = Some(now.date_naive());
            }
        }
        InvoiceStatus::Sent | InvoiceStatus::Partial => invoice.paid_date = None,
        _ => {}
    }
    invoice.status = next;
}

impl Engine {
    /// Record a payment and recompute the invoice ledger.
    pub async fn record_payment(&self, cmd: RecordPaymentCmd) -> ResultEngine<LedgerUpdate> {
        let now = Utc::now();
        let amount = money::round_money(money::parse_decimal(&cmd.amount, "payment amount")?);
        if amount <= Decimal::ZERO {
            return Err(EngineError::Validation(
                "payment amount must be > 0".to_string(),
            ));
        }
        let method = normalize_required_id(&cmd.method, "payment method")?;

        let update = with_tx!(self, |db_tx| {
            self.claim_invoice(&db_tx, &cmd.account_id, cmd.invoice_id, now)
                .await?;
            let model = self
                .require_invoice(&db_tx, &cmd.account_id, cmd.invoice_id)
                .await?;
            let mut invoice = self.load_invoice(&db_tx, model).await?;
            if invoice.status == InvoiceStatus::Cancelled {
                return Err(EngineError::Validation(format!(
                    "invoice {} is cancelled and cannot receive payments",
                    invoice.number
                )));
            }

            let payment = Payment {
                id: Uuid::new_v4(),
                invoice_id: invoice.id,
                amount,
                paid_on: cmd.paid_on,
                method,
                created_at: now,
            };
            payments::ActiveModel::from(&payment).insert(&db_tx).await?;

            invoice.amount_paid = self.sum_payments(&db_tx, invoice.id).await?;
            let next = ledger_status(invoice.status, invoice.amount_paid, invoice.total);
            let next = status::transition(invoice.status, next, TransitionCause::Ledger)?;
            apply_ledger_status(&mut invoice, next, now);
            self.store_ledger(&db_tx, &mut invoice, now).await?;

            Ok::<_, EngineError>(LedgerUpdate { payment, invoice })
        })?;

        tracing::info!(
            number = %update.invoice.number,
            amount = %update.payment.amount,
            amount_paid = %update.invoice.amount_paid,
            status = %update.invoice.status,
            "payment recorded"
        );
        Ok(update)
    }

    /// Remove a payment and recompute the invoice ledger.
    pub async fn delete_payment(&self, account_id: &str, payment_id: Uuid) -> ResultEngine<Invoice> {
        let now = Utc::now();
        let invoice = with_tx!(self, |db_tx| {
            let payment = payments::Entity::find_by_id(payment_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("payment not exists".to_string()))?;
            let invoice_id = payment.invoice_id.clone();
            // Payments of other accounts look missing.
            let invoice_uuid = Uuid::parse_str(&invoice_id)
                .map_err(|_| EngineError::KeyNotFound("payment not exists".to_string()))?;
            self.claim_invoice(&db_tx, account_id, invoice_uuid, now)
                .await
                .map_err(|err| match err {
                    EngineError::KeyNotFound(_) => {
                        EngineError::KeyNotFound("payment not exists".to_string())
                    }
                    other => other,
                })?;

            payments::Entity::delete_by_id(payment.id.clone())
                .exec(&db_tx)
                .await?;

            let model = self
                .require_invoice(&db_tx, account_id, invoice_uuid)
                .await?;
            let mut invoice = self.load_invoice(&db_tx, model).await?;
            invoice.amount_paid = self.sum_payments(&db_tx, invoice.id).await?;
            let next =
                ledger_status_after_removal(invoice.status, invoice.amount_paid, invoice.total);
            let next = status::transition(invoice.status, next, TransitionCause::Ledger)?;
            apply_ledger_status(&mut invoice, next, now);
            self.store_ledger(&db_tx, &mut invoice, now).await?;
            Ok::<_, EngineError>(invoice)
        })?;

        tracing::info!(
            number = %invoice.number,
            amount_paid = %invoice.amount_paid,
            status = %invoice.status,
            "payment deleted"
        );
        Ok(invoice)
    }

    /// Payments of an invoice, oldest first.
    pub async fn list_payments(
        &self,
        account_id: &str,
        invoice_id: Uuid,
    ) -> ResultEngine<Vec<Payment>> {
        with_tx!(self, |db_tx| {
            self.require_invoice(&db_tx, account_id, invoice_id)
                .await?;
            payments::Entity::find()
                .filter(payments::Column::InvoiceId.eq(invoice_id.to_string()))
                .order_by_asc(payments::Column::PaidOn)
                .order_by_asc(payments::Column::CreatedAt)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Payment::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Take the write lock on an invoice row before reading it.
    async fn claim_invoice<C: ConnectionTrait>(
        &self,
        db: &C,
        account_id: &str,
        invoice_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let claimed = invoices::Entity::update_many()
            .col_expr(invoices::Column::UpdatedAt, Expr::value(now))
            .filter(invoices::Column::Id.eq(invoice_id.to_string()))
            .filter(invoices::Column::AccountId.eq(account_id))
            .exec(db)
            .await?;
        if claimed.rows_affected == 0 {
            return Err(EngineError::KeyNotFound("invoice not exists".to_string()));
        }
        Ok(())
    }

    async fn sum_payments<C: ConnectionTrait>(
        &self,
        db: &C,
        invoice_id: Uuid,
    ) -> ResultEngine<Decimal> {
        payments::Entity::find()
            .filter(payments::Column::InvoiceId.eq(invoice_id.to_string()))
            .all(db)
            .await?
            .iter()
            .try_fold(Decimal::ZERO, |acc, payment| -> ResultEngine<Decimal> {
                Ok(acc + stored_money(&payment.amount, "payment amount")?)
            })
    }

    async fn store_ledger<C: ConnectionTrait>(
        &self,
        db: &C,
        invoice: &mut Invoice,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        invoice.updated_at = now;
        invoices::Entity::update_many()
            .col_expr(
                invoices::Column::AmountPaid,
                Expr::value(money::format_money(invoice.amount_paid)),
            )
            .col_expr(invoices::Column::Status, Expr::value(invoice.status.as_str()))
            .col_expr(invoices::Column::PaidDate, Expr::value(invoice.paid_date))
            .col_expr(invoices::Column::UpdatedAt, Expr::value(now))
            .filter(invoices::Column::Id.eq(invoice.id.to_string()))
            .exec(db)
            .await?;
        Ok(())
    }
}
