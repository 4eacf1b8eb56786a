//! Invoice lifecycle.
//!
//! An invoice is born `draft` (or `scheduled` when a future send time is
//! given), moves to `sent` either by hand or through the dispatch job, and
//! from there its payment state is derived from the ledger. Every status
//! change goes through [`transition`], which knows who is allowed to cause
//! what.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
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

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Sent => "sent",
            Self::Viewed => "viewed",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Whether line items and metadata may still be changed.
    ///
    /// Enforced by the API layer; status-only updates are not subject to it.
    pub fn allows_edits(self) -> bool {
        matches!(self, Self::Draft | Self::Scheduled | Self::Sent)
    }

    /// No user transition leaves these states.
    pub fn is_final(self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled | Self::Refunded)
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for InvoiceStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "draft" => Ok(Self::Draft),
            "scheduled" => Ok(Self::Scheduled),
            "sent" => Ok(Self::Sent),
            "viewed" => Ok(Self::Viewed),
            "partial" => Ok(Self::Partial),
            "paid" => Ok(Self::Paid),
            "overdue" => Ok(Self::Overdue),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            other => Err(EngineError::Validation(format!(
                "invalid invoice status: {other}"
            ))),
        }
    }
}

/// Who is asking for a status change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionCause {
    /// An explicit status set through the API.
    User,
    /// The scheduled dispatch job after a successful delivery.
    Dispatch,
    /// Recalculation after a payment was recorded or removed.
    Ledger,
}

/// Status of a freshly created invoice.
pub fn initial_status(scheduled_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> InvoiceStatus {
    match scheduled_at {
        Some(at) if at > now => InvoiceStatus::Scheduled,
        _ => InvoiceStatus::Draft,
    }
}

/// Status after the scheduled send time of an invoice was set or cleared.
///
/// Only `draft` and `scheduled` react; any other state keeps its status.
pub fn reschedule(
    current: InvoiceStatus,
    scheduled_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> InvoiceStatus {
    let in_future = scheduled_at.is_some_and(|at| at > now);
    match current {
        InvoiceStatus::Draft if in_future => InvoiceStatus::Scheduled,
        InvoiceStatus::Scheduled if !in_future => InvoiceStatus::Draft,
        other => other,
    }
}

/// Validate a status change and return the new status.
pub fn transition(
    from: InvoiceStatus,
    to: InvoiceStatus,
    cause: TransitionCause,
) -> ResultEngine<InvoiceStatus> {
    use InvoiceStatus::*;

    if from == to {
        return Ok(to);
    }

    let allowed = match cause {
        TransitionCause::Dispatch => matches!((from, to), (Scheduled, Sent)),
        TransitionCause::Ledger => from != Cancelled && matches!(to, Sent | Partial | Paid),
        TransitionCause::User => match to {
            Sent => from == Draft,
            Viewed => from == Sent,
            Overdue => matches!(from, Sent | Viewed | Partial),
            Cancelled => !from.is_final(),
            Refunded => matches!(from, Paid | Partial),
            // Scheduling is driven by the send time, payments by the ledger.
            Draft | Scheduled | Partial | Paid => false,
        },
    };

    if allowed {
        Ok(to)
    } else {
        Err(EngineError::InvalidTransition(format!(
            "{from} -> {to} is not allowed ({cause:?})"
        )))
    }
}

/// Status after a payment was recorded.
pub fn ledger_status(current: InvoiceStatus, amount_paid: Decimal, total: Decimal) -> InvoiceStatus {
    if amount_paid <= Decimal::ZERO {
        current
    } else if amount_paid >= total {
        InvoiceStatus::Paid
    } else {
        InvoiceStatus::Partial
    }
}

/// Status after a payment was removed.
///
/// Cancelled and refunded invoices keep their status.
pub fn ledger_status_after_removal(
    current: InvoiceStatus,
    amount_paid: Decimal,
    total: Decimal,
) -> InvoiceStatus {
    if matches!(current, InvoiceStatus::Cancelled | InvoiceStatus::Refunded) {
        current
    } else if amount_paid <= Decimal::ZERO {
        InvoiceStatus::Sent
    } else if amount_paid >= total {
        InvoiceStatus::Paid
    } else {
        InvoiceStatus::Partial
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use InvoiceStatus::*;

    const ALL: [InvoiceStatus; 9] = [
        Draft, Scheduled, Sent, Viewed, Partial, Paid, Overdue, Cancelled, Refunded,
    ];

    #[test]
    fn status_round_trips_through_text() {
        for status in ALL {
            assert_eq!(InvoiceStatus::try_from(status.as_str()).unwrap(), status);
        }
        assert!(InvoiceStatus::try_from("archived").is_err());
    }

    #[test]
    fn initial_status_depends_on_send_time() {
        let now = Utc::now();
        assert_eq!(initial_status(None, now), Draft);
        assert_eq!(initial_status(Some(now + Duration::hours(1)), now), Scheduled);
        assert_eq!(initial_status(Some(now - Duration::hours(1)), now), Draft);
        assert_eq!(initial_status(Some(now), now), Draft);
    }

    #[test]
    fn reschedule_moves_between_draft_and_scheduled() {
        let now = Utc::now();
        let later = Some(now + Duration::minutes(5));
        let earlier = Some(now - Duration::minutes(5));

        assert_eq!(reschedule(Draft, later, now), Scheduled);
        assert_eq!(reschedule(Scheduled, None, now), Draft);
        assert_eq!(reschedule(Scheduled, earlier, now), Draft);
        assert_eq!(reschedule(Scheduled, later, now), Scheduled);
        assert_eq!(reschedule(Sent, later, now), Sent);
        assert_eq!(reschedule(Paid, None, now), Paid);
    }

    #[test]
    fn only_dispatch_sends_scheduled_invoices() {
        assert_eq!(
            transition(Scheduled, Sent, TransitionCause::Dispatch).unwrap(),
            Sent
        );
        assert!(matches!(
            transition(Scheduled, Sent, TransitionCause::User),
            Err(EngineError::InvalidTransition(_))
        ));
        assert!(transition(Draft, Sent, TransitionCause::Dispatch).is_err());
    }

    #[test]
    fn users_cannot_set_ledger_states() {
        assert!(transition(Sent, Paid, TransitionCause::User).is_err());
        assert!(transition(Sent, Partial, TransitionCause::User).is_err());
        assert_eq!(transition(Sent, Paid, TransitionCause::Ledger).unwrap(), Paid);
        assert_eq!(
            transition(Partial, Sent, TransitionCause::Ledger).unwrap(),
            Sent
        );
        assert!(transition(Cancelled, Paid, TransitionCause::Ledger).is_err());
    }

    #[test]
    fn user_transitions() {
        assert_eq!(transition(Draft, Sent, TransitionCause::User).unwrap(), Sent);
        assert_eq!(transition(Sent, Viewed, TransitionCause::User).unwrap(), Viewed);
        assert_eq!(
            transition(Viewed, Overdue, TransitionCause::User).unwrap(),
            Overdue
        );
        assert_eq!(
            transition(Paid, Refunded, TransitionCause::User).unwrap(),
            Refunded
        );
        for from in [Draft, Scheduled, Sent, Viewed, Partial, Overdue] {
            assert_eq!(
                transition(from, Cancelled, TransitionCause::User).unwrap(),
                Cancelled
            );
        }
        assert!(transition(Paid, Cancelled, TransitionCause::User).is_err());
        assert!(transition(Cancelled, Sent, TransitionCause::User).is_err());
        assert!(transition(Sent, Draft, TransitionCause::User).is_err());
    }

    #[test]
    fn same_status_is_a_no_op() {
        for status in ALL {
            assert_eq!(
                transition(status, status, TransitionCause::User).unwrap(),
                status
            );
        }
    }

    #[test]
    fn only_draft_scheduled_and_sent_allow_edits() {
        let editable: Vec<_> = ALL.into_iter().filter(|s| s.allows_edits()).collect();
        assert_eq!(editable, vec![Draft, Scheduled, Sent]);
    }

    #[test]
    fn ledger_status_follows_amount_paid() {
        let total = Decimal::new(10_000, 2);
        assert_eq!(ledger_status(Sent, Decimal::ZERO, total), Sent);
        assert_eq!(ledger_status(Sent, Decimal::new(5_000, 2), total), Partial);
        assert_eq!(ledger_status(Partial, total, total), Paid);
        assert_eq!(ledger_status(Overdue, Decimal::new(12_000, 2), total), Paid);
    }

    #[test]
    fn removal_resets_to_sent_partial_or_paid() {
        let total = Decimal::new(10_000, 2);
        assert_eq!(ledger_status_after_removal(Paid, Decimal::ZERO, total), Sent);
        assert_eq!(
            ledger_status_after_removal(Paid, Decimal::new(1, 0), total),
            Partial
        );
        assert_eq!(ledger_status_after_removal(Paid, total, total), Paid);
        assert_eq!(
            ledger_status_after_removal(Cancelled, Decimal::ZERO, total),
            Cancelled
        );
    }
}
