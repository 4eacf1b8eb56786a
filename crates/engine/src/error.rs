//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`Validation`] thrown when input has a bad shape or is out of range.
//! - [`TotalMismatch`] thrown when a caller supplied total disagrees with
//!   the computed one beyond the configured tolerance.
//! - [`ImmutableField`] thrown when an update tries to change an invoice
//!   number.
//! - [`KeyNotFound`] thrown when an item is missing or not owned by the
//!   caller.
//! - [`SequenceUnavailable`] thrown when the numbering primitive fails.
//! - [`TemplateInactive`] and [`TemplateEnded`] thrown by recurring
//!   generation preconditions.
//! - [`InvalidTransition`] thrown when a status change is not allowed.
//! - [`InvoiceLocked`] thrown when the content of a finalized invoice is
//!   edited.
//! - [`Delivery`] thrown when the notifier could not hand off an invoice.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`TotalMismatch`]: EngineError::TotalMismatch
//!  [`ImmutableField`]: EngineError::ImmutableField
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`SequenceUnavailable`]: EngineError::SequenceUnavailable
//!  [`TemplateInactive`]: EngineError::TemplateInactive
//!  [`TemplateEnded`]: EngineError::TemplateEnded
//!  [`InvalidTransition`]: EngineError::InvalidTransition
//!  [`InvoiceLocked`]: EngineError::InvoiceLocked
//!  [`Delivery`]: EngineError::Delivery
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Total mismatch: {0}")]
    TotalMismatch(String),
    #[error("Immutable field: {0}")]
    ImmutableField(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Sequence unavailable: {0}")]
    SequenceUnavailable(String),
    #[error("Template inactive: {0}")]
    TemplateInactive(String),
    #[error("Template ended: {0}")]
    TemplateEnded(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Invoice locked: {0}")]
    InvoiceLocked(String),
    #[error("Delivery failed: {0}")]
    Delivery(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Short machine-readable name of the error kind, used in batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::TotalMismatch(_) => "total_mismatch_error",
            Self::ImmutableField(_) => "immutable_field_error",
            Self::KeyNotFound(_) => "not_found_error",
            Self::SequenceUnavailable(_) => "sequence_unavailable_error",
            Self::TemplateInactive(_) => "template_inactive_error",
            Self::TemplateEnded(_) => "template_ended_error",
            Self::InvalidTransition(_) => "invalid_transition_error",
            Self::InvoiceLocked(_) => "invoice_locked",
            Self::Delivery(_) => "delivery_error",
            Self::Database(_) => "database_error",
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::TotalMismatch(a), Self::TotalMismatch(b)) => a == b,
            (Self::ImmutableField(a), Self::ImmutableField(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::SequenceUnavailable(a), Self::SequenceUnavailable(b)) => a == b,
            (Self::TemplateInactive(a), Self::TemplateInactive(b)) => a == b,
            (Self::TemplateEnded(a), Self::TemplateEnded(b)) => a == b,
            (Self::InvalidTransition(a), Self::InvalidTransition(b)) => a == b,
            (Self::InvoiceLocked(a), Self::InvoiceLocked(b)) => a == b,
            (Self::Delivery(a), Self::Delivery(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
