//! Billing engine.
//!
//! Turns line items into money-correct invoices, numbers them per account
//! under concurrent writers, drives them through their lifecycle (including
//! the scheduled dispatch job), applies payments and materializes invoices
//! from recurring templates. All state lives in the database behind
//! [`Engine`]; nothing is cached between calls.

pub use accounts::Account;
pub use cadence::Cadence;
pub use commands::{
    CreateInvoiceCmd, CreateTemplateCmd, InvoiceListFilter, InvoiceMeta, RecordPaymentCmd,
    UpdateInvoiceCmd, UpdateTemplateCmd,
};
pub use error::EngineError;
pub use invoices::Invoice;
pub use line_items::LineItem;
pub use money::{LineItemInput, Totals};
pub use notifier::{InvoiceEmail, InvoiceNotifier, NotifyError};
pub use ops::{Engine, EngineBuilder, LedgerUpdate};
pub use payments::Payment;
pub use policy::BillingPolicy;
pub use recurring::{RecurringTemplate, TemplateItem};
pub use reports::{BulkItem, BulkReport, DispatchReport, GenerationReport, MAX_BULK_ITEMS};
pub use status::{InvoiceStatus, TransitionCause};

mod accounts;
mod bank_accounts;
mod cadence;
mod clients;
mod commands;
mod error;
mod invoices;
mod line_items;
pub mod money;
mod notifier;
mod ops;
mod payments;
mod policy;
mod recurring;
mod recurring_items;
mod reports;
pub mod status;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
