//! Aggregate results of batch operations.
//!
//! Batch operations never abort on a single item: failures are recorded here
//! with enough context for the caller to report partial success.

use crate::EngineError;

/// Largest batch accepted by the bulk operations.
pub const MAX_BULK_ITEMS: usize = 100;

/// Result of one scheduled dispatch run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Due invoices found by the run.
    pub processed: usize,
    pub sent: usize,
    /// Invoices currently claimed by another worker.
    pub skipped: usize,
    pub errors: usize,
    pub error_messages: Vec<String>,
}

/// Result of one recurring generation run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// Due templates found by the run.
    pub processed: usize,
    pub generated: usize,
    /// Templates advanced or paused by someone else meanwhile.
    pub skipped: usize,
    /// Active templates whose end date passed before their next period.
    pub deactivated: usize,
    pub errors: usize,
    pub error_messages: Vec<String>,
}

/// Outcome of a bulk create, one entry per submitted item in order.
#[derive(Debug)]
pub struct BulkReport<T> {
    pub results: Vec<BulkItem<T>>,
}

#[derive(Debug)]
pub struct BulkItem<T> {
    pub index: usize,
    pub result: Result<T, EngineError>,
}

impl<T> BulkReport<T> {
    pub fn created(&self) -> usize {
        self.results.iter().filter(|item| item.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.created()
    }
}
