//! Aggregate results and progress events for removal runs.

use serde::Serialize;

/// Aggregate result of a removal run.
///
/// Built incrementally across all pages of a run and immutable once
/// returned. `skipped` records also leave a descriptive entry in `errors`,
/// so the itemized list covers every record that was not deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionOutcome {
    /// Records deleted (or, in dry-run mode, that would have been deleted).
    pub deleted: u64,
    /// Records skipped because the customer has orders.
    pub skipped: u64,
    /// One message per record that was skipped, failed deletion, or raised
    /// an error during processing.
    pub errors: Vec<String>,
}

/// Ephemeral per-record progress notification.
///
/// Constructed for each callback invocation and discarded; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Records processed so far, starting at 1.
    pub current: u64,
    /// Candidate count measured once at the start of the run. May drift as
    /// live deletions proceed; accepted as a display approximation.
    pub total: u64,
    /// Email of the record currently being processed.
    pub email: String,
}
