//! Periodicity reconciliation engine.
//!
//! # Responsibility
//! - Decide, over a habit's full history, which days/weeks/months count as
//!   satisfied, which must be marked failed, and which stay provisional.
//! - Stay pure: the engine consumes read models and produces a write set;
//!   persistence belongs to the service layer.
//!
//! # Invariants
//! - Explicit completions (`Done`/`DoneAlt`) are never overwritten.
//! - The write set contains only cells whose value actually changes, so a
//!   re-run over unchanged data is empty (idempotence).
//! - Evaluation is deterministic: equal-score failure candidates are broken
//!   by grid column order.

use crate::repo::snapshot_repo::SnapshotEntry;
use chrono::NaiveDate;

pub mod bucket;
pub mod outcome;
pub mod resolver;

use bucket::{bucket_cells, DatedCell};
use outcome::{evaluate_bucket, CellWrite};

/// Summary of one full reconciliation pass, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineReport {
    /// Habit rows walked.
    pub habits: usize,
    /// Cell writes applied.
    pub writes: usize,
}

/// Computes the write set for one habit's full history.
///
/// `cells` must be ascending by date and carry one entry per registered
/// grid date (absent cells as `Unset`); `history` ascending by effective
/// date. Dates whose rule resolves to "habit did not exist" are skipped.
pub fn reconcile_habit(
    cells: &[DatedCell],
    history: &[SnapshotEntry],
    live_periodicity: &str,
    today: NaiveDate,
) -> Vec<CellWrite> {
    bucket_cells(cells, history, live_periodicity)
        .iter()
        .flat_map(|bucket| evaluate_bucket(bucket, today))
        .collect()
}
