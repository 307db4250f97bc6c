//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for the grid and the
//!   periodicity snapshot history.
//! - Isolate SQLite query details from engine/service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`HabitNotFound`,
//!   `DateNotRegistered`) in addition to DB transport errors.
//! - Malformed persisted rows are skipped with a warning on read paths that
//!   feed the engine; one bad row must not fail the whole grid.

use chrono::NaiveDate;

pub mod grid_repo;
pub mod snapshot_repo;

const DATE_FMT: &str = "%Y-%m-%d";

/// Renders a date in the `YYYY-MM-DD` form used by storage and the wire.
pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

/// Parses a stored `YYYY-MM-DD` date; `None` for malformed text.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FMT).ok()
}
