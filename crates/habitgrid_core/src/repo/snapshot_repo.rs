//! Periodicity snapshot history contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist the append-only, date-keyed periodicity history per habit.
//! - Serve the chronological history the rule resolver consumes.
//!
//! # Invariants
//! - At most one entry per habit per calendar date; re-recording the same
//!   date overwrites instead of duplicating.
//! - History is returned sorted ascending by effective date.
//! - Entries are never deleted here; they only disappear with their habit.

use crate::db::DbError;
use crate::model::habit::HabitId;
use crate::repo::{format_date, parse_date};
use chrono::NaiveDate;
use log::warn;
use rusqlite::{params, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SnapshotRepoResult<T> = Result<T, SnapshotRepoError>;

/// Errors from snapshot history persistence.
#[derive(Debug)]
pub enum SnapshotRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
}

impl Display for SnapshotRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SnapshotRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for SnapshotRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SnapshotRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One dated, immutable record of a habit's periodicity string.
///
/// An empty `periodicity` means the habit did not exist on that date; the
/// resolver skips accounting for dates that resolve to such an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub habit_id: HabitId,
    pub effective_date: NaiveDate,
    pub periodicity: String,
}

/// Repository interface for the periodicity snapshot history.
pub trait SnapshotRepository {
    /// Writes one entry; same (habit, date) overwrites the existing entry.
    fn record(
        &self,
        habit_id: HabitId,
        effective_date: NaiveDate,
        periodicity: &str,
    ) -> SnapshotRepoResult<()>;

    /// Returns the habit's history sorted ascending by effective date.
    fn history_for(&self, habit_id: HabitId) -> SnapshotRepoResult<Vec<SnapshotEntry>>;
}

/// SQLite-backed snapshot history repository.
pub struct SqliteSnapshotRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSnapshotRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SnapshotRepository for SqliteSnapshotRepository<'_> {
    fn record(
        &self,
        habit_id: HabitId,
        effective_date: NaiveDate,
        periodicity: &str,
    ) -> SnapshotRepoResult<()> {
        self.conn.execute(
            "INSERT INTO periodicity_snapshots (habit_id, effective_date, periodicity)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (habit_id, effective_date)
             DO UPDATE SET periodicity = excluded.periodicity;",
            params![habit_id.to_string(), format_date(effective_date), periodicity],
        )?;
        Ok(())
    }

    fn history_for(&self, habit_id: HabitId) -> SnapshotRepoResult<Vec<SnapshotEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT effective_date, periodicity FROM periodicity_snapshots
             WHERE habit_id = ?1
             ORDER BY effective_date ASC;",
        )?;
        let mut rows = stmt.query([habit_id.to_string()])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let raw_date: String = row.get(0)?;
            let Some(effective_date) = parse_date(&raw_date) else {
                warn!(
                    "event=snapshot_read module=repo status=skip reason=malformed_date value={raw_date}"
                );
                continue;
            };
            entries.push(SnapshotEntry {
                habit_id,
                effective_date,
                periodicity: row.get(1)?,
            });
        }
        Ok(entries)
    }
}
