//! Grid use-case service.
//!
//! # Responsibility
//! - Run the reconciliation engine over every habit and persist its writes.
//! - Project the user-facing grid after reconciliation.
//! - Apply user mutations: cell writes, periodicity edits, habit
//!   management, snapshot capture.
//!
//! # Invariants
//! - Habits are addressed by name only at this boundary; everything below
//!   uses stable IDs.
//! - Reconciliation walks habits in row order and recomputes full history;
//!   malformed stored data degrades at the repo/parse layer and never
//!   aborts the pass for other habits.
//! - The projected periodicity is history-resolved against today, not the
//!   raw live value.

use crate::engine::bucket::DatedCell;
use crate::engine::resolver::resolve_rule;
use crate::engine::{reconcile_habit, EngineReport};
use crate::model::habit::{Cell, CellValue, HabitId, HabitRow};
use crate::repo::grid_repo::{GridRepoError, GridRepository};
use crate::repo::snapshot_repo::{SnapshotRepoError, SnapshotRepository};
use chrono::NaiveDate;
use log::info;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Periodicity written for habits whose live string is blank when a
/// snapshot is captured; keeps the empty string's "did not exist" meaning
/// unambiguous inside the history.
const SNAPSHOT_DEFAULT_PERIODICITY: &str = "1/d";

pub type GridServiceResult<T> = Result<T, GridServiceError>;

/// Service error for grid use-cases.
#[derive(Debug)]
pub enum GridServiceError {
    /// No habit row carries this name.
    HabitNotFound(String),
    /// Habit name input is empty after trimming.
    InvalidName,
    /// Grid persistence failure.
    Grid(GridRepoError),
    /// Snapshot history persistence failure.
    Snapshots(SnapshotRepoError),
}

impl Display for GridServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HabitNotFound(name) => write!(f, "habit not found: `{name}`"),
            Self::InvalidName => write!(f, "habit name cannot be empty"),
            Self::Grid(err) => write!(f, "{err}"),
            Self::Snapshots(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GridServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Grid(err) => Some(err),
            Self::Snapshots(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GridRepoError> for GridServiceError {
    fn from(value: GridRepoError) -> Self {
        Self::Grid(value)
    }
}

impl From<SnapshotRepoError> for GridServiceError {
    fn from(value: SnapshotRepoError) -> Self {
        Self::Snapshots(value)
    }
}

/// One projected habit row: display name, history-resolved periodicity and
/// cells aligned with the shared date header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitProjection {
    pub name: String,
    pub periodicity: String,
    pub cells: Vec<Cell>,
}

/// The assembled user-facing grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridProjection {
    /// Shared date header, ascending.
    pub dates: Vec<NaiveDate>,
    /// Habit rows in grid order.
    pub rows: Vec<HabitProjection>,
}

/// Use-case service for the habit grid.
pub struct GridService<G: GridRepository, S: SnapshotRepository> {
    grid: G,
    snapshots: S,
}

impl<G: GridRepository, S: SnapshotRepository> GridService<G, S> {
    pub fn new(grid: G, snapshots: S) -> Self {
        Self { grid, snapshots }
    }

    /// Runs the reconciliation engine over all habits and persists the
    /// resulting cell writes.
    ///
    /// # Contract
    /// - Recomputes full history; running twice without intervening
    ///   external writes reports zero writes the second time.
    /// - Explicit completions are never overwritten.
    pub fn reconcile(&self, today: NaiveDate) -> GridServiceResult<EngineReport> {
        let started_at = Instant::now();
        let dates = self.grid.list_dates()?;
        let habits = self.grid.list_habits()?;

        let mut writes_applied = 0;
        for habit in &habits {
            let history = self.snapshots.history_for(habit.id)?;
            let cells = self.engine_cells(habit.id, &dates)?;
            let writes = reconcile_habit(&cells, &history, &habit.periodicity, today);
            for write in &writes {
                self.grid.set_cell_value(habit.id, write.date, write.value)?;
            }
            writes_applied += writes.len();
        }

        info!(
            "event=engine_run module=service status=ok habits={} dates={} writes={} duration_ms={}",
            habits.len(),
            dates.len(),
            writes_applied,
            started_at.elapsed().as_millis()
        );

        Ok(EngineReport {
            habits: habits.len(),
            writes: writes_applied,
        })
    }

    /// Assembles the user-facing grid.
    ///
    /// Callers that want reconciled values run [`Self::reconcile`] first;
    /// projection itself never mutates.
    pub fn project(&self, today: NaiveDate) -> GridServiceResult<GridProjection> {
        let dates = self.grid.list_dates()?;
        let habits = self.grid.list_habits()?;

        let mut rows = Vec::with_capacity(habits.len());
        for habit in habits {
            let history = self.snapshots.history_for(habit.id)?;
            let periodicity = match resolve_rule(&history, &habit.periodicity, today) {
                Some(rule) => rule.to_string(),
                None => habit.periodicity.clone(),
            };

            let stored: HashMap<NaiveDate, Cell> =
                self.grid.cells_for_habit(habit.id)?.into_iter().collect();
            let cells = dates
                .iter()
                .map(|date| stored.get(date).cloned().unwrap_or_default())
                .collect();

            rows.push(HabitProjection {
                name: habit.name,
                periodicity,
                cells,
            });
        }

        Ok(GridProjection { dates, rows })
    }

    /// Targeted single-cell write by habit name: value and/or note.
    ///
    /// An empty note clears the stored note.
    pub fn set_cell(
        &self,
        habit_name: &str,
        date: NaiveDate,
        value: Option<CellValue>,
        note: Option<&str>,
    ) -> GridServiceResult<()> {
        let habit = self.require_habit(habit_name)?;
        if let Some(value) = value {
            self.grid.set_cell_value(habit.id, date, value)?;
        }
        if let Some(note) = note {
            let stored = if note.is_empty() { None } else { Some(note) };
            self.grid.set_cell_note(habit.id, date, stored)?;
        }
        Ok(())
    }

    /// Writes a habit's live periodicity string (stored raw, parsed lazily).
    pub fn update_periodicity(
        &self,
        habit_name: &str,
        periodicity: &str,
    ) -> GridServiceResult<()> {
        let habit = self.require_habit(habit_name)?;
        self.grid.set_periodicity(habit.id, periodicity.trim())?;
        Ok(())
    }

    /// Appends a habit row at the end of the grid.
    pub fn add_habit(&self, name: &str, periodicity: &str) -> GridServiceResult<HabitId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GridServiceError::InvalidName);
        }
        let habit = HabitRow::new(name, periodicity.trim());
        Ok(self.grid.create_habit(&habit)?)
    }

    pub fn rename_habit(&self, habit_name: &str, new_name: &str) -> GridServiceResult<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(GridServiceError::InvalidName);
        }
        let habit = self.require_habit(habit_name)?;
        self.grid.rename_habit(habit.id, new_name)?;
        Ok(())
    }

    /// Deletes a habit row together with its cells and snapshot history.
    pub fn delete_habit(&self, habit_name: &str) -> GridServiceResult<()> {
        let habit = self.require_habit(habit_name)?;
        self.grid.delete_habit(habit.id)?;
        Ok(())
    }

    /// Moves a habit row to the given position (clamped to the grid).
    pub fn move_habit(&self, habit_name: &str, position: i64) -> GridServiceResult<()> {
        let habit = self.require_habit(habit_name)?;
        self.grid.move_habit(habit.id, position)?;
        Ok(())
    }

    /// Registers a date column; already-registered dates are a no-op.
    pub fn add_date(&self, date: NaiveDate) -> GridServiceResult<()> {
        self.grid.add_date(date)?;
        Ok(())
    }

    /// Records today's periodicity for every habit in the snapshot history.
    ///
    /// # Contract
    /// - Empty live strings are written as `1/d` (see module invariants).
    /// - Re-recording the same calendar date overwrites that date's entries.
    /// - Does not run the engine.
    pub fn record_snapshot(&self, today: NaiveDate) -> GridServiceResult<usize> {
        let habits = self.grid.list_habits()?;
        for habit in &habits {
            let raw = habit.periodicity.trim();
            let periodicity = if raw.is_empty() {
                SNAPSHOT_DEFAULT_PERIODICITY
            } else {
                raw
            };
            self.snapshots.record(habit.id, today, periodicity)?;
        }

        info!(
            "event=snapshot_save module=service status=ok habits={}",
            habits.len()
        );
        Ok(habits.len())
    }

    fn require_habit(&self, name: &str) -> GridServiceResult<HabitRow> {
        self.grid
            .habit_by_name(name)?
            .ok_or_else(|| GridServiceError::HabitNotFound(name.to_string()))
    }

    fn engine_cells(
        &self,
        id: HabitId,
        dates: &[NaiveDate],
    ) -> GridServiceResult<Vec<DatedCell>> {
        let stored: HashMap<NaiveDate, CellValue> = self
            .grid
            .cells_for_habit(id)?
            .into_iter()
            .map(|(date, cell)| (date, cell.value))
            .collect();

        Ok(dates
            .iter()
            .enumerate()
            .map(|(column, date)| DatedCell {
                date: *date,
                column,
                value: stored.get(date).copied().unwrap_or_default(),
            })
            .collect())
    }
}
