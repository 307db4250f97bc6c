//! Habit row and cell model.
//!
//! # Responsibility
//! - Define the habit row record and the per-date cell observation.
//! - Normalize out-of-range stored cell values to the neutral state.
//!
//! # Invariants
//! - `id` is stable and never reused for another habit.
//! - `CellValue` round-trips through its fixed integer representation.
//! - An unknown stored integer reads as `Unset`, never as an error.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a habit row.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type HabitId = Uuid;

/// Status of one (habit, date) observation.
///
/// The integer representation is part of the wire and storage contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum CellValue {
    /// Deliberately unscored; the period's target did not need this day.
    Excused,
    /// Missed: the period elapsed without enough completions.
    Failed,
    /// No observation recorded yet.
    #[default]
    Unset,
    /// Explicit completion.
    Done,
    /// Explicit completion, alternate marker.
    DoneAlt,
}

impl CellValue {
    /// Maps a stored integer to a cell value.
    ///
    /// Anything outside the five enumerated states normalizes to `Unset`;
    /// malformed persisted data must degrade, not fail the whole grid.
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            -2 => Self::Excused,
            -1 => Self::Failed,
            1 => Self::Done,
            2 => Self::DoneAlt,
            _ => Self::Unset,
        }
    }

    /// Fixed integer representation used by storage and the wire grid.
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Excused => -2,
            Self::Failed => -1,
            Self::Unset => 0,
            Self::Done => 1,
            Self::DoneAlt => 2,
        }
    }

    /// Whether this value is an explicit completion (sticky for the engine).
    pub fn is_done(self) -> bool {
        matches!(self, Self::Done | Self::DoneAlt)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::from_raw(value)
    }
}

impl From<CellValue> for i64 {
    fn from(value: CellValue) -> Self {
        value.as_i64()
    }
}

/// One (habit, date) observation: a status value plus an optional note.
///
/// The note is independent of the value; either side can change without
/// touching the other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub value: CellValue,
    pub note: Option<String>,
}

impl Cell {
    /// Creates a cell holding only a status value.
    pub fn with_value(value: CellValue) -> Self {
        Self { value, note: None }
    }
}

/// One habit row of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitRow {
    /// Stable internal ID; external callers address habits by `name`.
    pub id: HabitId,
    /// Unique display name, used as the lookup key at the API boundary.
    pub name: String,
    /// Raw live periodicity string. Empty means the default `1/d`.
    pub periodicity: String,
    /// Explicit row order within the grid.
    pub position: i64,
}

impl HabitRow {
    /// Creates a new habit row with a generated stable ID.
    ///
    /// `position` starts at 0; the repository assigns the real row order
    /// on insert.
    pub fn new(name: impl Into<String>, periodicity: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            periodicity: periodicity.into(),
            position: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Cell, CellValue, HabitRow};

    #[test]
    fn cell_value_round_trips_through_integers() {
        for value in [
            CellValue::Excused,
            CellValue::Failed,
            CellValue::Unset,
            CellValue::Done,
            CellValue::DoneAlt,
        ] {
            assert_eq!(CellValue::from_raw(value.as_i64()), value);
        }
    }

    #[test]
    fn unknown_raw_values_normalize_to_unset() {
        assert_eq!(CellValue::from_raw(7), CellValue::Unset);
        assert_eq!(CellValue::from_raw(-9), CellValue::Unset);
    }

    #[test]
    fn done_states_are_the_only_completions() {
        assert!(CellValue::Done.is_done());
        assert!(CellValue::DoneAlt.is_done());
        assert!(!CellValue::Failed.is_done());
        assert!(!CellValue::Excused.is_done());
        assert!(!CellValue::Unset.is_done());
    }

    #[test]
    fn habit_row_new_sets_defaults() {
        let habit = HabitRow::new("stretch", "3/w");
        assert!(!habit.id.is_nil());
        assert_eq!(habit.name, "stretch");
        assert_eq!(habit.periodicity, "3/w");
        assert_eq!(habit.position, 0);
    }

    #[test]
    fn default_cell_is_unset_without_note() {
        let cell = Cell::default();
        assert_eq!(cell.value, CellValue::Unset);
        assert_eq!(cell.note, None);
    }
}
