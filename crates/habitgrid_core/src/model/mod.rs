//! Domain model for the habit grid.
//!
//! # Responsibility
//! - Define the canonical data structures shared by engine, repos and API.
//! - Keep value normalization rules in one place.
//!
//! # Invariants
//! - Every habit is identified by a stable `HabitId`; the habit name is a
//!   boundary-only lookup key.
//! - Cell values are always one of the five enumerated states.

pub mod habit;
pub mod period;
pub mod rule;
