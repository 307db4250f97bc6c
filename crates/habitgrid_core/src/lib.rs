//! Core reconciliation logic for HabitGrid.
//! This crate is the single source of truth for grid accounting invariants.

pub mod api;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use api::{dispatch, ApiRequest, ApiResponse};
pub use engine::EngineReport;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::habit::{Cell, CellValue, HabitId, HabitRow};
pub use model::period::PeriodKey;
pub use model::rule::{PeriodUnit, PeriodicityRule};
pub use repo::grid_repo::{GridRepoError, GridRepository, SqliteGridRepository};
pub use repo::snapshot_repo::{
    SnapshotEntry, SnapshotRepoError, SnapshotRepository, SqliteSnapshotRepository,
};
pub use service::grid_service::{
    GridProjection, GridService, GridServiceError, HabitProjection,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
