//! Action dispatch boundary.
//!
//! # Responsibility
//! - Route `{action, payload}` requests into grid service use-cases.
//! - Serialize the projected grid into the row-major wire format.
//! - Serialize whole requests behind one global lock with a bounded wait.
//!
//! # Invariants
//! - Dispatch never panics; every failure becomes an error envelope.
//! - Storage faults are logged in full but reported generically.
//! - Lock-acquisition timeout fails the request explicitly; no request ever
//!   proceeds unguarded.

use crate::model::habit::CellValue;
use crate::repo::grid_repo::{GridRepoError, GridRepository};
use crate::repo::snapshot_repo::{SnapshotRepoError, SnapshotRepository};
use crate::repo::{format_date, parse_date};
use crate::service::grid_service::{GridProjection, GridService, GridServiceError};
use chrono::NaiveDate;
use log::{error, info};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

const REQUEST_LOCK_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_LOCK_RETRY: Duration = Duration::from_millis(25);

static REQUEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// One incoming request: an action name plus a flat JSON payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRequest {
    pub action: String,
    #[serde(default)]
    pub payload: Value,
}

impl ApiRequest {
    pub fn new(action: impl Into<String>, payload: Value) -> Self {
        Self {
            action: action.into(),
            payload,
        }
    }
}

/// Outgoing response: a status envelope, or the raw wire grid for reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ApiResponse {
    Grid(Value),
    Status {
        status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl ApiResponse {
    fn success() -> Self {
        Self::Status {
            status: "success".to_string(),
            message: None,
        }
    }

    fn success_with(message: impl Into<String>) -> Self {
        Self::Status {
            status: "success".to_string(),
            message: Some(message.into()),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self::Status {
            status: "error".to_string(),
            message: Some(message.into()),
        }
    }

    /// Whether this response reports success (grids count as success).
    pub fn is_success(&self) -> bool {
        match self {
            Self::Grid(_) => true,
            Self::Status { status, .. } => status == "success",
        }
    }
}

/// Routes one request through the grid service.
///
/// # Contract
/// - Holds the global request lock for the whole call; a 10 s acquisition
///   timeout fails the request with an error envelope.
/// - Mutating actions re-run the engine before returning, except
///   `saveSnapshot`.
pub fn dispatch<G: GridRepository, S: SnapshotRepository>(
    service: &GridService<G, S>,
    request: &ApiRequest,
    today: NaiveDate,
) -> ApiResponse {
    let Some(_guard) = acquire_request_lock(REQUEST_LOCK_TIMEOUT) else {
        error!(
            "event=dispatch module=api status=error action={} error=lock_timeout",
            request.action
        );
        return ApiResponse::failure("request lock unavailable; try again");
    };

    let started_at = Instant::now();
    let response = route(service, request, today);
    info!(
        "event=dispatch module=api status={} action={} duration_ms={}",
        if response.is_success() { "ok" } else { "error" },
        request.action,
        started_at.elapsed().as_millis()
    );
    response
}

fn route<G: GridRepository, S: SnapshotRepository>(
    service: &GridService<G, S>,
    request: &ApiRequest,
    today: NaiveDate,
) -> ApiResponse {
    let payload = &request.payload;
    match request.action.as_str() {
        "read" => handle_read(service, today),
        "update" => handle_update(service, payload, today),
        "updateHabitPeriodicity" => handle_update_periodicity(service, payload, today),
        "saveSnapshot" => match service.record_snapshot(today) {
            Ok(count) => ApiResponse::success_with(format!("snapshot saved for {count} habit(s)")),
            Err(err) => service_failure("saveSnapshot", err),
        },
        "addHabit" => handle_add_habit(service, payload, today),
        "renameHabit" => handle_rename_habit(service, payload, today),
        "deleteHabit" => handle_delete_habit(service, payload, today),
        "moveHabit" => handle_move_habit(service, payload, today),
        "addDate" => handle_add_date(service, payload, today),
        other => ApiResponse::failure(format!("unknown action `{other}`")),
    }
}

fn handle_read<G: GridRepository, S: SnapshotRepository>(
    service: &GridService<G, S>,
    today: NaiveDate,
) -> ApiResponse {
    if let Err(err) = service.reconcile(today) {
        return service_failure("read", err);
    }
    match service.project(today) {
        Ok(projection) => ApiResponse::Grid(grid_to_wire(&projection)),
        Err(err) => service_failure("read", err),
    }
}

fn handle_update<G: GridRepository, S: SnapshotRepository>(
    service: &GridService<G, S>,
    payload: &Value,
    today: NaiveDate,
) -> ApiResponse {
    let habit = match payload_str(payload, "habit") {
        Ok(habit) => habit,
        Err(response) => return response,
    };
    let date = match payload_date(payload, "date") {
        Ok(date) => date,
        Err(response) => return response,
    };

    let value = payload
        .get("value")
        .and_then(Value::as_i64)
        .map(CellValue::from_raw);
    let note = payload.get("note").and_then(Value::as_str);
    if value.is_none() && note.is_none() {
        return ApiResponse::failure("update needs a `value` or a `note` field");
    }

    if let Err(err) = service.set_cell(habit, date, value, note) {
        return service_failure("update", err);
    }
    reconcile_then_ack(service, "update", today)
}

fn handle_update_periodicity<G: GridRepository, S: SnapshotRepository>(
    service: &GridService<G, S>,
    payload: &Value,
    today: NaiveDate,
) -> ApiResponse {
    let habit = match payload_str(payload, "habit") {
        Ok(habit) => habit,
        Err(response) => return response,
    };
    let periodicity = match payload_str(payload, "periodicity") {
        Ok(periodicity) => periodicity,
        Err(response) => return response,
    };

    if let Err(err) = service.update_periodicity(habit, periodicity) {
        return service_failure("updateHabitPeriodicity", err);
    }
    reconcile_then_ack(service, "updateHabitPeriodicity", today)
}

fn handle_add_habit<G: GridRepository, S: SnapshotRepository>(
    service: &GridService<G, S>,
    payload: &Value,
    today: NaiveDate,
) -> ApiResponse {
    let name = match payload_str(payload, "name") {
        Ok(name) => name,
        Err(response) => return response,
    };
    let periodicity = payload
        .get("periodicity")
        .and_then(Value::as_str)
        .unwrap_or_default();

    if let Err(err) = service.add_habit(name, periodicity) {
        return service_failure("addHabit", err);
    }
    reconcile_then_ack(service, "addHabit", today)
}

fn handle_rename_habit<G: GridRepository, S: SnapshotRepository>(
    service: &GridService<G, S>,
    payload: &Value,
    today: NaiveDate,
) -> ApiResponse {
    let habit = match payload_str(payload, "habit") {
        Ok(habit) => habit,
        Err(response) => return response,
    };
    let name = match payload_str(payload, "name") {
        Ok(name) => name,
        Err(response) => return response,
    };

    if let Err(err) = service.rename_habit(habit, name) {
        return service_failure("renameHabit", err);
    }
    reconcile_then_ack(service, "renameHabit", today)
}

fn handle_delete_habit<G: GridRepository, S: SnapshotRepository>(
    service: &GridService<G, S>,
    payload: &Value,
    today: NaiveDate,
) -> ApiResponse {
    let habit = match payload_str(payload, "habit") {
        Ok(habit) => habit,
        Err(response) => return response,
    };

    if let Err(err) = service.delete_habit(habit) {
        return service_failure("deleteHabit", err);
    }
    reconcile_then_ack(service, "deleteHabit", today)
}

fn handle_move_habit<G: GridRepository, S: SnapshotRepository>(
    service: &GridService<G, S>,
    payload: &Value,
    today: NaiveDate,
) -> ApiResponse {
    let habit = match payload_str(payload, "habit") {
        Ok(habit) => habit,
        Err(response) => return response,
    };
    let Some(position) = payload.get("position").and_then(Value::as_i64) else {
        return ApiResponse::failure("missing or invalid `position` field");
    };

    if let Err(err) = service.move_habit(habit, position) {
        return service_failure("moveHabit", err);
    }
    reconcile_then_ack(service, "moveHabit", today)
}

fn handle_add_date<G: GridRepository, S: SnapshotRepository>(
    service: &GridService<G, S>,
    payload: &Value,
    today: NaiveDate,
) -> ApiResponse {
    let date = match payload_date(payload, "date") {
        Ok(date) => date,
        Err(response) => return response,
    };

    if let Err(err) = service.add_date(date) {
        return service_failure("addDate", err);
    }
    reconcile_then_ack(service, "addDate", today)
}

fn reconcile_then_ack<G: GridRepository, S: SnapshotRepository>(
    service: &GridService<G, S>,
    action: &str,
    today: NaiveDate,
) -> ApiResponse {
    match service.reconcile(today) {
        Ok(_) => ApiResponse::success(),
        Err(err) => service_failure(action, err),
    }
}

/// Maps a service error to an envelope. Semantic errors carry their own
/// message; storage faults are logged in full and reported generically.
fn service_failure(action: &str, err: GridServiceError) -> ApiResponse {
    match &err {
        GridServiceError::Grid(GridRepoError::Db(_))
        | GridServiceError::Snapshots(SnapshotRepoError::Db(_)) => {
            error!("event=dispatch module=api status=error action={action} error={err}");
            ApiResponse::failure("internal storage error")
        }
        _ => ApiResponse::failure(err.to_string()),
    }
}

fn payload_str<'a>(payload: &'a Value, key: &str) -> Result<&'a str, ApiResponse> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ApiResponse::failure(format!("missing or invalid `{key}` field")))
}

fn payload_date(payload: &Value, key: &str) -> Result<NaiveDate, ApiResponse> {
    let raw = payload_str(payload, key)?;
    parse_date(raw)
        .ok_or_else(|| ApiResponse::failure(format!("invalid date `{raw}`; expected YYYY-MM-DD")))
}

/// Serializes a projection into the row-major wire grid.
///
/// Row 0 is `[null, null, "YYYY-MM-DD", ...]`; each habit row is
/// `[name, periodicity, {"val": int, "note": string|null}, ...]`.
pub fn grid_to_wire(projection: &GridProjection) -> Value {
    let mut header: Vec<Value> = vec![Value::Null, Value::Null];
    header.extend(
        projection
            .dates
            .iter()
            .map(|date| Value::String(format_date(*date))),
    );

    let mut rows = vec![Value::Array(header)];
    for row in &projection.rows {
        let mut cells: Vec<Value> = vec![json!(row.name), json!(row.periodicity)];
        cells.extend(
            row.cells
                .iter()
                .map(|cell| json!({ "val": cell.value.as_i64(), "note": cell.note })),
        );
        rows.push(Value::Array(cells));
    }
    Value::Array(rows)
}

fn acquire_request_lock(timeout: Duration) -> Option<MutexGuard<'static, ()>> {
    let deadline = Instant::now() + timeout;
    loop {
        match REQUEST_LOCK.try_lock() {
            Ok(guard) => return Some(guard),
            // A panicked holder does not invalidate the lock's data (unit).
            Err(TryLockError::Poisoned(poisoned)) => return Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => {
                if Instant::now() >= deadline {
                    return None;
                }
                std::thread::sleep(REQUEST_LOCK_RETRY);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::grid_to_wire;
    use crate::model::habit::{Cell, CellValue};
    use crate::service::grid_service::{GridProjection, HabitProjection};
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn wire_grid_has_null_null_date_header_and_cell_objects() {
        let projection = GridProjection {
            dates: vec![
                NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
                NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
            ],
            rows: vec![HabitProjection {
                name: "stretch".to_string(),
                periodicity: "3/w".to_string(),
                cells: vec![
                    Cell {
                        value: CellValue::Done,
                        note: Some("felt good".to_string()),
                    },
                    Cell::default(),
                ],
            }],
        };

        let wire = grid_to_wire(&projection);
        assert_eq!(
            wire,
            json!([
                [null, null, "2025-06-02", "2025-06-03"],
                [
                    "stretch",
                    "3/w",
                    { "val": 1, "note": "felt good" },
                    { "val": 0, "note": null }
                ]
            ])
        );
    }
}
