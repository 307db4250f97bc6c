//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `habitgrid_core` linkage.
//! - Dispatch a `read` against a store and print the wire grid.

use habitgrid_core::db::{open_db, open_db_in_memory};
use habitgrid_core::{dispatch, ApiRequest, GridService, SqliteGridRepository, SqliteSnapshotRepository};

fn main() {
    println!("habitgrid_core version={}", habitgrid_core::core_version());

    // First argument: optional store path; defaults to an in-memory grid.
    let conn = match std::env::args().nth(1) {
        Some(path) => open_db(&path),
        None => open_db_in_memory(),
    };
    let conn = match conn {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("failed to open store: {err}");
            std::process::exit(1);
        }
    };

    let service = GridService::new(
        SqliteGridRepository::new(&conn),
        SqliteSnapshotRepository::new(&conn),
    );
    let today = chrono::Local::now().date_naive();
    let response = dispatch(&service, &ApiRequest::new("read", serde_json::json!({})), today);

    match serde_json::to_string_pretty(&response) {
        Ok(rendered) => println!("{rendered}"),
        Err(err) => {
            eprintln!("failed to render response: {err}");
            std::process::exit(1);
        }
    }
}
