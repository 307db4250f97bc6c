use chrono::NaiveDate;
use habitgrid_core::db::open_db_in_memory;
use habitgrid_core::{
    CellValue, GridRepoError, GridRepository, HabitRow, SqliteGridRepository,
};
use rusqlite::params;
use uuid::Uuid;

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGridRepository::new(&conn);

    let habit = HabitRow::new("water", "1/d");
    let id = repo.create_habit(&habit).unwrap();
    assert_eq!(id, habit.id);

    let loaded = repo.habit_by_name("water").unwrap().unwrap();
    assert_eq!(loaded.id, habit.id);
    assert_eq!(loaded.name, "water");
    assert_eq!(loaded.periodicity, "1/d");
    assert_eq!(loaded.position, 0);
}

#[test]
fn created_habits_append_in_row_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGridRepository::new(&conn);

    repo.create_habit(&HabitRow::new("first", "")).unwrap();
    repo.create_habit(&HabitRow::new("second", "")).unwrap();
    repo.create_habit(&HabitRow::new("third", "")).unwrap();

    let names: Vec<String> = repo
        .list_habits()
        .unwrap()
        .into_iter()
        .map(|habit| habit.name)
        .collect();
    assert_eq!(names, vec!["first", "second", "third"]);
}

#[test]
fn duplicate_names_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGridRepository::new(&conn);

    repo.create_habit(&HabitRow::new("water", "")).unwrap();
    let err = repo.create_habit(&HabitRow::new("water", "2/w")).unwrap_err();
    assert!(matches!(err, GridRepoError::DuplicateName(name) if name == "water"));
}

#[test]
fn rename_rejects_collisions_and_missing_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGridRepository::new(&conn);

    let water = HabitRow::new("water", "");
    repo.create_habit(&water).unwrap();
    repo.create_habit(&HabitRow::new("stretch", "")).unwrap();

    let err = repo.rename_habit(water.id, "stretch").unwrap_err();
    assert!(matches!(err, GridRepoError::DuplicateName(_)));

    repo.rename_habit(water.id, "hydrate").unwrap();
    assert!(repo.habit_by_name("water").unwrap().is_none());
    assert!(repo.habit_by_name("hydrate").unwrap().is_some());

    let missing = Uuid::new_v4();
    let err = repo.rename_habit(missing, "ghost").unwrap_err();
    assert!(matches!(err, GridRepoError::HabitNotFound(id) if id == missing));
}

#[test]
fn move_habit_renumbers_positions_densely() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGridRepository::new(&conn);

    let a = HabitRow::new("a", "");
    let b = HabitRow::new("b", "");
    let c = HabitRow::new("c", "");
    for habit in [&a, &b, &c] {
        repo.create_habit(habit).unwrap();
    }

    repo.move_habit(c.id, 0).unwrap();

    let ordered = repo.list_habits().unwrap();
    let names: Vec<&str> = ordered.iter().map(|habit| habit.name.as_str()).collect();
    assert_eq!(names, vec!["c", "a", "b"]);
    let positions: Vec<i64> = ordered.iter().map(|habit| habit.position).collect();
    assert_eq!(positions, vec![0, 1, 2]);

    // Out-of-range targets clamp to the grid edges.
    repo.move_habit(c.id, 99).unwrap();
    let names: Vec<String> = repo
        .list_habits()
        .unwrap()
        .into_iter()
        .map(|habit| habit.name)
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn date_registration_is_idempotent_and_sorted() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGridRepository::new(&conn);

    repo.add_date(date(2025, 6, 3)).unwrap();
    repo.add_date(date(2025, 6, 1)).unwrap();
    repo.add_date(date(2025, 6, 3)).unwrap();

    assert_eq!(
        repo.list_dates().unwrap(),
        vec![date(2025, 6, 1), date(2025, 6, 3)]
    );
}

#[test]
fn missing_cells_read_as_unset_without_note() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGridRepository::new(&conn);

    let habit = HabitRow::new("water", "");
    repo.create_habit(&habit).unwrap();
    repo.add_date(date(2025, 6, 1)).unwrap();

    let cell = repo.cell(habit.id, date(2025, 6, 1)).unwrap();
    assert_eq!(cell.value, CellValue::Unset);
    assert_eq!(cell.note, None);
}

#[test]
fn out_of_range_stored_values_normalize_to_unset() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGridRepository::new(&conn);

    let habit = HabitRow::new("water", "");
    repo.create_habit(&habit).unwrap();
    repo.add_date(date(2025, 6, 1)).unwrap();
    conn.execute(
        "INSERT INTO cells (habit_id, date, value) VALUES (?1, '2025-06-01', 9);",
        params![habit.id.to_string()],
    )
    .unwrap();

    let cell = repo.cell(habit.id, date(2025, 6, 1)).unwrap();
    assert_eq!(cell.value, CellValue::Unset);
}

#[test]
fn value_and_note_writes_do_not_clobber_each_other() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGridRepository::new(&conn);

    let habit = HabitRow::new("water", "");
    repo.create_habit(&habit).unwrap();
    repo.add_date(date(2025, 6, 1)).unwrap();

    repo.set_cell_value(habit.id, date(2025, 6, 1), CellValue::Done)
        .unwrap();
    repo.set_cell_note(habit.id, date(2025, 6, 1), Some("two liters"))
        .unwrap();
    repo.set_cell_value(habit.id, date(2025, 6, 1), CellValue::DoneAlt)
        .unwrap();

    let cell = repo.cell(habit.id, date(2025, 6, 1)).unwrap();
    assert_eq!(cell.value, CellValue::DoneAlt);
    assert_eq!(cell.note.as_deref(), Some("two liters"));

    repo.set_cell_note(habit.id, date(2025, 6, 1), None).unwrap();
    let cell = repo.cell(habit.id, date(2025, 6, 1)).unwrap();
    assert_eq!(cell.value, CellValue::DoneAlt);
    assert_eq!(cell.note, None);
}

#[test]
fn cell_writes_to_unregistered_dates_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGridRepository::new(&conn);

    let habit = HabitRow::new("water", "");
    repo.create_habit(&habit).unwrap();

    let err = repo
        .set_cell_value(habit.id, date(2025, 6, 1), CellValue::Done)
        .unwrap_err();
    assert!(matches!(err, GridRepoError::DateNotRegistered(d) if d == date(2025, 6, 1)));
}

#[test]
fn delete_habit_cascades_to_cells() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGridRepository::new(&conn);

    let habit = HabitRow::new("water", "");
    repo.create_habit(&habit).unwrap();
    repo.add_date(date(2025, 6, 1)).unwrap();
    repo.set_cell_value(habit.id, date(2025, 6, 1), CellValue::Done)
        .unwrap();

    repo.delete_habit(habit.id).unwrap();

    assert!(repo.habit_by_name("water").unwrap().is_none());
    let cells: i64 = conn
        .query_row("SELECT COUNT(*) FROM cells;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(cells, 0);
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
