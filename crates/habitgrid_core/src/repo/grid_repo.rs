//! Grid repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide persistence APIs for habit rows, the shared date header and
//!   per-date cells.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Habit rows are ordered by `position ASC, name ASC`.
//! - The date header is ordered ascending; dates are stored as `YYYY-MM-DD`
//!   text so lexicographic order is chronological.
//! - Reading a (habit, date) pair with no stored row yields an unset cell.
//! - Out-of-range stored cell values normalize to `Unset` on read.

use crate::db::DbError;
use crate::model::habit::{Cell, CellValue, HabitId, HabitRow};
use crate::repo::{format_date, parse_date};
use chrono::NaiveDate;
use log::warn;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const HABIT_SELECT_SQL: &str = "SELECT id, name, periodicity, position FROM habits";

pub type GridRepoResult<T> = Result<T, GridRepoError>;

/// Errors from grid persistence and query operations.
#[derive(Debug)]
pub enum GridRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target habit row does not exist.
    HabitNotFound(HabitId),
    /// A habit with this name already exists.
    DuplicateName(String),
    /// Cell write addressed a date missing from the grid header.
    DateNotRegistered(NaiveDate),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for GridRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::HabitNotFound(id) => write!(f, "habit not found: {id}"),
            Self::DuplicateName(name) => write!(f, "habit name already in use: `{name}`"),
            Self::DateNotRegistered(date) => {
                write!(f, "date column not registered: {}", format_date(*date))
            }
            Self::InvalidData(message) => write!(f, "invalid persisted grid data: {message}"),
        }
    }
}

impl Error for GridRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for GridRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for GridRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for the habit grid.
pub trait GridRepository {
    fn create_habit(&self, habit: &HabitRow) -> GridRepoResult<HabitId>;
    fn habit_by_name(&self, name: &str) -> GridRepoResult<Option<HabitRow>>;
    fn list_habits(&self) -> GridRepoResult<Vec<HabitRow>>;
    fn rename_habit(&self, id: HabitId, new_name: &str) -> GridRepoResult<()>;
    fn set_periodicity(&self, id: HabitId, periodicity: &str) -> GridRepoResult<()>;
    fn delete_habit(&self, id: HabitId) -> GridRepoResult<()>;
    fn move_habit(&self, id: HabitId, position: i64) -> GridRepoResult<()>;

    fn add_date(&self, date: NaiveDate) -> GridRepoResult<()>;
    fn list_dates(&self) -> GridRepoResult<Vec<NaiveDate>>;

    fn cell(&self, id: HabitId, date: NaiveDate) -> GridRepoResult<Cell>;
    fn cells_for_habit(&self, id: HabitId) -> GridRepoResult<Vec<(NaiveDate, Cell)>>;
    fn set_cell_value(&self, id: HabitId, date: NaiveDate, value: CellValue) -> GridRepoResult<()>;
    fn set_cell_note(
        &self,
        id: HabitId,
        date: NaiveDate,
        note: Option<&str>,
    ) -> GridRepoResult<()>;
}

/// SQLite-backed grid repository.
pub struct SqliteGridRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGridRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn name_in_use(&self, name: &str, exclude: Option<HabitId>) -> GridRepoResult<bool> {
        let taken: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM habits WHERE name = ?1 AND id != ?2);",
            params![
                name,
                exclude.map_or_else(String::new, |id| id.to_string())
            ],
            |row| row.get(0),
        )?;
        Ok(taken == 1)
    }

    fn ensure_habit(&self, id: HabitId) -> GridRepoResult<()> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM habits WHERE id = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(GridRepoError::HabitNotFound(id));
        }
        Ok(())
    }

    fn ensure_date(&self, date: NaiveDate) -> GridRepoResult<()> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM grid_dates WHERE date = ?1);",
            [format_date(date)],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(GridRepoError::DateNotRegistered(date));
        }
        Ok(())
    }
}

impl GridRepository for SqliteGridRepository<'_> {
    fn create_habit(&self, habit: &HabitRow) -> GridRepoResult<HabitId> {
        if self.name_in_use(&habit.name, None)? {
            return Err(GridRepoError::DuplicateName(habit.name.clone()));
        }

        // New rows always append; position is assigned here, not by callers.
        self.conn.execute(
            "INSERT INTO habits (id, name, periodicity, position)
             VALUES (?1, ?2, ?3, (SELECT COUNT(*) FROM habits));",
            params![
                habit.id.to_string(),
                habit.name.as_str(),
                habit.periodicity.as_str()
            ],
        )?;

        Ok(habit.id)
    }

    fn habit_by_name(&self, name: &str) -> GridRepoResult<Option<HabitRow>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{HABIT_SELECT_SQL} WHERE name = ?1;"))?;
        let mut rows = stmt.query([name])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_habit_row(row)?));
        }
        Ok(None)
    }

    fn list_habits(&self) -> GridRepoResult<Vec<HabitRow>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{HABIT_SELECT_SQL} ORDER BY position ASC, name ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut habits = Vec::new();
        while let Some(row) = rows.next()? {
            habits.push(parse_habit_row(row)?);
        }
        Ok(habits)
    }

    fn rename_habit(&self, id: HabitId, new_name: &str) -> GridRepoResult<()> {
        if self.name_in_use(new_name, Some(id))? {
            return Err(GridRepoError::DuplicateName(new_name.to_string()));
        }

        let changed = self.conn.execute(
            "UPDATE habits SET name = ?1 WHERE id = ?2;",
            params![new_name, id.to_string()],
        )?;
        if changed == 0 {
            return Err(GridRepoError::HabitNotFound(id));
        }
        Ok(())
    }

    fn set_periodicity(&self, id: HabitId, periodicity: &str) -> GridRepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE habits SET periodicity = ?1 WHERE id = ?2;",
            params![periodicity, id.to_string()],
        )?;
        if changed == 0 {
            return Err(GridRepoError::HabitNotFound(id));
        }
        Ok(())
    }

    fn delete_habit(&self, id: HabitId) -> GridRepoResult<()> {
        // Cells and snapshot history go with the row via ON DELETE CASCADE.
        let changed = self
            .conn
            .execute("DELETE FROM habits WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(GridRepoError::HabitNotFound(id));
        }
        Ok(())
    }

    fn move_habit(&self, id: HabitId, position: i64) -> GridRepoResult<()> {
        let ordered = self.list_habits()?;
        let Some(from) = ordered.iter().position(|habit| habit.id == id) else {
            return Err(GridRepoError::HabitNotFound(id));
        };

        let mut ids: Vec<HabitId> = ordered.iter().map(|habit| habit.id).collect();
        let moved = ids.remove(from);
        let to = position.clamp(0, ids.len() as i64) as usize;
        ids.insert(to, moved);

        // Renumber the full order so positions stay dense and unique.
        for (index, habit_id) in ids.iter().enumerate() {
            self.conn.execute(
                "UPDATE habits SET position = ?1 WHERE id = ?2;",
                params![index as i64, habit_id.to_string()],
            )?;
        }
        Ok(())
    }

    fn add_date(&self, date: NaiveDate) -> GridRepoResult<()> {
        self.conn.execute(
            "INSERT INTO grid_dates (date) VALUES (?1)
             ON CONFLICT (date) DO NOTHING;",
            [format_date(date)],
        )?;
        Ok(())
    }

    fn list_dates(&self) -> GridRepoResult<Vec<NaiveDate>> {
        let mut stmt = self
            .conn
            .prepare("SELECT date FROM grid_dates ORDER BY date ASC;")?;
        let mut rows = stmt.query([])?;
        let mut dates = Vec::new();
        while let Some(row) = rows.next()? {
            let raw: String = row.get(0)?;
            match parse_date(&raw) {
                Some(date) => dates.push(date),
                None => warn!(
                    "event=grid_read module=repo status=skip reason=malformed_date value={raw}"
                ),
            }
        }
        Ok(dates)
    }

    fn cell(&self, id: HabitId, date: NaiveDate) -> GridRepoResult<Cell> {
        let found = self
            .conn
            .query_row(
                "SELECT value, note FROM cells WHERE habit_id = ?1 AND date = ?2;",
                params![id.to_string(), format_date(date)],
                |row| {
                    Ok(Cell {
                        value: CellValue::from_raw(row.get::<_, i64>(0)?),
                        note: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(found.unwrap_or_default())
    }

    fn cells_for_habit(&self, id: HabitId) -> GridRepoResult<Vec<(NaiveDate, Cell)>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, value, note FROM cells WHERE habit_id = ?1 ORDER BY date ASC;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut cells = Vec::new();
        while let Some(row) = rows.next()? {
            let raw_date: String = row.get(0)?;
            let Some(date) = parse_date(&raw_date) else {
                warn!(
                    "event=grid_read module=repo status=skip reason=malformed_date value={raw_date}"
                );
                continue;
            };
            cells.push((
                date,
                Cell {
                    value: CellValue::from_raw(row.get::<_, i64>(1)?),
                    note: row.get(2)?,
                },
            ));
        }
        Ok(cells)
    }

    fn set_cell_value(&self, id: HabitId, date: NaiveDate, value: CellValue) -> GridRepoResult<()> {
        self.ensure_habit(id)?;
        self.ensure_date(date)?;

        self.conn.execute(
            "INSERT INTO cells (habit_id, date, value) VALUES (?1, ?2, ?3)
             ON CONFLICT (habit_id, date) DO UPDATE SET value = excluded.value;",
            params![id.to_string(), format_date(date), value.as_i64()],
        )?;
        Ok(())
    }

    fn set_cell_note(
        &self,
        id: HabitId,
        date: NaiveDate,
        note: Option<&str>,
    ) -> GridRepoResult<()> {
        self.ensure_habit(id)?;
        self.ensure_date(date)?;

        self.conn.execute(
            "INSERT INTO cells (habit_id, date, note) VALUES (?1, ?2, ?3)
             ON CONFLICT (habit_id, date) DO UPDATE SET note = excluded.note;",
            params![id.to_string(), format_date(date), note],
        )?;
        Ok(())
    }
}

fn parse_habit_row(row: &Row<'_>) -> GridRepoResult<HabitRow> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        GridRepoError::InvalidData(format!("invalid uuid value `{id_text}` in habits.id"))
    })?;

    Ok(HabitRow {
        id,
        name: row.get("name")?,
        periodicity: row.get("periodicity")?,
        position: row.get("position")?,
    })
}
