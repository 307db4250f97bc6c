//! Period outcome evaluation.
//!
//! # Responsibility
//! - Assign pass/fail/excused outcomes to a bucket's unresolved cells,
//!   given how much of the period has elapsed relative to "today".
//!
//! # Invariants
//! - Explicit completions are never touched.
//! - Only changed values are emitted; re-evaluating settled data yields
//!   nothing.
//! - Failure candidates are ranked by badness score, ties broken by grid
//!   column order, so evaluation is deterministic.

use crate::engine::bucket::{Bucket, DatedCell};
use crate::model::habit::CellValue;
use crate::model::period::PeriodKey;
use crate::model::rule::PeriodUnit;
use chrono::NaiveDate;

/// One pending cell mutation produced by evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellWrite {
    pub date: NaiveDate,
    pub column: usize,
    pub value: CellValue,
}

/// Evaluates one bucket against `today` and returns the changed cells.
pub fn evaluate_bucket(bucket: &Bucket, today: NaiveDate) -> Vec<CellWrite> {
    match bucket.unit {
        PeriodUnit::Day => evaluate_day(bucket, today),
        PeriodUnit::Week | PeriodUnit::Month => evaluate_span(bucket, today),
    }
}

/// A day bucket holds a single cell: strictly-past and not explicitly
/// completed means failed; today and the future are never forced.
fn evaluate_day(bucket: &Bucket, today: NaiveDate) -> Vec<CellWrite> {
    bucket
        .members
        .iter()
        .filter(|cell| cell.date < today)
        .filter(|cell| matches!(cell.value, CellValue::Unset | CellValue::Excused))
        .map(|cell| write(cell, CellValue::Failed))
        .collect()
}

fn evaluate_span(bucket: &Bucket, today: NaiveDate) -> Vec<CellWrite> {
    let done = bucket
        .members
        .iter()
        .filter(|cell| cell.value.is_done())
        .count() as u32;

    // Period identity, not raw dates: a bucket ending mid-calendar-week is
    // still current while today falls in the same ISO week.
    let is_past = bucket.key < PeriodKey::for_date(today, bucket.unit);

    if is_past {
        settle_elapsed(bucket, done)
    } else {
        excuse_overachievable(bucket, done, today)
    }
}

/// The period is over: exactly `target - done` of the non-done cells become
/// failed, the rest excused. Already-failed cells are preferred to stay
/// failed (lowest badness score), then untouched cells, then anything else.
fn settle_elapsed(bucket: &Bucket, done: u32) -> Vec<CellWrite> {
    let needed = bucket.target.saturating_sub(done) as usize;

    let mut candidates: Vec<&DatedCell> = bucket
        .members
        .iter()
        .filter(|cell| !cell.value.is_done())
        .collect();
    candidates.sort_by_key(|cell| (badness(cell.value), cell.column));

    candidates
        .iter()
        .enumerate()
        .map(|(rank, cell)| {
            let outcome = if rank < needed {
                CellValue::Failed
            } else {
                CellValue::Excused
            };
            (cell, outcome)
        })
        .filter(|(cell, outcome)| cell.value != *outcome)
        .map(|(cell, outcome)| write(cell, outcome))
        .collect()
}

/// The period is still open: when the target is still reachable without the
/// days already skipped, those skipped days are excused rather than left to
/// fail later.
fn excuse_overachievable(bucket: &Bucket, done: u32, today: NaiveDate) -> Vec<CellWrite> {
    let remaining = bucket
        .members
        .iter()
        .filter(|cell| cell.date >= today)
        .count() as u32;

    if done + remaining < bucket.target {
        return Vec::new();
    }

    bucket
        .members
        .iter()
        .filter(|cell| cell.date < today && cell.value == CellValue::Unset)
        .map(|cell| write(cell, CellValue::Excused))
        .collect()
}

fn badness(value: CellValue) -> u8 {
    match value {
        CellValue::Failed => 0,
        CellValue::Unset => 1,
        _ => 2,
    }
}

fn write(cell: &DatedCell, value: CellValue) -> CellWrite {
    CellWrite {
        date: cell.date,
        column: cell.column,
        value,
    }
}
