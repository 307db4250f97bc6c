//! Accounting period identity.
//!
//! # Responsibility
//! - Derive the period a date belongs to for a given rule unit.
//! - Give periods a total order usable for "is this period elapsed" checks.
//!
//! # Invariants
//! - Week identity is ISO-8601 (Thursday-anchored), not calendar-month
//!   aligned; a week spanning a month boundary is one period.
//! - Ordering is only meaningful between keys of the same unit.

use crate::model::rule::PeriodUnit;
use chrono::{Datelike, NaiveDate};

/// Identity of one accounting period.
///
/// Field order inside the variants drives the derived ordering: year before
/// week/month, so same-unit keys compare chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PeriodKey {
    /// One calendar day.
    Day(NaiveDate),
    /// One ISO week.
    Week { iso_year: i32, iso_week: u32 },
    /// One calendar month.
    Month { year: i32, month: u32 },
}

impl PeriodKey {
    /// Returns the period `date` falls into under `unit`.
    pub fn for_date(date: NaiveDate, unit: PeriodUnit) -> Self {
        match unit {
            PeriodUnit::Day => Self::Day(date),
            PeriodUnit::Week => {
                let week = date.iso_week();
                Self::Week {
                    iso_year: week.year(),
                    iso_week: week.week(),
                }
            }
            PeriodUnit::Month => Self::Month {
                year: date.year(),
                month: date.month(),
            },
        }
    }
}
