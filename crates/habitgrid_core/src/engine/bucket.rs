//! Period bucketing over a habit's dated cells.
//!
//! # Responsibility
//! - Group a habit's cells into accounting periods under the rule in force
//!   per date, re-bucketing whenever the period unit or key changes.
//!
//! # Invariants
//! - Input cells are ascending by date; buckets come out in the same order.
//! - A bucket's target is the count of the *last* rule resolved inside the
//!   period: a mid-week frequency edit applies to the whole week.
//! - Dates whose rule resolves to `None` belong to no bucket and close any
//!   open one.

use crate::engine::resolver::resolve_rule;
use crate::model::habit::CellValue;
use crate::model::period::PeriodKey;
use crate::model::rule::PeriodUnit;
use crate::repo::snapshot_repo::SnapshotEntry;
use chrono::NaiveDate;

/// One cell as the engine sees it: date, grid column, current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatedCell {
    pub date: NaiveDate,
    pub column: usize,
    pub value: CellValue,
}

/// A contiguous run of same-period cells evaluated together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub unit: PeriodUnit,
    pub key: PeriodKey,
    pub target: u32,
    pub members: Vec<DatedCell>,
}

/// Groups `cells` into buckets under the per-date effective rule.
pub fn bucket_cells(
    cells: &[DatedCell],
    history: &[SnapshotEntry],
    live_periodicity: &str,
) -> Vec<Bucket> {
    let mut buckets = Vec::new();
    let mut open: Option<Bucket> = None;

    for cell in cells {
        let Some(rule) = resolve_rule(history, live_periodicity, cell.date) else {
            // Habit did not exist on this date; no accounting at all.
            if let Some(closed) = open.take() {
                buckets.push(closed);
            }
            continue;
        };

        let key = PeriodKey::for_date(cell.date, rule.unit);
        match open.as_mut() {
            Some(bucket) if bucket.unit == rule.unit && bucket.key == key => {
                // Last resolved rule inside the period wins.
                bucket.target = rule.count;
                bucket.members.push(*cell);
            }
            _ => {
                if let Some(closed) = open.take() {
                    buckets.push(closed);
                }
                open = Some(Bucket {
                    unit: rule.unit,
                    key,
                    target: rule.count,
                    members: vec![*cell],
                });
            }
        }
    }

    if let Some(closed) = open {
        buckets.push(closed);
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::{bucket_cells, DatedCell};
    use crate::model::habit::CellValue;
    use crate::model::rule::PeriodUnit;
    use crate::repo::snapshot_repo::SnapshotEntry;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(effective: NaiveDate, periodicity: &str) -> SnapshotEntry {
        SnapshotEntry {
            habit_id: Uuid::nil(),
            effective_date: effective,
            periodicity: periodicity.to_string(),
        }
    }

    fn unset_cells(dates: &[NaiveDate]) -> Vec<DatedCell> {
        dates
            .iter()
            .enumerate()
            .map(|(column, date)| DatedCell {
                date: *date,
                column,
                value: CellValue::Unset,
            })
            .collect()
    }

    #[test]
    fn daily_rule_yields_one_bucket_per_date() {
        let cells = unset_cells(&[date(2025, 6, 2), date(2025, 6, 3), date(2025, 6, 4)]);
        let buckets = bucket_cells(&cells, &[], "1/d");

        assert_eq!(buckets.len(), 3);
        assert!(buckets.iter().all(|b| b.unit == PeriodUnit::Day));
        assert!(buckets.iter().all(|b| b.members.len() == 1));
    }

    #[test]
    fn weekly_rule_groups_a_full_iso_week() {
        // 2025-06-02 (Mon) .. 2025-06-08 (Sun) is one ISO week.
        let dates: Vec<_> = (2..=8).map(|d| date(2025, 6, d)).collect();
        let buckets = bucket_cells(&unset_cells(&dates), &[], "2/w");

        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].unit, PeriodUnit::Week);
        assert_eq!(buckets[0].target, 2);
        assert_eq!(buckets[0].members.len(), 7);
    }

    #[test]
    fn week_boundary_starts_a_new_bucket() {
        // Sunday 2025-06-08 ends ISO week 23; Monday 2025-06-09 starts week 24.
        let cells = unset_cells(&[date(2025, 6, 8), date(2025, 6, 9)]);
        let buckets = bucket_cells(&cells, &[], "1/w");

        assert_eq!(buckets.len(), 2);
        assert_ne!(buckets[0].key, buckets[1].key);
    }

    #[test]
    fn rule_change_mid_calendar_week_splits_daily_from_weekly() {
        // Daily until 2025-05-31, weekly from 2025-06-01 (a Sunday). The
        // Sunday joins no earlier daily bucket: it opens a weekly bucket for
        // ISO week 22 on its own, and Monday 06-02 starts week 23.
        let history = vec![
            entry(date(2025, 5, 1), "1/d"),
            entry(date(2025, 6, 1), "3/w"),
        ];
        let dates: Vec<_> = [
            date(2025, 5, 30),
            date(2025, 5, 31),
            date(2025, 6, 1),
            date(2025, 6, 2),
            date(2025, 6, 3),
        ]
        .to_vec();
        let buckets = bucket_cells(&unset_cells(&dates), &history, "3/w");

        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets[0].unit, PeriodUnit::Day);
        assert_eq!(buckets[1].unit, PeriodUnit::Day);
        assert_eq!(buckets[2].unit, PeriodUnit::Week);
        assert_eq!(buckets[2].members.len(), 1);
        assert_eq!(buckets[2].target, 3);
        assert_eq!(buckets[3].unit, PeriodUnit::Week);
        assert_eq!(buckets[3].members.len(), 2);
    }

    #[test]
    fn last_resolved_rule_in_the_period_sets_the_target() {
        // Count bumped from 2/w to 4/w mid-week: the whole week's bucket
        // carries the later target.
        let history = vec![
            entry(date(2025, 6, 1), "2/w"),
            entry(date(2025, 6, 5), "4/w"),
        ];
        let dates: Vec<_> = (2..=8).map(|d| date(2025, 6, d)).collect();
        let buckets = bucket_cells(&unset_cells(&dates), &history, "4/w");

        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].target, 4);
    }

    #[test]
    fn empty_rule_dates_are_skipped_and_close_the_open_bucket() {
        // Habit springs into existence on 2025-06-05: earlier dates resolve
        // to the empty origin entry and get no bucket.
        let history = vec![
            entry(date(2025, 6, 2), ""),
            entry(date(2025, 6, 5), "1/d"),
        ];
        let dates: Vec<_> = (2..=6).map(|d| date(2025, 6, d)).collect();
        let buckets = bucket_cells(&unset_cells(&dates), &history, "1/d");

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].members[0].date, date(2025, 6, 5));
        assert_eq!(buckets[1].members[0].date, date(2025, 6, 6));
    }

    #[test]
    fn monthly_rule_groups_by_calendar_month() {
        let cells = unset_cells(&[date(2025, 5, 30), date(2025, 5, 31), date(2025, 6, 1)]);
        let buckets = bucket_cells(&cells, &[], "2/m");

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].members.len(), 2);
        assert_eq!(buckets[1].members.len(), 1);
    }
}
