//! Effective-rule resolution against the snapshot history.
//!
//! # Responsibility
//! - Return the frequency rule in force for a habit on a given date.
//!
//! # Invariants
//! - Dates older than every snapshot resolve to the oldest snapshot (the
//!   origin rule); editing today's live periodicity never retroactively
//!   changes past accounting.
//! - The live periodicity is consulted only when no history exists at all.
//! - `None` means the habit did not exist on that date; callers must skip
//!   accounting for it entirely.

use crate::model::rule::PeriodicityRule;
use crate::repo::snapshot_repo::SnapshotEntry;
use chrono::NaiveDate;

/// Resolves the rule in force on `date`.
///
/// `history` must be sorted ascending by effective date. Resolution order:
/// latest entry effective on or before `date`, else the oldest entry, else
/// the live string. An empty snapshot string resolves to `None`; an empty
/// live string resolves to the daily default (the habit exists in the live
/// grid, its periodicity cell is just blank).
pub fn resolve_rule(
    history: &[SnapshotEntry],
    live_periodicity: &str,
    date: NaiveDate,
) -> Option<PeriodicityRule> {
    let Some(oldest) = history.first() else {
        return Some(PeriodicityRule::parse(live_periodicity));
    };

    let picked = history
        .iter()
        .rev()
        .find(|entry| entry.effective_date <= date)
        .unwrap_or(oldest);

    if picked.periodicity.trim().is_empty() {
        return None;
    }
    Some(PeriodicityRule::parse(&picked.periodicity))
}

#[cfg(test)]
mod tests {
    use super::resolve_rule;
    use crate::model::rule::{PeriodUnit, PeriodicityRule};
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

    #[test]
    fn picks_latest_entry_on_or_before_the_date() {
        let history = vec![
            entry(date(2025, 5, 1), "1/d"),
            entry(date(2025, 6, 1), "3/w"),
        ];

        let rule = resolve_rule(&history, "2/m", date(2025, 6, 15)).unwrap();
        assert_eq!(rule.unit, PeriodUnit::Week);
        assert_eq!(rule.count, 3);

        let boundary = resolve_rule(&history, "2/m", date(2025, 6, 1)).unwrap();
        assert_eq!(boundary.unit, PeriodUnit::Week);
    }

    #[test]
    fn dates_before_all_history_use_the_oldest_entry_not_the_live_value() {
        let history = vec![entry(date(2025, 6, 1), "3/w")];

        let rule = resolve_rule(&history, "1/d", date(2025, 5, 20)).unwrap();
        assert_eq!(rule.unit, PeriodUnit::Week);
        assert_eq!(rule.count, 3);
    }

    #[test]
    fn no_history_falls_back_to_the_live_string() {
        let rule = resolve_rule(&[], "2/m", date(2025, 6, 15)).unwrap();
        assert_eq!(rule.unit, PeriodUnit::Month);
        assert_eq!(rule.count, 2);
    }

    #[test]
    fn empty_live_string_means_daily_default() {
        let rule = resolve_rule(&[], "", date(2025, 6, 15)).unwrap();
        assert_eq!(rule, PeriodicityRule::daily_default());
    }

    #[test]
    fn empty_snapshot_string_means_habit_did_not_exist() {
        let history = vec![
            entry(date(2025, 5, 1), ""),
            entry(date(2025, 6, 1), "1/d"),
        ];

        assert!(resolve_rule(&history, "1/d", date(2025, 5, 10)).is_none());
        assert!(resolve_rule(&history, "1/d", date(2025, 4, 1)).is_none());
        assert!(resolve_rule(&history, "1/d", date(2025, 6, 2)).is_some());
    }

    #[test]
    fn unparseable_snapshot_string_degrades_to_daily_default() {
        let history = vec![entry(date(2025, 5, 1), "whenever")];

        let rule = resolve_rule(&history, "3/w", date(2025, 5, 10)).unwrap();
        assert_eq!(rule, PeriodicityRule::daily_default());
    }
}
