//! Periodicity rule grammar.
//!
//! # Responsibility
//! - Parse the `<count>/<d|w|m>` frequency grammar.
//! - Render rules back to their canonical string form.
//!
//! # Invariants
//! - `count` is always at least 1.
//! - Parsing is total: malformed input degrades to the daily default and is
//!   never surfaced as an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

static RULE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)\s*/\s*([dwm])\s*$").expect("valid rule regex"));

/// Accounting period granularity of a frequency rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodUnit {
    Day,
    Week,
    Month,
}

impl PeriodUnit {
    fn suffix(self) -> char {
        match self {
            Self::Day => 'd',
            Self::Week => 'w',
            Self::Month => 'm',
        }
    }
}

/// Frequency target: `count` completions per `unit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodicityRule {
    pub count: u32,
    pub unit: PeriodUnit,
}

impl PeriodicityRule {
    /// The rule applied when a habit carries no usable periodicity: once a day.
    pub const fn daily_default() -> Self {
        Self {
            count: 1,
            unit: PeriodUnit::Day,
        }
    }

    /// Parses a raw periodicity string.
    ///
    /// Grammar: `<digits>/<d|w|m>`, surrounding whitespace tolerated.
    /// Empty, malformed or overflowing input yields the daily default; a
    /// zero count is clamped to 1.
    pub fn parse(raw: &str) -> Self {
        let Some(caps) = RULE_RE.captures(raw) else {
            return Self::daily_default();
        };
        let Ok(count) = caps[1].parse::<u32>() else {
            return Self::daily_default();
        };
        let unit = match &caps[2] {
            "d" => PeriodUnit::Day,
            "w" => PeriodUnit::Week,
            _ => PeriodUnit::Month,
        };
        Self {
            count: count.max(1),
            unit,
        }
    }
}

impl Display for PeriodicityRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.count, self.unit.suffix())
    }
}
