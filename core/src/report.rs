//! Reporting aggregates.
//!
//! These are the numbers the charting layer consumes — counts only, no
//! rendering. The queries themselves live in `store/report.rs`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive date range for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// The default report window: the seven days ending today.
    pub fn last_week(today: NaiveDate) -> Self {
        Self {
            from: today - chrono::Duration::days(7),
            to: today,
        }
    }
}

/// Paid vs unpaid counts over checks entered in a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaidBreakdown {
    pub paid: i64,
    pub not_paid: i64,
}

/// One bar of a letter-volume chart: how many letter-N stamps landed on
/// a given date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterBucket {
    pub date: NaiveDate,
    pub count: i64,
}
