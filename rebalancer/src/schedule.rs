//! Rebalance cadence: which calendar days a cycle should run on.
//!
//! Trading days are approximated as Monday through Friday; exchange holidays
//! are not modelled.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Deserialize;

/// How often a strategy rebalances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    /// Every trading day.
    Daily,
    /// The n-th trading day of each week (0 = first).
    WeekStart,
    /// The n-th trading day before the end of each month (0 = last).
    MonthEnd,
}

/// A cadence plus its day offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub cadence: Cadence,
    pub days_offset: u32,
}

impl Schedule {
    pub fn new(cadence: Cadence, days_offset: u32) -> Self {
        Self {
            cadence,
            days_offset,
        }
    }

    /// Should a cycle run on `date`?
    pub fn is_due(&self, date: NaiveDate) -> bool {
        if !is_trading_day(date) {
            return false;
        }
        match self.cadence {
            Cadence::Daily => true,
            Cadence::WeekStart => {
                let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
                nth_trading_day_from(monday, self.days_offset, 1)
                    .is_some_and(|d| d == date && d.iso_week() == date.iso_week())
            }
            Cadence::MonthEnd => {
                let last = last_day_of_month(date);
                nth_trading_day_from(last, self.days_offset, -1)
                    .is_some_and(|d| d == date && d.month() == date.month())
            }
        }
    }
}

fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Walk from `start` in direction `step` (+1/-1) and return the n-th trading day.
fn nth_trading_day_from(start: NaiveDate, n: u32, step: i64) -> Option<NaiveDate> {
    let mut day = start;
    let mut seen = 0;
    // Bounded walk: n weeks' worth of weekends at most
    for _ in 0..(n as i64 + 1) * 7 + 7 {
        if is_trading_day(day) {
            if seen == n {
                return Some(day);
            }
            seen += 1;
        }
        day += Duration::days(step);
    }
    None
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (y, m) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}
