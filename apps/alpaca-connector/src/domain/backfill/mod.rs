//! Weekly backfill window planning.
//!
//! A date range `[start, end]` is cut into windows of at most eight calendar
//! days (`current ..= current + 7`). Window bounds cover whole days: 00:00 of the
//! first day through the last nanosecond of the last day.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};

/// Days added to a window's first date to get its last date.
pub const WINDOW_SPAN_DAYS: u64 = 7;

/// Default lookback when no start date is given.
pub const DEFAULT_LOOKBACK_DAYS: u64 = 30;

/// Default per-window row limit.
pub const DEFAULT_BATCH_SIZE: u32 = 1000;

/// One backfill request window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillWindow {
    /// First calendar date covered.
    pub start_date: NaiveDate,
    /// Last calendar date covered.
    pub end_date: NaiveDate,
}

impl BackfillWindow {
    /// Midnight UTC of the first date.
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start_date.and_time(NaiveTime::MIN).and_utc()
    }

    /// Last representable instant of the last date.
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.end_date.and_time(end_of_day()).and_utc()
    }

    /// Calendar days between the first and last date.
    #[must_use]
    pub fn span_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN)
}

/// Partition `[start, end]` into consecutive windows.
///
/// Returns no windows when `start > end`.
#[must_use]
pub fn plan_windows(start: NaiveDate, end: NaiveDate) -> Vec<BackfillWindow> {
    let mut windows = Vec::new();
    let mut current = start;

    while current <= end {
        let batch_end = current
            .checked_add_days(Days::new(WINDOW_SPAN_DAYS))
            .map_or(end, |d| d.min(end));
        windows.push(BackfillWindow {
            start_date: current,
            end_date: batch_end,
        });
        match batch_end.checked_add_days(Days::new(1)) {
            Some(next) => current = next,
            None => break,
        }
    }

    windows
}

/// Default backfill range: the last thirty days through `today`.
#[must_use]
pub fn default_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today
        .checked_sub_days(Days::new(DEFAULT_LOOKBACK_DAYS))
        .unwrap_or(today);
    (start, today)
}
