//! Period planning for report jobs.
//!
//! Splits a requested inclusive date range into windows the report API accepts:
//! ranges over 90 days are cut into calendar quarters, and no window may span
//! the date on which the report format switched versions.

use chrono::{Days, Months, NaiveDate};

use crate::marketplace::ApiVersion;

/// Longest span (`to - from`, in days) requested in a single call.
pub const MAX_SINGLE_WINDOW_DAYS: i64 = 90;

/// Inclusive date window served by a single report API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub api: ApiVersion,
}

impl Window {
    /// Number of calendar days covered, both ends included.
    pub fn len_days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }
}

/// Plan the ordered windows covering `[from, to]`.
///
/// Returns an empty plan when `from > to`.
pub fn plan(from: NaiveDate, to: NaiveDate, cutover: NaiveDate) -> Vec<Window> {
    if from > to {
        return Vec::new();
    }

    let spans = if (to - from).num_days() <= MAX_SINGLE_WINDOW_DAYS {
        vec![(from, to)]
    } else {
        quarters(from, to)
    };

    let mut windows = Vec::with_capacity(spans.len() + 1);
    for (start, end) in spans {
        match cutover.pred_opt() {
            Some(before_cutover) if start < cutover && end >= cutover => {
                windows.push(Window {
                    from: start,
                    to: before_cutover,
                    api: ApiVersion::Legacy,
                });
                windows.push(Window {
                    from: cutover,
                    to: end,
                    api: ApiVersion::Current,
                });
            }
            _ => windows.push(Window {
                from: start,
                to: end,
                api: ApiVersion::for_start(start, cutover),
            }),
        }
    }
    windows
}

/// Consecutive `[cursor, cursor + 3 months - 1 day]` spans clipped to `to`.
fn quarters(from: NaiveDate, to: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut spans = Vec::new();
    let mut cursor = from;

    loop {
        let end = cursor
            .checked_add_months(Months::new(3))
            .and_then(|d| d.pred_opt())
            .map_or(to, |d| d.min(to));
        spans.push((cursor, end));

        match end.checked_add_days(Days::new(1)) {
            Some(next) if next <= to => cursor = next,
            _ => break,
        }
    }
    spans
}
