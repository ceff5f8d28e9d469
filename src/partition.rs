//! Split a logical time range into date-bounded feed queries.
//!
//! Google News RSS returns at most ~100 items per request and has no paging,
//! so a long range queried in one go only ever shows its newest slice. The
//! partitioner cuts the range into contiguous day windows, newest first, and
//! each window becomes one upstream query using the `after:` / `before:`
//! search operators.
//!
//! | Range | Windows | Width (days) |
//! |-------|---------|--------------|
//! | 1d    | 1       | 1            |
//! | 3d    | 2       | 2            |
//! | 7d    | 2       | 4            |
//! | 30d   | 3       | 10           |
//! | 1y    | 6       | 61           |
//!
//! Widths are rounded up, so the windows together can reach a little further
//! back than the nominal range; they never leave a gap.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// The closed set of ranges a search can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
pub enum TimeRange {
    #[serde(rename = "1d")]
    Day,
    #[default]
    #[serde(rename = "3d")]
    ThreeDays,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "1y")]
    Year,
}

impl TimeRange {
    pub const ALL: [TimeRange; 5] = [
        TimeRange::Day,
        TimeRange::ThreeDays,
        TimeRange::Week,
        TimeRange::Month,
        TimeRange::Year,
    ];

    pub fn token(self) -> &'static str {
        match self {
            TimeRange::Day => "1d",
            TimeRange::ThreeDays => "3d",
            TimeRange::Week => "7d",
            TimeRange::Month => "30d",
            TimeRange::Year => "1y",
        }
    }

    /// Length of the range in days.
    pub fn days(self) -> u64 {
        match self {
            TimeRange::Day => 1,
            TimeRange::ThreeDays => 3,
            TimeRange::Week => 7,
            TimeRange::Month => 30,
            TimeRange::Year => 365,
        }
    }

    /// Number of upstream queries the range is split into.
    pub fn window_count(self) -> u64 {
        match self {
            TimeRange::Day => 1,
            TimeRange::ThreeDays | TimeRange::Week => 2,
            TimeRange::Month => 3,
            TimeRange::Year => 6,
        }
    }

    /// Width of each window in days, rounded up.
    pub fn window_days(self) -> u64 {
        self.days().div_ceil(self.window_count())
    }

    /// Parse a range token, degrading to the single-window range when the
    /// token is not one we know.
    pub fn from_token_or_minimal(token: &str) -> Self {
        token.parse().unwrap_or_else(|_| {
            warn!(token, "Unrecognized time range; using a single 1d window");
            TimeRange::Day
        })
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1d" => Ok(TimeRange::Day),
            "3d" => Ok(TimeRange::ThreeDays),
            "7d" => Ok(TimeRange::Week),
            "30d" => Ok(TimeRange::Month),
            "1y" => Ok(TimeRange::Year),
            other => Err(format!(
                "unknown time range {other:?}, expected one of 1d, 3d, 7d, 30d, 1y"
            )),
        }
    }
}

/// One date-bounded slice of a search.
///
/// `before` is `None` only for the newest window, so items published right at
/// the edge of "today" are never cut off by clock skew.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub after: NaiveDate,
    pub before: Option<NaiveDate>,
}

impl Window {
    /// The search-operator clause appended to the topic.
    pub fn clause(&self) -> String {
        match self.before {
            Some(before) => format!(
                "after:{} before:{}",
                self.after.format("%Y-%m-%d"),
                before.format("%Y-%m-%d")
            ),
            None => format!("after:{}", self.after.format("%Y-%m-%d")),
        }
    }

    /// Full upstream query text for `topic` restricted to this window.
    pub fn query(&self, topic: &str) -> String {
        format!("{} {}", topic.trim(), self.clause())
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clause())
    }
}

/// Compute the windows for `range`, newest first, relative to `now`.
///
/// Pure function of its inputs: the same `(range, now)` always yields the
/// same windows.
pub fn partition(range: TimeRange, now: DateTime<Utc>) -> Vec<Window> {
    let today = now.date_naive();
    let width = range.window_days();

    (0..range.window_count())
        .map(|i| {
            let after = today - Days::new(width * (i + 1));
            let before = (i > 0).then(|| today - Days::new(width * i));
            Window { after, before }
        })
        .collect()
}
