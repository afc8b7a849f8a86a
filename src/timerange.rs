// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Half-open interval `[start, end)` of epoch milliseconds.
///
/// Open bounds are `i64::MIN` / `i64::MAX`. Construction orders the bounds,
/// so `start <= end` always holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeRange {
    start: i64,
    end: i64,
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn between<Tz: TimeZone>(start: &DateTime<Tz>, end: &DateTime<Tz>) -> Self {
        Self::new(start.timestamp_millis(), end.timestamp_millis())
    }

    pub fn starting_at<Tz: TimeZone>(start: &DateTime<Tz>) -> Self {
        Self::new(start.timestamp_millis(), i64::MAX)
    }

    pub fn ending_at<Tz: TimeZone>(end: &DateTime<Tz>) -> Self {
        Self::new(i64::MIN, end.timestamp_millis())
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        match self.start {
            i64::MIN => None,
            ms => DateTime::<Utc>::from_timestamp_millis(ms),
        }
    }

    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        match self.end {
            i64::MAX => None,
            ms => DateTime::<Utc>::from_timestamp_millis(ms),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains_instant(&self, ms: i64) -> bool {
        ms >= self.start && ms < self.end
    }

    /// Empty ranges never overlap anything.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        if self.start < other.start {
            self.end > other.start
        } else {
            other.end > self.start
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |date: Option<DateTime<Utc>>| match date {
            Some(d) => d.to_rfc3339(),
            None => "*".to_string(),
        };
        write!(f, "[{}, {})", bound(self.start_date()), bound(self.end_date()))
    }
}
