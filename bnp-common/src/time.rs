//! Local wall-clock access
//!
//! "Today" and "last hour" are evaluated against local time at query time.
//! Operations take a `Clock` so tests can pin the current moment.

use chrono::{Local, NaiveDate, NaiveDateTime};
use std::fmt::Debug;

/// Source of the current local date and time
pub trait Clock: Send + Sync + Debug {
    /// Current local date and time
    fn now(&self) -> NaiveDateTime;

    /// Current local calendar date
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Clock backed by the system's local time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock frozen at a fixed moment
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Format a date the way the detection store keeps it (`YYYY-MM-DD`)
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Format a timestamp as `YYYY-MM-DD HH:MM:SS`, comparable with `Date || ' ' || Time`
pub fn format_timestamp(moment: NaiveDateTime) -> String {
    moment.format("%Y-%m-%d %H:%M:%S").to_string()
}
