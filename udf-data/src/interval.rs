use std::cmp::Ordering;
use std::fmt;

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use udf_errors::{UdfError, UdfResult};

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;
/// Used only to order intervals, the same way PostgreSQL does.
const DAYS_PER_MONTH: i64 = 30;

/// A SQL `interval`: a calendar part (months and days, whose length depends on the date they are
/// applied to) and an exact part in microseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    months: i32,
    days: i32,
    micros: i64,
}

impl Interval {
    pub fn new(months: i32, days: i32, micros: i64) -> Self {
        Self {
            months,
            days,
            micros,
        }
    }

    /// An interval of exactly `days` calendar days.
    pub fn from_days(days: i32) -> Self {
        Self::new(0, days, 0)
    }

    /// An interval of `days` calendar days, failing if `days` does not fit the interval's day
    /// field.
    pub fn try_from_days(days: i64) -> UdfResult<Self> {
        i32::try_from(days)
            .map(Self::from_days)
            .map_err(|_| UdfError::DateOutOfRange(format!("{days} days")))
    }

    /// The interval's length in microseconds, treating a month as 30 days.
    fn approximate_micros(&self) -> i128 {
        (i128::from(self.months) * i128::from(DAYS_PER_MONTH) + i128::from(self.days))
            * i128::from(MICROS_PER_DAY)
            + i128::from(self.micros)
    }

    /// Add the calendar part of this interval to `date`. Months are applied before days, and a
    /// day-of-month past the end of the target month is clamped to its last day.
    pub fn add_to_date(&self, date: NaiveDate) -> UdfResult<NaiveDate> {
        let out_of_range = || UdfError::DateOutOfRange(format!("{date} + {self}"));

        let date = match self.months.cmp(&0) {
            Ordering::Equal => Some(date),
            Ordering::Greater => date.checked_add_months(Months::new(self.months.unsigned_abs())),
            Ordering::Less => date.checked_sub_months(Months::new(self.months.unsigned_abs())),
        }
        .ok_or_else(out_of_range)?;

        let days = Days::new(u64::from(self.days.unsigned_abs()));
        if self.days >= 0 {
            date.checked_add_days(days)
        } else {
            date.checked_sub_days(days)
        }
        .ok_or_else(out_of_range)
    }
}

impl PartialOrd for Interval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Interval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.approximate_micros()
            .cmp(&other.approximate_micros())
            .then_with(|| (self.months, self.days).cmp(&(other.months, other.days)))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(3);
        let (years, months) = (self.months / 12, self.months % 12);
        if years != 0 {
            parts.push(format!("{years} year{}", if years.abs() == 1 { "" } else { "s" }));
        }
        if months != 0 {
            parts.push(format!("{months} mon{}", if months.abs() == 1 { "" } else { "s" }));
        }
        if self.days != 0 {
            let days = self.days;
            parts.push(format!("{days} day{}", if days.abs() == 1 { "" } else { "s" }));
        }
        if self.micros != 0 || parts.is_empty() {
            let sign = if self.micros < 0 { "-" } else { "" };
            let micros = self.micros.unsigned_abs();
            let secs = micros / MICROS_PER_SECOND as u64;
            let frac = micros % MICROS_PER_SECOND as u64;
            let mut time = format!(
                "{sign}{:02}:{:02}:{:02}",
                secs / 3600,
                (secs / 60) % 60,
                secs % 60
            );
            if frac != 0 {
                time.push_str(&format!(".{frac:06}"));
            }
            parts.push(time);
        }
        f.write_str(&parts.join(" "))
    }
}
