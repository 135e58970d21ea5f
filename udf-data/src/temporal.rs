//! Calendar arithmetic on civil dates

use chrono::{Datelike, NaiveDate};
use udf_errors::{UdfError, UdfResult};

use crate::Interval;

/// A date shifted by a signed number of days, resolved lazily.
///
/// Day counts are carried as `i64` so that a caller-supplied `int8` can be passed through as-is;
/// [`DateOffset::resolve`] fails with [`UdfError::DateOutOfRange`] if the shift doesn't fit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateOffset {
    base: NaiveDate,
    days: i64,
}

impl DateOffset {
    pub fn new(base: NaiveDate, days: i64) -> Self {
        Self { base, days }
    }

    pub fn resolve(&self) -> UdfResult<NaiveDate> {
        Interval::try_from_days(self.days)?.add_to_date(self.base)
    }
}

/// The last day of the given month of the given year.
pub fn last_day_of_month(year: i32, month: u32) -> UdfResult<NaiveDate> {
    let out_of_range = || UdfError::DateOutOfRange(format!("{year}-{month:02}"));
    if !(1..=12).contains(&month) {
        return Err(out_of_range());
    }
    if month == 12 {
        return NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(out_of_range);
    }

    NaiveDate::from_ymd_opt(year, month + 1, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .ok_or_else(out_of_range)
}

/// The last day of the month containing `date`.
pub fn last_day(date: NaiveDate) -> UdfResult<NaiveDate> {
    last_day_of_month(date.year(), date.month())
}
