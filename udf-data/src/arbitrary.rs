//! Utilities for generating arbitrary values with [`proptest`]

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use proptest::prelude::*;

/// Strategy to generate an arbitrary [`NaiveDate`] with a four-digit, positive year
pub fn arbitrary_naive_date() -> impl Strategy<Value = NaiveDate> {
    (1i32..=9999, 1u32..=366).prop_filter_map("invalid date", |(y, doy)| {
        NaiveDate::from_yo_opt(y, doy)
    })
}

/// Generate an arbitrary [`NaiveTime`] with microsecond precision
pub fn arbitrary_naive_time() -> impl Strategy<Value = NaiveTime> {
    (0u32..24, 0u32..60, 0u32..60, 0u32..1_000_000).prop_filter_map(
        "invalid time",
        |(hour, min, sec, micro)| NaiveTime::from_hms_micro_opt(hour, min, sec, micro),
    )
}

/// Strategy to generate an arbitrary [`NaiveDateTime`]
pub fn arbitrary_naive_date_time() -> impl Strategy<Value = NaiveDateTime> {
    (arbitrary_naive_date(), arbitrary_naive_time())
        .prop_map(|(date, time)| NaiveDateTime::new(date, time))
}
