use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use udf_errors::UdfError;

const SECONDS_PER_HOUR: i32 = 3600;

/// The timezone a session renders civil time in.
///
/// Resolved once, from a string, before any function is evaluated. Accepts IANA names (`GMT`,
/// `UTC`, `Asia/Seoul`, `Etc/GMT+6`) and fixed offsets written as `GMT+9`, `GMT-06:00`,
/// `UTC+05:30` or `+09:00`. Note that a fixed offset is read the intuitive way (`GMT-6` is six
/// hours *behind* GMT), unlike the POSIX-style `Etc/GMT-6` name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionTimezone {
    Named(Tz),
    Fixed(FixedOffset),
}

impl Default for SessionTimezone {
    fn default() -> Self {
        SessionTimezone::Named(Tz::GMT)
    }
}

impl SessionTimezone {
    /// Convert a UTC instant into civil (wall clock) time in this timezone.
    pub fn to_civil(&self, utc: &NaiveDateTime) -> NaiveDateTime {
        match self {
            SessionTimezone::Named(tz) => tz.from_utc_datetime(utc).naive_local(),
            SessionTimezone::Fixed(offset) => offset.from_utc_datetime(utc).naive_local(),
        }
    }

    /// Convert an instant into civil time in this timezone.
    pub fn civil_now(&self, now: &DateTime<Utc>) -> NaiveDateTime {
        self.to_civil(&now.naive_utc())
    }
}

/// Parse `[+-]H[H][[:]MM]`, returning an offset east of UTC in seconds.
fn parse_offset(s: &str) -> Option<i32> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    if !rest.is_ascii() {
        return None;
    }

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() > 2 => rest.split_at(rest.len() - 2),
        None => (rest, "0"),
    };
    if hours.is_empty()
        || hours.len() > 2
        || !hours.bytes().all(|b| b.is_ascii_digit())
        || !minutes.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 18 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * SECONDS_PER_HOUR + minutes * 60))
}

impl FromStr for SessionTimezone {
    type Err = UdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }

        if let Ok(tz) = Tz::from_str_insensitive(trimmed) {
            return Ok(SessionTimezone::Named(tz));
        }

        let offset = trimmed
            .get(..3)
            .filter(|prefix| prefix.eq_ignore_ascii_case("GMT") || prefix.eq_ignore_ascii_case("UTC"))
            .map_or(trimmed, |_| &trimmed[3..]);

        parse_offset(offset)
            .and_then(FixedOffset::east_opt)
            .map(SessionTimezone::Fixed)
            .ok_or_else(|| UdfError::InvalidTimezone(s.to_owned()))
    }
}

impl fmt::Display for SessionTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionTimezone::Named(tz) => f.write_str(tz.name()),
            SessionTimezone::Fixed(offset) => write!(f, "GMT{}", offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn empty_is_gmt() {
        assert_eq!(
            "".parse::<SessionTimezone>().unwrap(),
            SessionTimezone::Named(Tz::GMT)
        );
    }

    #[test]
    fn named_zones() {
        assert_eq!(
            "Asia/Seoul".parse::<SessionTimezone>().unwrap(),
            SessionTimezone::Named(Tz::Asia__Seoul)
        );
        assert_eq!(
            "utc".parse::<SessionTimezone>().unwrap(),
            SessionTimezone::Named(Tz::UTC)
        );
    }

    #[test]
    fn fixed_offsets() {
        let tz: SessionTimezone = "GMT-6".parse().unwrap();
        assert_eq!(
            tz,
            SessionTimezone::Fixed(FixedOffset::west_opt(6 * 3600).unwrap())
        );
        let tz: SessionTimezone = "UTC+05:30".parse().unwrap();
        assert_eq!(
            tz,
            SessionTimezone::Fixed(FixedOffset::east_opt(5 * 3600 + 1800).unwrap())
        );
        let tz: SessionTimezone = "+0930".parse().unwrap();
        assert_eq!(
            tz,
            SessionTimezone::Fixed(FixedOffset::east_opt(9 * 3600 + 1800).unwrap())
        );
    }

    #[test]
    fn invalid_zones() {
        for s in ["Mars/Olympus_Mons", "GMT+", "GMT+25", "+1:99", "GMT*3"] {
            assert_eq!(
                s.parse::<SessionTimezone>().unwrap_err(),
                UdfError::InvalidTimezone(s.to_owned()),
                "{s}"
            );
        }
    }

    #[test]
    fn civil_time_crosses_midnight() {
        let tz: SessionTimezone = "GMT-6".parse().unwrap();
        assert_eq!(tz.to_civil(&utc(2016, 3, 1, 3)), utc(2016, 2, 29, 21));

        let seoul: SessionTimezone = "Asia/Seoul".parse().unwrap();
        assert_eq!(seoul.to_civil(&utc(2016, 3, 31, 20)), utc(2016, 4, 1, 5));
    }

    #[test]
    fn dst_is_applied_for_named_zones() {
        let tz: SessionTimezone = "America/New_York".parse().unwrap();
        assert_eq!(tz.to_civil(&utc(2016, 1, 15, 12)), utc(2016, 1, 15, 7));
        assert_eq!(tz.to_civil(&utc(2016, 7, 15, 12)), utc(2016, 7, 15, 8));
    }
}
