//! Datetime patterns in the style of PostgreSQL's `to_char` / `to_date`.
//!
//! | Token  | Meaning                                    |
//! |--------|--------------------------------------------|
//! | `YYYY` | Year, four digits                          |
//! | `YY`   | Last two digits of the year                |
//! | `MM`   | Month number (01..12)                      |
//! | `MONTH`| Full month name                            |
//! | `MON`  | Abbreviated month name                     |
//! | `DD`   | Day of month (01..31)                      |
//! | `DDD`  | Day of year (001..366)                     |
//! | `D`    | Day of week, Sunday = 1 (1..7)             |
//! | `DAY`  | Full day name                              |
//! | `DY`   | Abbreviated day name                       |
//! | `HH24` | Hour of day (00..23)                       |
//! | `HH12`, `HH` | Hour of day (01..12)                 |
//! | `MI`   | Minute (00..59)                            |
//! | `SS`   | Second (00..59)                            |
//! | `MS`   | Millisecond (000..999)                     |
//! | `US`   | Microsecond (000000..999999)               |
//! | `AM`, `PM` | Meridiem indicator                     |
//!
//! Numeric tokens are matched case-insensitively, so `yyyy-MM-dd` means the same as
//! `YYYY-MM-DD`. Name tokens take their capitalisation from the pattern: `MONTH` renders
//! `MARCH`, `Month` renders `March` and `month` renders `march`. Text inside double quotes is
//! copied verbatim, as is any character that doesn't start a token.

use std::fmt::Write;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use udf_errors::{malformed_pattern_err, UdfError, UdfResult};

/// The pattern used when rendering a timestamp and no pattern was given.
pub const DEFAULT_TIMESTAMP_PATTERN: &str = "YYYY-MM-DD HH24:MI:SS";

/// The pattern used when rendering a date and no pattern was given.
pub const DEFAULT_DATE_PATTERN: &str = "YYYY-MM-DD";

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Keywords, longest first wherever one is a prefix of another.
const KEYWORDS: [(&str, Field); 19] = [
    ("HH24", Field::Hour24),
    ("HH12", Field::Hour12),
    ("HH", Field::Hour12),
    ("YYYY", Field::Year4),
    ("YY", Field::Year2),
    ("MONTH", Field::MonthName),
    ("MON", Field::MonthAbbrev),
    ("MM", Field::Month),
    ("MI", Field::Minute),
    ("MS", Field::Millis),
    ("DDD", Field::DayOfYear),
    ("DAY", Field::DayName),
    ("DY", Field::DayAbbrev),
    ("DD", Field::Day),
    ("D", Field::DayOfWeek),
    ("SS", Field::Second),
    ("US", Field::Micros),
    ("AM", Field::Meridiem),
    ("PM", Field::Meridiem),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    Year4,
    Year2,
    Month,
    MonthName,
    MonthAbbrev,
    Day,
    DayOfYear,
    DayOfWeek,
    DayName,
    DayAbbrev,
    Hour24,
    Hour12,
    Minute,
    Second,
    Millis,
    Micros,
    Meridiem,
}

impl Field {
    /// Maximum number of digits read when parsing a numeric field
    fn width(self) -> Option<usize> {
        match self {
            Field::Year4 => Some(4),
            Field::DayOfYear | Field::Millis => Some(3),
            Field::DayOfWeek => Some(1),
            Field::Micros => Some(6),
            Field::Year2
            | Field::Month
            | Field::Day
            | Field::Hour24
            | Field::Hour12
            | Field::Minute
            | Field::Second => Some(2),
            Field::MonthName
            | Field::MonthAbbrev
            | Field::DayName
            | Field::DayAbbrev
            | Field::Meridiem => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Case {
    Upper,
    Capitalized,
    Lower,
}

impl Case {
    fn of(keyword: &str) -> Self {
        let mut chars = keyword.chars();
        match chars.next() {
            Some(c) if c.is_ascii_lowercase() => Case::Lower,
            _ if chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) => Case::Upper,
            _ => Case::Capitalized,
        }
    }

    fn apply(self, name: &str, out: &mut String) {
        match self {
            Case::Upper => out.push_str(&name.to_ascii_uppercase()),
            Case::Lower => out.push_str(&name.to_ascii_lowercase()),
            Case::Capitalized => out.push_str(name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Literal(String),
    Field(Field, Case),
}

/// A compiled datetime pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DateTimePattern {
    source: String,
    tokens: Vec<Token>,
}

/// [`DEFAULT_TIMESTAMP_PATTERN`], tokenized
impl Default for DateTimePattern {
    fn default() -> Self {
        let literal = |s: &str| Token::Literal(s.to_owned());
        let field = |field| Token::Field(field, Case::Upper);
        Self {
            source: DEFAULT_TIMESTAMP_PATTERN.to_owned(),
            tokens: vec![
                field(Field::Year4),
                literal("-"),
                field(Field::Month),
                literal("-"),
                field(Field::Day),
                literal(" "),
                field(Field::Hour24),
                literal(":"),
                field(Field::Minute),
                literal(":"),
                field(Field::Second),
            ],
        }
    }
}

impl DateTimePattern {
    /// Tokenize `pattern`. Fails with [`UdfError::MalformedPattern`] if a double quote is left
    /// unterminated.
    pub fn compile(pattern: &str) -> UdfResult<Self> {
        let mut tokens: Vec<Token> = Vec::new();
        let push_literal = |tokens: &mut Vec<Token>, s: &str| match tokens.last_mut() {
            Some(Token::Literal(lit)) => lit.push_str(s),
            _ => tokens.push(Token::Literal(s.to_owned())),
        };

        let mut rest = pattern;
        'outer: while let Some(c) = rest.chars().next() {
            if c == '"' {
                let Some(end) = rest[1..].find('"') else {
                    return Err(malformed_pattern_err(pattern, "unterminated quoted text"));
                };
                push_literal(&mut tokens, &rest[1..=end]);
                rest = &rest[end + 2..];
                continue;
            }

            for (keyword, field) in KEYWORDS {
                if let Some(matched) = rest
                    .get(..keyword.len())
                    .filter(|prefix| prefix.eq_ignore_ascii_case(keyword))
                {
                    tokens.push(Token::Field(field, Case::of(matched)));
                    rest = &rest[keyword.len()..];
                    continue 'outer;
                }
            }

            push_literal(&mut tokens, &rest[..c.len_utf8()]);
            rest = &rest[c.len_utf8()..];
        }

        Ok(Self {
            source: pattern.to_owned(),
            tokens,
        })
    }

    /// The pattern this was compiled from
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns `true` if the pattern contains a field that carries date information.
    pub fn has_date_fields(&self) -> bool {
        self.tokens.iter().any(|t| {
            matches!(
                t,
                Token::Field(
                    Field::Year4
                        | Field::Year2
                        | Field::Month
                        | Field::MonthName
                        | Field::MonthAbbrev
                        | Field::Day
                        | Field::DayOfYear,
                    _
                )
            )
        })
    }

    /// Render `time` according to this pattern.
    pub fn format<T>(&self, time: &T) -> String
    where
        T: Datelike + Timelike,
    {
        let mut res = String::with_capacity(self.source.len().next_power_of_two());
        for token in &self.tokens {
            let (field, case) = match token {
                Token::Literal(lit) => {
                    res.push_str(lit);
                    continue;
                }
                Token::Field(field, case) => (*field, *case),
            };

            // Writing to a `String` can't fail
            let _ = match field {
                Field::Year4 => write!(res, "{:04}", time.year()),
                Field::Year2 => write!(res, "{:02}", time.year().rem_euclid(100)),
                Field::Month => write!(res, "{:02}", time.month()),
                Field::MonthName => {
                    case.apply(MONTH_NAMES[time.month0() as usize], &mut res);
                    Ok(())
                }
                Field::MonthAbbrev => {
                    case.apply(&MONTH_NAMES[time.month0() as usize][..3], &mut res);
                    Ok(())
                }
                Field::Day => write!(res, "{:02}", time.day()),
                Field::DayOfYear => write!(res, "{:03}", time.ordinal()),
                Field::DayOfWeek => write!(res, "{}", time.weekday().number_from_sunday()),
                Field::DayName => {
                    case.apply(day_name(time.weekday()), &mut res);
                    Ok(())
                }
                Field::DayAbbrev => {
                    case.apply(&day_name(time.weekday())[..3], &mut res);
                    Ok(())
                }
                Field::Hour24 => write!(res, "{:02}", time.hour()),
                Field::Hour12 => write!(res, "{:02}", time.hour12().1),
                Field::Minute => write!(res, "{:02}", time.minute()),
                Field::Second => write!(res, "{:02}", time.second()),
                Field::Millis => write!(res, "{:03}", (time.nanosecond() % 1_000_000_000) / 1_000_000),
                Field::Micros => write!(res, "{:06}", (time.nanosecond() % 1_000_000_000) / 1_000),
                Field::Meridiem => {
                    let pm = time.hour12().0;
                    case.apply(if pm { "PM" } else { "AM" }, &mut res);
                    Ok(())
                }
            };
        }
        res
    }

    /// Parse `value` as a date-time according to this pattern.
    ///
    /// Fields missing from the pattern default to year 1, January, day 1, midnight. Whitespace in
    /// the pattern matches any run of whitespace (including none) in the input.
    pub fn parse_datetime(&self, value: &str) -> UdfResult<NaiveDateTime> {
        let invalid = || UdfError::InvalidDateTime {
            value: value.to_owned(),
            pattern: self.source.clone(),
        };

        let mut parsed = ParsedFields::default();
        let mut input = value;
        for token in &self.tokens {
            match token {
                Token::Literal(lit) => input = skip_literal(input, lit).ok_or_else(invalid)?,
                Token::Field(field, _) => {
                    input = parsed.read(*field, input).ok_or_else(invalid)?;
                }
            }
        }
        if !input.trim().is_empty() {
            return Err(invalid());
        }

        parsed.resolve().ok_or_else(invalid)
    }

    /// Parse `value` as a date according to this pattern, discarding any time-of-day fields.
    pub fn parse_date(&self, value: &str) -> UdfResult<NaiveDate> {
        Ok(self.parse_datetime(value)?.date())
    }
}

fn day_name(weekday: Weekday) -> &'static str {
    DAY_NAMES[weekday.num_days_from_sunday() as usize]
}

/// Consume `lit` from the front of `input`
fn skip_literal<'a>(mut input: &'a str, lit: &str) -> Option<&'a str> {
    for c in lit.chars() {
        if c.is_whitespace() {
            input = input.trim_start();
        } else {
            input = input.strip_prefix(c)?;
        }
    }
    Some(input)
}

/// Read up to `width` ASCII digits from the front of `input`
fn read_number(input: &str, width: usize) -> Option<(u32, &str)> {
    let len = input
        .bytes()
        .take(width)
        .take_while(u8::is_ascii_digit)
        .count();
    if len == 0 {
        return None;
    }
    let n = input[..len].parse().ok()?;
    Some((n, &input[len..]))
}

/// Find which of `names` (or their three-letter abbreviation) `input` starts with, ignoring case
fn read_name<'a>(input: &'a str, names: &[&str], abbreviated: bool) -> Option<(usize, &'a str)> {
    names.iter().enumerate().find_map(|(i, name)| {
        let name = if abbreviated { &name[..3] } else { name };
        input
            .get(..name.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(name))
            .map(|_| (i, &input[name.len()..]))
    })
}

#[derive(Default, Debug)]
struct ParsedFields {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    day_of_year: Option<u32>,
    hour24: Option<u32>,
    hour12: Option<u32>,
    pm: Option<bool>,
    minute: Option<u32>,
    second: Option<u32>,
    micros: Option<u32>,
}

impl ParsedFields {
    /// Read one field from the front of `input`, returning the rest of the input.
    fn read<'a>(&mut self, field: Field, input: &'a str) -> Option<&'a str> {
        if let Some(width) = field.width() {
            let (n, rest) = read_number(input, width)?;
            match field {
                Field::Year4 => self.year = Some(n as i32),
                // Two-digit years land on the nearest year to 2020
                Field::Year2 => self.year = Some((if n < 70 { 2000 } else { 1900 }) + n as i32),
                Field::Month => self.month = Some(n),
                Field::Day => self.day = Some(n),
                Field::DayOfYear => self.day_of_year = Some(n),
                Field::DayOfWeek => {}
                Field::Hour24 => self.hour24 = Some(n),
                Field::Hour12 => self.hour12 = Some(n),
                Field::Minute => self.minute = Some(n),
                Field::Second => self.second = Some(n),
                Field::Millis => self.micros = Some(n * 1_000),
                Field::Micros => self.micros = Some(n),
                _ => return None,
            }
            return Some(rest);
        }

        match field {
            Field::MonthName | Field::MonthAbbrev => {
                let (month0, rest) =
                    read_name(input, &MONTH_NAMES, field == Field::MonthAbbrev)?;
                self.month = Some(month0 as u32 + 1);
                Some(rest)
            }
            Field::DayName | Field::DayAbbrev => {
                let (_, rest) = read_name(input, &DAY_NAMES, field == Field::DayAbbrev)?;
                Some(rest)
            }
            Field::Meridiem => {
                let (idx, rest) = read_name(input, &["AM", "PM"], false)?;
                self.pm = Some(idx == 1);
                Some(rest)
            }
            _ => None,
        }
    }

    fn resolve(&self) -> Option<NaiveDateTime> {
        let year = self.year.unwrap_or(1);
        let date = match (self.day_of_year, self.month, self.day) {
            (Some(doy), None, None) => NaiveDate::from_yo_opt(year, doy)?,
            _ => NaiveDate::from_ymd_opt(year, self.month.unwrap_or(1), self.day.unwrap_or(1))?,
        };

        let hour = match (self.hour24, self.hour12) {
            (Some(h), _) => h,
            (None, Some(h)) if (1..=12).contains(&h) => {
                h % 12 + if self.pm.unwrap_or(false) { 12 } else { 0 }
            }
            (None, Some(_)) => return None,
            (None, None) => {
                if self.pm.unwrap_or(false) {
                    12
                } else {
                    0
                }
            }
        };

        let time = NaiveTime::from_hms_micro_opt(
            hour,
            self.minute.unwrap_or(0),
            self.second.unwrap_or(0),
            self.micros.unwrap_or(0),
        )?;
        Some(date.and_time(time))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_strategy::proptest;

    use super::*;
    use crate::arbitrary::{arbitrary_naive_date, arbitrary_naive_date_time};

    fn ts(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn format(pattern: &str, time: &NaiveDateTime) -> String {
        DateTimePattern::compile(pattern).unwrap().format(time)
    }

    #[test]
    fn default_pattern() {
        assert_eq!(
            format(DEFAULT_TIMESTAMP_PATTERN, &ts(2016, 4, 1, 9, 5, 7)),
            "2016-04-01 09:05:07"
        );
    }

    #[test]
    fn lowercase_numeric_tokens() {
        let t = ts(2016, 4, 1, 13, 5, 7);
        assert_eq!(format("yyyy-MM-dd", &t), "2016-04-01");
        assert_eq!(format("yyyyMMdd", &t), "20160401");
        assert_eq!(format("YYYY-MM-DD HH24:MI", &t), "2016-04-01 13:05");
    }

    #[test]
    fn twelve_hour_clock() {
        assert_eq!(format("HH12:MI AM", &ts(2016, 4, 1, 13, 5, 7)), "01:05 PM");
        assert_eq!(format("HH:MI am", &ts(2016, 4, 1, 0, 5, 7)), "12:05 am");
    }

    #[test]
    fn names_follow_pattern_case() {
        let t = ts(2016, 3, 29, 0, 0, 0);
        assert_eq!(format("MONTH", &t), "MARCH");
        assert_eq!(format("Month", &t), "March");
        assert_eq!(format("month", &t), "march");
        assert_eq!(format("Mon", &t), "Mar");
        assert_eq!(format("Day, Dy", &t), "Tuesday, Tue");
        assert_eq!(format("D DDD", &t), "3 089");
    }

    #[test]
    fn quoted_text_is_literal() {
        let t = ts(2016, 3, 29, 0, 0, 0);
        assert_eq!(format("\"Day\" DD", &t), "Day 29");
        assert_eq!(format("YYYY\"\"MM", &t), "201603");
    }

    #[test]
    fn non_ascii_literals() {
        let t = ts(2016, 3, 29, 0, 0, 0);
        assert_eq!(format("YYYY년 MM월 DD일", &t), "2016년 03월 29일");
    }

    #[test]
    fn fractional_seconds() {
        let t = NaiveDate::from_ymd_opt(2016, 3, 29)
            .unwrap()
            .and_hms_micro_opt(1, 2, 3, 456_789)
            .unwrap();
        assert_eq!(format("SS.MS", &t), "03.456");
        assert_eq!(format("SS.US", &t), "03.456789");
    }

    #[test]
    fn unterminated_quote_is_malformed() {
        let err = DateTimePattern::compile("YYYY \"oops").unwrap_err();
        assert!(err.is_malformed_pattern());
    }

    #[test]
    fn parse_date_with_pattern() {
        let pattern = DateTimePattern::compile("yyyyMMdd").unwrap();
        assert_eq!(
            pattern.parse_date("20160401").unwrap(),
            NaiveDate::from_ymd_opt(2016, 4, 1).unwrap()
        );
    }

    #[test]
    fn parse_datetime_with_meridiem() {
        let pattern = DateTimePattern::compile("YYYY-MM-DD HH12:MI:SS PM").unwrap();
        assert_eq!(
            pattern.parse_datetime("2016-04-01 01:05:07 PM").unwrap(),
            ts(2016, 4, 1, 13, 5, 7)
        );
        assert_eq!(
            pattern.parse_datetime("2016-04-01 12:05:07 am").unwrap(),
            ts(2016, 4, 1, 0, 5, 7)
        );
    }

    #[test]
    fn parse_month_names() {
        let pattern = DateTimePattern::compile("DD Mon YYYY").unwrap();
        assert_eq!(
            pattern.parse_date("29 mar 2016").unwrap(),
            NaiveDate::from_ymd_opt(2016, 3, 29).unwrap()
        );
    }

    #[test]
    fn parse_defaults_missing_fields() {
        let pattern = DateTimePattern::compile("YYYY-MM").unwrap();
        assert_eq!(
            pattern.parse_datetime("2016-02").unwrap(),
            ts(2016, 2, 1, 0, 0, 0)
        );
        assert!(!DateTimePattern::compile("HH24:MI").unwrap().has_date_fields());
        assert!(pattern.has_date_fields());
    }

    #[test]
    fn parse_rejects_mismatches() {
        let pattern = DateTimePattern::compile(DEFAULT_DATE_PATTERN).unwrap();
        for value in ["2016/04/01", "2016-13-01", "2016-02-30", "2016-04-01x", "", "abcd-01-01"] {
            assert!(
                matches!(
                    pattern.parse_date(value),
                    Err(UdfError::InvalidDateTime { .. })
                ),
                "{value}"
            );
        }
    }

    #[test]
    fn default_is_the_default_timestamp_pattern() {
        assert_eq!(
            DateTimePattern::default(),
            DateTimePattern::compile(DEFAULT_TIMESTAMP_PATTERN).unwrap()
        );
    }

    #[test]
    fn leap_year_end_round_trip() {
        let pattern = DateTimePattern::compile(DEFAULT_DATE_PATTERN).unwrap();
        let date = NaiveDate::from_yo_opt(2016, 366).unwrap();
        let formatted = pattern.format(&date.and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(formatted, "2016-12-31");
        assert_eq!(pattern.parse_date(&formatted).unwrap(), date);
    }

    #[proptest]
    fn date_round_trip(#[strategy(arbitrary_naive_date())] date: NaiveDate) {
        let pattern = DateTimePattern::compile(DEFAULT_DATE_PATTERN).unwrap();
        let formatted = pattern.format(&date.and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(pattern.parse_date(&formatted).unwrap(), date);
    }

    #[proptest]
    fn timestamp_round_trip(#[strategy(arbitrary_naive_date_time())] datetime: NaiveDateTime) {
        let pattern = DateTimePattern::compile("YYYY-MM-DD HH24:MI:SS.US").unwrap();
        let formatted = pattern.format(&datetime);
        assert_eq!(pattern.parse_datetime(&formatted).unwrap(), datetime);
    }
}
