use std::borrow::{Borrow, Cow};
use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use udf_data::{
    temporal, DateOffset, DateTimePattern, ScalarValue, DEFAULT_DATE_PATTERN,
    DEFAULT_TIMESTAMP_PATTERN,
};
use udf_errors::{malformed_pattern_err, type_mismatch_err, UdfResult};

use crate::{BuiltinFunction, EvaluationContext};

/// Replace every match of the regular expression `pattern` in `haystack`. `$n` and `${name}` in
/// `replacement` refer to capture groups.
fn regex_replace(haystack: &str, pattern: &str, replacement: &str) -> UdfResult<String> {
    let re = Regex::new(pattern).map_err(|e| malformed_pattern_err(pattern, e))?;
    Ok(re.replace_all(haystack, replacement).into_owned())
}

/// Render the statement time with `pattern`, optionally shifted by `days` calendar days.
///
/// When shifting, the current time is first truncated to whatever `pattern` keeps of it: the
/// formatted text is parsed back as a date, the days are added to that date, and the result is
/// rendered again.
fn sysdate(
    ctx: &EvaluationContext,
    pattern: &DateTimePattern,
    days: Option<i64>,
) -> UdfResult<String> {
    let now = ctx.civil_now();
    let Some(days) = days else {
        return Ok(pattern.format(&now));
    };

    let today = if pattern.has_date_fields() {
        pattern.parse_date(&pattern.format(&now))?
    } else {
        now.date()
    };
    let shifted = DateOffset::new(today, days).resolve()?;
    Ok(pattern.format(&shifted.and_time(NaiveTime::default())))
}

/// Read a civil date from text written either as a timestamp (which is shifted into the session
/// timezone) or as a plain date
fn civil_date_from_text(ctx: &EvaluationContext, text: &str) -> UdfResult<NaiveDate> {
    if let Ok(ts) = DateTimePattern::compile(DEFAULT_TIMESTAMP_PATTERN)?.parse_datetime(text) {
        return Ok(ctx.timezone().to_civil(&ts).date());
    }
    DateTimePattern::compile(DEFAULT_DATE_PATTERN)?.parse_date(text)
}

impl BuiltinFunction {
    pub(crate) fn eval<D>(&self, ctx: &EvaluationContext, record: &[D]) -> UdfResult<ScalarValue>
    where
        D: Borrow<ScalarValue>,
    {
        match self {
            BuiltinFunction::Nvl(expr, default) => {
                let val = expr.eval(ctx, record)?;
                if val.is_null() {
                    default.eval(ctx, record)
                } else {
                    Ok(val)
                }
            }
            BuiltinFunction::Nvl2(args) => {
                let discriminator = args.first().eval(ctx, record)?;
                let candidates = &args[1..];
                match candidates.split_first() {
                    None => Ok(discriminator),
                    Some((value, _)) if !discriminator.is_null() => value.eval(ctx, record),
                    Some((_, fallbacks)) => {
                        for fallback in fallbacks {
                            let val = fallback.eval(ctx, record)?;
                            if !val.is_null() {
                                return Ok(val);
                            }
                        }
                        Ok(ScalarValue::Null)
                    }
                }
            }
            BuiltinFunction::Greatest(args) => {
                let mut greatest = args.first().eval(ctx, record)?;
                let rest = &args[1..];
                // A single argument is returned without being compared to anything
                if rest.is_empty() {
                    return Ok(greatest);
                }
                if greatest.is_null() {
                    return Ok(ScalarValue::Null);
                }

                for arg in rest {
                    let val = arg.eval(ctx, record)?;
                    if val.is_null() {
                        return Ok(ScalarValue::Null);
                    }
                    // Ties keep the earlier value, and NaN never compares greater
                    if val.compare(&greatest)? == Some(Ordering::Greater) {
                        greatest = val;
                    }
                }
                Ok(greatest)
            }
            BuiltinFunction::Replace {
                haystack,
                pattern,
                replacement,
            } => {
                let pattern = pattern.eval(ctx, record)?;
                if pattern.is_blank_or_null() {
                    return haystack.eval(ctx, record);
                }

                let haystack = haystack.eval(ctx, record)?;
                let replacement = replacement.eval(ctx, record)?;
                let haystack = <&str>::try_from(non_null!(haystack))?;
                let replacement = <&str>::try_from(non_null!(replacement))?;
                let pattern = <&str>::try_from(&pattern)?;

                Ok(regex_replace(haystack, pattern, replacement)?.into())
            }
            BuiltinFunction::SysDate { pattern, days } => {
                let pattern = match pattern {
                    Some(pattern) => {
                        let pattern = pattern.eval(ctx, record)?;
                        Cow::Owned(DateTimePattern::compile(<&str>::try_from(non_null!(
                            pattern
                        ))?)?)
                    }
                    None => Cow::Borrowed(ctx.default_pattern()),
                };
                let days = match days {
                    Some(days) => {
                        let days = days.eval(ctx, record)?;
                        Some(i64::try_from(non_null!(days))?)
                    }
                    None => None,
                };

                Ok(sysdate(ctx, &pattern, days)?.into())
            }
            BuiltinFunction::LastDay(expr) => {
                let val = expr.eval(ctx, record)?;
                if val.is_blank_or_null() {
                    return Ok(ScalarValue::Null);
                }

                let date = match &val {
                    ScalarValue::Date(date) => *date,
                    ScalarValue::Timestamp(ts) => ctx.timezone().to_civil(ts).date(),
                    ScalarValue::Text(text) => civil_date_from_text(ctx, text.trim())?,
                    _ => return Err(type_mismatch_err("last_day", "date", val.scalar_type())),
                };
                Ok(temporal::last_day(date)?.into())
            }
            BuiltinFunction::Pow(base, exponent) => {
                let base = base.eval(ctx, record)?;
                let exponent = exponent.eval(ctx, record)?;
                let base = f64::try_from(non_null!(base))?;
                let exponent = f64::try_from(non_null!(exponent))?;
                Ok(base.powf(exponent).into())
            }
        }
    }
}
