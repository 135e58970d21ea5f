use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use enum_kinds::EnumKind;
use serde::{Deserialize, Serialize};
use udf_errors::{type_mismatch_err, UdfError, UdfResult};

pub mod arbitrary;
mod interval;
pub mod pattern;
pub mod temporal;
mod timezone;

pub use crate::interval::Interval;
pub use crate::pattern::{DateTimePattern, DEFAULT_DATE_PATTERN, DEFAULT_TIMESTAMP_PATTERN};
pub use crate::temporal::DateOffset;
pub use crate::timezone::SessionTimezone;

/// The format for dates when rendered as text
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The format for times when rendered as text
pub const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// The format for timestamps when rendered as text
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A nullable SQL scalar, as passed into and returned from scalar functions.
///
/// A value is either [`ScalarValue::Null`] or exactly one typed payload. Values are immutable;
/// cloning a [`ScalarValue::Text`] only bumps a reference count.
///
/// [`ScalarValue::Timestamp`] holds a UTC instant without an attached zone. Rendering it as civil
/// time goes through a [`SessionTimezone`].
#[derive(Clone, Debug, Serialize, Deserialize, EnumKind)]
#[enum_kind(ScalarType, derive(Hash, PartialOrd, Ord, Serialize, Deserialize))]
pub enum ScalarValue {
    /// SQL NULL. Distinct from every zero value.
    Null,
    /// `boolean`
    Bool(bool),
    /// `int4`
    Int(i32),
    /// `int8`
    BigInt(i64),
    /// `float8`
    Double(f64),
    /// `text`
    Text(Arc<str>),
    /// `date`
    Date(NaiveDate),
    /// `time` (without time zone)
    Time(NaiveTime),
    /// `timestamp`, as a UTC instant
    Timestamp(NaiveDateTime),
    /// `interval`
    Interval(Interval),
}

impl ScalarType {
    /// The SQL name of this type.
    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Null => "null",
            ScalarType::Bool => "boolean",
            ScalarType::Int => "int4",
            ScalarType::BigInt => "int8",
            ScalarType::Double => "float8",
            ScalarType::Text => "text",
            ScalarType::Date => "date",
            ScalarType::Time => "time",
            ScalarType::Timestamp => "timestamp",
            ScalarType::Interval => "interval",
        }
    }

    /// Returns `true` if values of this type can be implicitly and losslessly widened into values
    /// of `target` (`int4 -> int8 -> float8`).
    pub fn widens_to(self, target: ScalarType) -> bool {
        matches!(
            (self, target),
            (ScalarType::Int, ScalarType::BigInt)
                | (ScalarType::Int, ScalarType::Double)
                | (ScalarType::BigInt, ScalarType::Double)
        )
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Eq for ScalarValue {}

/// Values are equal only when they have the same type and the same payload. Unlike SQL `=`, NULL
/// equals NULL and NaN equals NaN, so that results can be asserted on directly.
impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        use ScalarValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (BigInt(a), BigInt(b)) => a == b,
            (Double(a), Double(b)) => a.total_cmp(b) == Ordering::Equal,
            (Text(a), Text(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Time(a), Time(b)) => a == b,
            (Timestamp(a), Timestamp(b)) => a == b,
            (Interval(a), Interval(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => f.write_str("NULL"),
            ScalarValue::Bool(b) => f.write_str(if *b { "t" } else { "f" }),
            ScalarValue::Int(n) => write!(f, "{}", n),
            ScalarValue::BigInt(n) => write!(f, "{}", n),
            // `{:?}` keeps the trailing `.0` on integral doubles
            ScalarValue::Double(n) => write!(f, "{:?}", n),
            ScalarValue::Text(t) => f.write_str(t),
            ScalarValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            ScalarValue::Time(t) => write!(f, "{}", t.format(TIME_FORMAT)),
            ScalarValue::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            ScalarValue::Interval(i) => write!(f, "{}", i),
        }
    }
}

impl ScalarValue {
    /// Checks if this value is [`ScalarValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Returns `None` for NULL, otherwise `Some(self)`.
    pub fn non_null(&self) -> Option<&Self> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }

    /// Returns `true` for NULL and for empty text.
    pub fn is_blank_or_null(&self) -> bool {
        match self {
            ScalarValue::Null => true,
            ScalarValue::Text(t) => t.is_empty(),
            _ => false,
        }
    }

    /// The type tag of this value. NULL has type [`ScalarType::Null`].
    pub fn scalar_type(&self) -> ScalarType {
        ScalarType::from(self)
    }

    /// Returns `true` if this value may be passed where a value of type `ty` is expected: it is
    /// either NULL or has exactly that type.
    pub fn conforms_to(&self, ty: ScalarType) -> bool {
        self.is_null() || self.scalar_type() == ty
    }

    /// Compare two values of the same type family.
    ///
    /// Returns `Ok(None)` if the values are unordered: either side is NULL, or a floating point
    /// comparison involves NaN. Values of different families fail with
    /// [`UdfError::TypeMismatch`] rather than being coerced. Numeric values of different widths
    /// are compared by magnitude.
    pub fn compare(&self, other: &Self) -> UdfResult<Option<Ordering>> {
        use ScalarValue::*;

        Ok(match (self, other) {
            (Null, _) | (_, Null) => None,
            (Bool(a), Bool(b)) => Some(a.cmp(b)),
            (Int(a), Int(b)) => Some(a.cmp(b)),
            (BigInt(a), BigInt(b)) => Some(a.cmp(b)),
            (Int(_) | BigInt(_), Int(_) | BigInt(_)) => {
                let a = i64::try_from(self)?;
                let b = i64::try_from(other)?;
                Some(a.cmp(&b))
            }
            (Double(_) | Int(_) | BigInt(_), Double(_) | Int(_) | BigInt(_)) => {
                let a = f64::try_from(self)?;
                let b = f64::try_from(other)?;
                a.partial_cmp(&b)
            }
            (Text(a), Text(b)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (Time(a), Time(b)) => Some(a.cmp(b)),
            (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            (Interval(a), Interval(b)) => Some(a.cmp(b)),
            _ => {
                return Err(type_mismatch_err(
                    "compare",
                    self.scalar_type(),
                    other.scalar_type(),
                ))
            }
        })
    }

    /// Attempt to coerce this value to a value of type `ty`.
    ///
    /// Only identity and lossless numeric widening (see [`ScalarType::widens_to`]) are supported;
    /// NULL coerces to every type. Anything else is a [`UdfError::TypeMismatch`].
    pub fn coerce_to(&self, ty: ScalarType) -> UdfResult<ScalarValue> {
        let from = self.scalar_type();
        if from == ty || from == ScalarType::Null {
            return Ok(self.clone());
        }

        match (self, ty) {
            (ScalarValue::Int(n), ScalarType::BigInt) => Ok(ScalarValue::BigInt(i64::from(*n))),
            (ScalarValue::Int(n), ScalarType::Double) => Ok(ScalarValue::Double(f64::from(*n))),
            (ScalarValue::BigInt(n), ScalarType::Double) => Ok(ScalarValue::Double(*n as f64)),
            _ => Err(type_mismatch_err("coerce", ty, from)),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Bool(b)
    }
}

impl From<i32> for ScalarValue {
    fn from(n: i32) -> Self {
        ScalarValue::Int(n)
    }
}

impl From<i64> for ScalarValue {
    fn from(n: i64) -> Self {
        ScalarValue::BigInt(n)
    }
}

impl From<f64> for ScalarValue {
    fn from(n: f64) -> Self {
        ScalarValue::Double(n)
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::Text(s.into())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::Text(s.into())
    }
}

impl From<NaiveDate> for ScalarValue {
    fn from(d: NaiveDate) -> Self {
        ScalarValue::Date(d)
    }
}

impl From<NaiveTime> for ScalarValue {
    fn from(t: NaiveTime) -> Self {
        ScalarValue::Time(t)
    }
}

impl From<NaiveDateTime> for ScalarValue {
    fn from(ts: NaiveDateTime) -> Self {
        ScalarValue::Timestamp(ts)
    }
}

impl From<Interval> for ScalarValue {
    fn from(i: Interval) -> Self {
        ScalarValue::Interval(i)
    }
}

impl<T> From<Option<T>> for ScalarValue
where
    ScalarValue: From<T>,
{
    fn from(opt: Option<T>) -> Self {
        opt.map_or(ScalarValue::Null, ScalarValue::from)
    }
}

fn conversion_err(data: &ScalarValue, target: &str) -> UdfError {
    type_mismatch_err("convert", target, data.scalar_type())
}

impl<'a> TryFrom<&'a ScalarValue> for &'a str {
    type Error = UdfError;

    fn try_from(data: &'a ScalarValue) -> Result<Self, Self::Error> {
        match data {
            ScalarValue::Text(t) => Ok(&**t),
            _ => Err(conversion_err(data, "text")),
        }
    }
}

impl TryFrom<&ScalarValue> for i64 {
    type Error = UdfError;

    fn try_from(data: &ScalarValue) -> Result<Self, Self::Error> {
        match *data {
            ScalarValue::Int(n) => Ok(i64::from(n)),
            ScalarValue::BigInt(n) => Ok(n),
            _ => Err(conversion_err(data, "int8")),
        }
    }
}

impl TryFrom<&ScalarValue> for f64 {
    type Error = UdfError;

    fn try_from(data: &ScalarValue) -> Result<Self, Self::Error> {
        match *data {
            ScalarValue::Int(n) => Ok(f64::from(n)),
            ScalarValue::BigInt(n) => Ok(n as f64),
            ScalarValue::Double(n) => Ok(n),
            _ => Err(conversion_err(data, "float8")),
        }
    }
}
