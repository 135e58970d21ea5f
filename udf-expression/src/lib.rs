//! Built-in SQL scalar functions: `nvl`, `nvl2`, `greatest`, `replace`, `sysdate`/`curdate`,
//! `last_day` and `pow`.
//!
//! A call site is first *lowered* from a function name and a list of typed argument expressions
//! into an [`Expr::Call`] (see [`BuiltinFunction::from_name_and_args`]), resolving which of the
//! function's registered [`FunctionSignature`]s applies. The lowered expression is then evaluated
//! once per row against an [`EvaluationContext`], which carries the session timezone, the default
//! datetime pattern and the statement clock.
//!
//! Hosts which already have argument values in hand rather than expressions can use the
//! [`ScalarFunction`] / [`BoundFunction`] pair instead.

use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use udf_data::{ScalarType, ScalarValue};
use vec1::Vec1;

mod context;
mod eval;
mod function;
mod lower;
mod signature;
pub mod utils;

pub use crate::context::{Clock, EvaluationContext, FixedClock, SessionOptions, SystemClock};
pub use crate::function::{BoundFunction, ScalarFunction};
pub use crate::signature::{registry, FunctionRegistry, FunctionSignature, Volatility};

/// Functions which can be called from an [`Expr::Call`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum BuiltinFunction {
    /// [`nvl(expr, default)`](https://docs.oracle.com/cd/B19306_01/server.102/b14200/functions105.htm)
    Nvl(Expr, Expr),
    /// `nvl2(expr, value, fallback...)`
    ///
    /// Returns `value` if `expr` is non-NULL, otherwise the first non-NULL fallback.
    Nvl2(Vec1<Expr>),
    /// `greatest(expr...)`
    Greatest(Vec1<Expr>),
    /// `replace(haystack, pattern, replacement)`, where `pattern` is a regular expression
    ///
    /// `$n` and `$name` in `replacement` expand to capture groups. A group reference takes the
    /// longest run of letters, digits and underscores after the `$`, so `$1a` names a group `1a`
    /// (which expands to nothing unless it exists); write `${1}a` for group 1 followed by `a`.
    Replace {
        haystack: Expr,
        pattern: Expr,
        replacement: Expr,
    },
    /// `sysdate([pattern [, days]])`
    SysDate {
        /// Falls back to the session's default pattern if not given
        pattern: Option<Expr>,
        days: Option<Expr>,
    },
    /// `last_day(expr)`
    LastDay(Expr),
    /// `pow(base, exponent)`
    Pow(Expr, Expr),
}

impl BuiltinFunction {
    pub fn name(&self) -> &'static str {
        use BuiltinFunction::*;
        match self {
            Nvl { .. } => "nvl",
            Nvl2 { .. } => "nvl2",
            Greatest { .. } => "greatest",
            Replace { .. } => "replace",
            SysDate { .. } => "sysdate",
            LastDay { .. } => "last_day",
            Pow { .. } => "pow",
        }
    }

    /// The argument expressions of this call, in order
    pub fn arguments(&self) -> Vec<&Expr> {
        use BuiltinFunction::*;
        match self {
            Nvl(expr, default) => vec![expr, default],
            Nvl2(args) | Greatest(args) => args.iter().collect(),
            Replace {
                haystack,
                pattern,
                replacement,
            } => vec![haystack, pattern, replacement],
            SysDate { pattern, days } => pattern.iter().chain(days.iter()).collect(),
            LastDay(expr) => vec![expr],
            Pow(base, exponent) => vec![base, exponent],
        }
    }
}

impl fmt::Display for BuiltinFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.arguments().iter().join(", "))
    }
}

/// Expressions that can be evaluated once per row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Expr {
    /// A reference to a column, by index, in the record the expression is evaluated against
    Column { index: usize, ty: ScalarType },

    /// A literal value
    Literal { val: ScalarValue, ty: ScalarType },

    /// Lossless widening of the result of `expr` to `ty`. Inserted by signature resolution.
    Cast { expr: Box<Expr>, ty: ScalarType },

    /// A call to a built-in function
    Call {
        func: Box<BuiltinFunction>,
        ty: ScalarType,
    },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Expr::*;

        match self {
            Column { index, .. } => write!(f, "${}", index),
            Literal { val, .. } => match val {
                ScalarValue::Text(_)
                | ScalarValue::Date(_)
                | ScalarValue::Time(_)
                | ScalarValue::Timestamp(_)
                | ScalarValue::Interval(_) => {
                    write!(f, "'{}'", val.to_string().replace('\'', "''"))
                }
                _ => write!(f, "{}", val),
            },
            Cast { expr, ty } => write!(f, "cast({} as {})", expr, ty),
            Call { func, .. } => write!(f, "{}", func),
        }
    }
}

impl Expr {
    /// The type of the value this expression evaluates to
    pub fn ty(&self) -> ScalarType {
        match self {
            Expr::Column { ty, .. }
            | Expr::Literal { ty, .. }
            | Expr::Cast { ty, .. }
            | Expr::Call { ty, .. } => *ty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{make_column, make_literal};

    #[test]
    fn display_call() {
        let func = BuiltinFunction::Replace {
            haystack: make_column(0, ScalarType::Text),
            pattern: make_literal("it's".into()),
            replacement: make_literal(ScalarValue::Null),
        };
        assert_eq!(func.to_string(), "replace($0, 'it''s', NULL)");
    }

    #[test]
    fn display_cast_and_sysdate() {
        let cast = Expr::Cast {
            expr: Box::new(make_column(1, ScalarType::Int)),
            ty: ScalarType::BigInt,
        };
        assert_eq!(cast.to_string(), "cast($1 as int8)");

        let sysdate = BuiltinFunction::SysDate {
            pattern: None,
            days: None,
        };
        assert_eq!(sysdate.to_string(), "sysdate()");
    }
}
