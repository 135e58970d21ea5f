//! Error handling, definitions, and utilities for scalar function evaluation

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// General error type used by every scalar function crate.
///
/// NULL is never an error: each function documents how it treats NULL inputs, and no variant here
/// is produced just because an argument was NULL.
#[derive(Serialize, Deserialize, Error, Debug, Clone, PartialEq, Eq)]
pub enum UdfError {
    /// A function was called with a number of arguments that its resolved signature does not
    /// accept.
    #[error("{function}: expected {expected} arguments, got {got}")]
    ArityError {
        /// The name of the function.
        function: String,
        /// A description of the accepted arity (eg `2` or `at least 1`).
        expected: String,
        /// The number of arguments actually supplied.
        got: usize,
    },

    /// No registered signature accepts the given argument types.
    #[error("Function {name}({args}) does not exist")]
    NoSuchFunction {
        /// The name of the function, as called.
        name: String,
        /// The argument types, rendered as a comma separated list.
        args: String,
    },

    /// More than one registered signature matches the argument types equally well.
    #[error("Function {name}({args}) is ambiguous")]
    AmbiguousFunction {
        /// The name of the function, as called.
        name: String,
        /// The argument types, rendered as a comma separated list.
        args: String,
    },

    /// A value's type does not belong to the type family the function expects.
    #[error("{function}: expected a value of type {expected}, got {actual}")]
    TypeMismatch {
        /// The function (or operation) that rejected the value.
        function: String,
        /// The expected type.
        expected: String,
        /// The type actually received.
        actual: String,
    },

    /// A datetime pattern or regular expression could not be compiled.
    #[error("Malformed pattern '{pattern}': {reason}")]
    MalformedPattern {
        /// The pattern as supplied.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A text value did not match the datetime pattern it was parsed with.
    #[error("Value '{value}' does not match pattern '{pattern}'")]
    InvalidDateTime {
        /// The text being parsed.
        value: String,
        /// The pattern it was parsed with.
        pattern: String,
    },

    /// The session timezone could not be resolved.
    #[error("Invalid time zone '{0}'")]
    InvalidTimezone(String),

    /// Calendar arithmetic left the representable date range.
    #[error("Date out of range: {0}")]
    DateOutOfRange(String),

    /// A signature was registered that accepts exactly the same argument types as an existing
    /// signature for the same function.
    #[error("Duplicate signature for function {name}: {signature}")]
    DuplicateSignature {
        /// The function name.
        name: String,
        /// The rejected signature.
        signature: String,
    },

    /// An argument reference pointed past the end of the supplied arguments.
    #[error("Argument index {0} out of bounds")]
    InvalidColumnIndex(usize),

    /// An internal invariant has been violated.
    ///
    /// This is produced by the [`internal!`] and [`invariant!`] macros, as an alternative to
    /// panicking. It should **not** be used for errors we're expecting to be able to handle.
    #[error("Internal invariant violated: {0}")]
    Internal(String),
}

impl UdfError {
    /// Returns `true` if the error is a host-side resolution failure (the function body was never
    /// reached).
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::ArityError { .. } | Self::NoSuchFunction { .. } | Self::AmbiguousFunction { .. }
        )
    }

    /// Returns `true` if the error is a [`UdfError::TypeMismatch`].
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }

    /// Returns `true` if the error is a [`UdfError::MalformedPattern`].
    pub fn is_malformed_pattern(&self) -> bool {
        matches!(self, Self::MalformedPattern { .. })
    }
}

/// Result type used throughout the scalar function crates.
pub type UdfResult<T> = Result<T, UdfError>;

/// Make a new [`UdfError::Internal`] with the provided string-able argument.
pub fn internal_err<T: Into<String>>(err: T) -> UdfError {
    UdfError::Internal(err.into())
}

/// Make a new [`UdfError::TypeMismatch`].
pub fn type_mismatch_err<F, E, A>(function: F, expected: E, actual: A) -> UdfError
where
    F: Into<String>,
    E: ToString,
    A: ToString,
{
    UdfError::TypeMismatch {
        function: function.into(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

/// Make a new [`UdfError::MalformedPattern`].
pub fn malformed_pattern_err<P, R>(pattern: P, reason: R) -> UdfError
where
    P: Into<String>,
    R: ToString,
{
    UdfError::MalformedPattern {
        pattern: pattern.into(),
        reason: reason.to_string(),
    }
}

/// Renders information about the current source location *if* building in debug mode, for use in
/// error-generating macros
#[doc(hidden)]
#[macro_export]
macro_rules! __location_info {
    () => {
        $crate::__location_info!(" (in {})")
    };
    ($fstr: literal) => {
        if cfg!(debug_assertions) {
            format!(
                $fstr,
                format!("{}:{}:{}", std::file!(), std::line!(), std::column!(),)
            )
        } else {
            "".to_owned()
        }
    };
}

/// Build (but do not return) a [`UdfError::Internal`], with location info in debug builds.
#[macro_export]
macro_rules! internal_err {
    ($($tt:tt)*) => {
        $crate::internal_err(format!(
            "{}{}",
            $crate::__location_info!("in {}: "),
            format_args!($($tt)*)
        ))
    };
}

/// Return a [`UdfError::Internal`] from the current function.
///
/// Usage is like [`panic!`], in that you can pass a format string and arguments. When building in
/// debug mode, the returned error also captures file, line, and column information.
///
/// When called with no arguments, generates an internal error with the text
/// "entered unreachable code".
#[macro_export]
macro_rules! internal {
    () => {
        $crate::internal!("entered unreachable code")
    };
    ($($tt:tt)*) => {
        return Err($crate::internal_err!($($tt)*).into())
    };
}

/// Return a [`UdfError::Internal`] from the current function, if and only if the argument
/// evaluates to false.
///
/// This is intended to be used wherever [`assert!`] would otherwise be used.
#[macro_export]
macro_rules! invariant {
    ($expr:expr, $($tt:tt)*) => {
        if !$expr {
            $crate::internal!($($tt)*);
        }
    };
    ($expr:expr) => {
        if !$expr {
            $crate::internal!("assertion failed: {}", std::stringify!($expr));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checked_half(n: i64) -> UdfResult<i64> {
        invariant!(n % 2 == 0, "{} is odd", n);
        Ok(n / 2)
    }

    fn always_internal() -> UdfResult<()> {
        internal!()
    }

    #[test]
    fn invariant_passes_through() {
        assert_eq!(checked_half(8).unwrap(), 4);
    }

    #[test]
    fn invariant_reports_message() {
        let err = checked_half(3).unwrap_err();
        match err {
            UdfError::Internal(msg) => assert!(msg.ends_with("3 is odd"), "{msg}"),
            e => panic!("unexpected error {e:?}"),
        }
    }

    #[test]
    fn internal_without_arguments() {
        let err = always_internal().unwrap_err();
        assert!(err.to_string().contains("entered unreachable code"));
    }

    #[test]
    fn resolution_errors() {
        assert!(UdfError::ArityError {
            function: "nvl".into(),
            expected: "2".into(),
            got: 3
        }
        .is_resolution_error());
        assert!(!type_mismatch_err("greatest", "Int", "Text").is_resolution_error());
        assert!(type_mismatch_err("greatest", "Int", "Text").is_type_mismatch());
        assert!(malformed_pattern_err("(", "unclosed group").is_malformed_pattern());
    }

    #[test]
    fn display() {
        assert_eq!(
            UdfError::NoSuchFunction {
                name: "nvl".into(),
                args: "Int, Text".into()
            }
            .to_string(),
            "Function nvl(Int, Text) does not exist"
        );
    }
}
