use udf_data::ScalarType;
use udf_errors::{internal, UdfError, UdfResult};
use vec1::Vec1;

use crate::signature::{registry, FunctionSignature};
use crate::{BuiltinFunction, Expr};

/// Wrap `expr` in a cast to `ty`, unless it already has that type
fn cast(expr: Expr, ty: ScalarType) -> Expr {
    if expr.ty() == ty {
        expr
    } else {
        Expr::Cast {
            expr: Box::new(expr),
            ty,
        }
    }
}

impl BuiltinFunction {
    /// Resolve a call to the function called `name` (case-insensitively) with the given arguments
    /// against the registered signatures, returning the lowered function along with the signature
    /// it was resolved to. Arguments are cast to the signature's parameter types where needed.
    pub(crate) fn resolve<A>(
        name: &str,
        args: A,
    ) -> UdfResult<(Self, &'static FunctionSignature)>
    where
        A: IntoIterator<Item = Expr>,
    {
        let args = args.into_iter().collect::<Vec<_>>();
        let arg_types = args.iter().map(Expr::ty).collect::<Vec<_>>();
        let signature = registry()?.resolve(name, &arg_types)?;

        let arity_error = || UdfError::ArityError {
            function: name.to_owned(),
            expected: signature.params().len().to_string(),
            got: arg_types.len(),
        };

        let mut args = args.into_iter().enumerate().map(|(idx, arg)| {
            match signature.param_type(idx) {
                Some(ty) => cast(arg, ty),
                None => arg,
            }
        });
        let mut next_arg = || args.next().ok_or_else(arity_error);

        let func = match signature.name() {
            "nvl" => Self::Nvl(next_arg()?, next_arg()?),
            "nvl2" => Self::Nvl2(Vec1::try_from_vec(args.collect()).map_err(|_| arity_error())?),
            "greatest" => {
                Self::Greatest(Vec1::try_from_vec(args.collect()).map_err(|_| arity_error())?)
            }
            "replace" => Self::Replace {
                haystack: next_arg()?,
                pattern: next_arg()?,
                replacement: next_arg()?,
            },
            "sysdate" => Self::SysDate {
                pattern: args.next(),
                days: args.next(),
            },
            "last_day" => Self::LastDay(next_arg()?),
            "pow" => Self::Pow(next_arg()?, next_arg()?),
            other => internal!("No lowering for registered function {}", other),
        };

        Ok((func, signature))
    }

    /// Lower a call to the function called `name` with the given arguments, returning the
    /// function along with the type of value it evaluates to.
    ///
    /// # Errors
    ///
    /// * [`UdfError::NoSuchFunction`] if there's no function called `name`, or no signature of it
    ///   accepts the argument types
    /// * [`UdfError::ArityError`] if no signature of it accepts that many arguments
    /// * [`UdfError::AmbiguousFunction`] if more than one signature matches equally well and none
    ///   of them is preferred
    pub fn from_name_and_args<A>(name: &str, args: A) -> UdfResult<(Self, ScalarType)>
    where
        A: IntoIterator<Item = Expr>,
    {
        let (func, signature) = Self::resolve(name, args)?;
        Ok((func, signature.return_type()))
    }
}

#[cfg(test)]
mod tests {
    use udf_data::ScalarValue;

    use super::*;
    use crate::utils::{make_column, make_literal};

    #[test]
    fn lower_nvl_casts_narrower_argument() {
        let (func, ty) = BuiltinFunction::from_name_and_args(
            "NVL",
            [make_column(0, ScalarType::Int), make_column(1, ScalarType::BigInt)],
        )
        .unwrap();
        assert_eq!(ty, ScalarType::BigInt);
        assert_eq!(
            func,
            BuiltinFunction::Nvl(
                Expr::Cast {
                    expr: Box::new(make_column(0, ScalarType::Int)),
                    ty: ScalarType::BigInt
                },
                make_column(1, ScalarType::BigInt)
            )
        );
    }

    #[test]
    fn lower_null_literal() {
        let (func, ty) = BuiltinFunction::from_name_and_args(
            "nvl",
            [make_literal(ScalarValue::Null), make_literal("x".into())],
        )
        .unwrap();
        assert_eq!(ty, ScalarType::Text);
        assert_eq!(func.to_string(), "nvl(cast(NULL as text), 'x')");
    }

    #[test]
    fn lower_sysdate_optional_arguments() {
        let (func, ty) = BuiltinFunction::from_name_and_args("curdate", []).unwrap();
        assert_eq!(ty, ScalarType::Text);
        assert_eq!(
            func,
            BuiltinFunction::SysDate {
                pattern: None,
                days: None
            }
        );

        let (func, _) = BuiltinFunction::from_name_and_args(
            "sysdate",
            [make_literal("YYYY".into()), make_literal(1i64.into())],
        )
        .unwrap();
        assert_eq!(func.to_string(), "sysdate('YYYY', 1)");
    }

    #[test]
    fn lower_variadic() {
        let (func, ty) = BuiltinFunction::from_name_and_args(
            "greatest",
            (0..4).map(|idx| make_column(idx, ScalarType::Time)),
        )
        .unwrap();
        assert_eq!(ty, ScalarType::Time);
        assert_eq!(func.to_string(), "greatest($0, $1, $2, $3)");
    }

    #[test]
    fn lower_unknown_function() {
        assert!(matches!(
            BuiltinFunction::from_name_and_args("soundex", [make_literal("x".into())]),
            Err(UdfError::NoSuchFunction { .. })
        ));
    }

    #[test]
    fn lower_type_mismatch() {
        assert!(matches!(
            BuiltinFunction::from_name_and_args(
                "greatest",
                [make_literal("5".into()), make_literal(5.into())]
            ),
            Err(UdfError::NoSuchFunction { .. })
        ));
        assert!(matches!(
            BuiltinFunction::from_name_and_args("last_day", [make_literal(5.into())]),
            Err(UdfError::NoSuchFunction { .. })
        ));
    }

    #[test]
    fn lower_wrong_arity() {
        let err = BuiltinFunction::from_name_and_args("replace", [make_literal("x".into())])
            .unwrap_err();
        assert_eq!(
            err,
            UdfError::ArityError {
                function: "replace".into(),
                expected: "3".into(),
                got: 1
            }
        );
    }
}
