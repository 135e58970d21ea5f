use std::sync::Arc;

use udf_data::{ScalarType, ScalarValue};
use udf_errors::{type_mismatch_err, UdfError, UdfResult};

use crate::utils::make_column;
use crate::{BuiltinFunction, EvaluationContext, Expr, FunctionSignature, Volatility};

/// A function resolved for one call site, for hosts that evaluate against argument values rather
/// than expressions.
///
/// Call [`ScalarFunction::init`] with the statement's [`EvaluationContext`] to obtain a
/// [`BoundFunction`] which can then be evaluated any number of times.
#[derive(Debug, Clone)]
pub struct ScalarFunction {
    arg_types: Vec<ScalarType>,
    signature: &'static FunctionSignature,
    call: Expr,
}

impl ScalarFunction {
    /// Resolve the function called `name` for a call site whose arguments have the given types.
    pub fn resolve(name: &str, arg_types: &[ScalarType]) -> UdfResult<Self> {
        let args = arg_types
            .iter()
            .enumerate()
            .map(|(index, ty)| make_column(index, *ty));
        let (func, signature) = BuiltinFunction::resolve(name, args)?;

        Ok(Self {
            arg_types: arg_types.to_vec(),
            signature,
            call: Expr::Call {
                func: Box::new(func),
                ty: signature.return_type(),
            },
        })
    }

    pub fn name(&self) -> &str {
        self.signature.name()
    }

    /// The signature this call site was resolved to
    pub fn signature(&self) -> &FunctionSignature {
        self.signature
    }

    pub fn return_type(&self) -> ScalarType {
        self.signature.return_type()
    }

    pub fn volatility(&self) -> Volatility {
        self.signature.volatility()
    }

    /// Bind this function to the context of the statement it is evaluated in
    pub fn init(self, ctx: Arc<EvaluationContext>) -> BoundFunction {
        BoundFunction {
            function: self,
            ctx,
        }
    }
}

/// A [`ScalarFunction`] bound to an [`EvaluationContext`]
#[derive(Debug, Clone)]
pub struct BoundFunction {
    function: ScalarFunction,
    ctx: Arc<EvaluationContext>,
}

impl BoundFunction {
    pub fn function(&self) -> &ScalarFunction {
        &self.function
    }

    pub fn context(&self) -> &EvaluationContext {
        &self.ctx
    }

    /// Evaluate the function against one set of argument values.
    ///
    /// Fails with [`UdfError::ArityError`] if the number of arguments differs from the call site
    /// the function was resolved for, and with [`UdfError::TypeMismatch`] if an argument is
    /// neither NULL nor of the type resolved for its position.
    pub fn eval(&self, args: &[ScalarValue]) -> UdfResult<ScalarValue> {
        let expected = &self.function.arg_types;
        if args.len() != expected.len() {
            return Err(UdfError::ArityError {
                function: self.function.name().to_owned(),
                expected: expected.len().to_string(),
                got: args.len(),
            });
        }

        if let Some((arg, ty)) = args
            .iter()
            .zip(expected)
            .find(|(arg, ty)| !arg.conforms_to(**ty))
        {
            return Err(type_mismatch_err(
                self.function.name(),
                ty,
                arg.scalar_type(),
            ));
        }

        self.function.call.eval(&self.ctx, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_and_eval() {
        let nvl = ScalarFunction::resolve("nvl", &[ScalarType::Text, ScalarType::Text])
            .unwrap()
            .init(Arc::new(EvaluationContext::default()));
        assert_eq!(nvl.function().name(), "nvl");
        assert_eq!(
            nvl.eval(&[ScalarValue::Null, "b".into()]).unwrap(),
            ScalarValue::from("b")
        );
        assert_eq!(
            nvl.eval(&["a".into(), "b".into()]).unwrap(),
            ScalarValue::from("a")
        );
    }

    #[test]
    fn eval_checks_arity() {
        let nvl = ScalarFunction::resolve("nvl", &[ScalarType::Int, ScalarType::Int])
            .unwrap()
            .init(Arc::new(EvaluationContext::default()));
        assert_eq!(
            nvl.eval(&[1.into()]),
            Err(UdfError::ArityError {
                function: "nvl".into(),
                expected: "2".into(),
                got: 1,
            })
        );
    }

    #[test]
    fn eval_checks_types() {
        let greatest = ScalarFunction::resolve("greatest", &[ScalarType::Int, ScalarType::Int])
            .unwrap()
            .init(Arc::new(EvaluationContext::default()));
        let err = greatest.eval(&["5".into(), 5.into()]).unwrap_err();
        assert_eq!(
            err,
            UdfError::TypeMismatch {
                function: "greatest".into(),
                expected: "int4".into(),
                actual: "text".into(),
            }
        );
    }

    #[test]
    fn widened_arguments() {
        let f =
            ScalarFunction::resolve("greatest", &[ScalarType::Int, ScalarType::Double]).unwrap();
        assert_eq!(f.return_type(), ScalarType::Double);
        assert_eq!(f.volatility(), Volatility::Immutable);
        let f = f.init(Arc::new(EvaluationContext::default()));
        assert_eq!(
            f.eval(&[3.into(), 2.5.into()]).unwrap(),
            ScalarValue::Double(3.0)
        );
    }
}
