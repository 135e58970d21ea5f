use udf_data::{ScalarType, ScalarValue};
use udf_errors::UdfResult;

use crate::{BuiltinFunction, Expr};

/// Create `Expr::Column` with type `ty`
pub fn make_column(index: usize, ty: ScalarType) -> Expr {
    Expr::Column { index, ty }
}

/// Create `Expr::Literal` from `ScalarValue`. Type is taken from the value, so a NULL literal is
/// untyped.
pub fn make_literal(val: ScalarValue) -> Expr {
    Expr::Literal {
        ty: val.scalar_type(),
        val,
    }
}

/// Create `Expr::Call` by resolving a call to the function called `name` with `args`
pub fn make_call(name: &str, args: Vec<Expr>) -> UdfResult<Expr> {
    let (func, ty) = BuiltinFunction::from_name_and_args(name, args)?;
    Ok(Expr::Call {
        func: Box::new(func),
        ty,
    })
}
