use std::borrow::Borrow;

use udf_data::ScalarValue;
use udf_errors::{UdfError, UdfResult};

use crate::{EvaluationContext, Expr};

macro_rules! non_null {
    ($value:expr) => {
        if let Some(val) = $value.non_null() {
            val
        } else {
            return Ok(ScalarValue::Null);
        }
    };
}

mod builtins;

impl Expr {
    /// Evaluate this expression, given a source record to pull columns from.
    ///
    /// Function arguments are only evaluated when the function needs them, so an argument which
    /// would fail is harmless if an earlier one already decided the result.
    pub fn eval<D>(&self, ctx: &EvaluationContext, record: &[D]) -> UdfResult<ScalarValue>
    where
        D: Borrow<ScalarValue>,
    {
        use Expr::*;

        match self {
            Column { index, .. } => record
                .get(*index)
                .map(|val| val.borrow().clone())
                .ok_or(UdfError::InvalidColumnIndex(*index)),
            Literal { val, .. } => Ok(val.clone()),
            Cast { expr, ty } => expr.eval(ctx, record)?.coerce_to(*ty),
            Call { func, .. } => func.eval(ctx, record),
        }
    }
}
