//! Evaluate a single function call from the command line.
//!
//! ```text
//! cargo run -p udf-expression --example evaluate -- --timezone Asia/Seoul sysdate YYYY-MM-DD 1
//! cargo run -p udf-expression --example evaluate -- greatest 3 7.5 2
//! ```
//!
//! Arguments are read as literals: `null`, integers, decimals, `true`/`false`, and anything else
//! as text.

use clap::Parser;
use tracing::info;
use udf_data::ScalarValue;
use udf_expression::utils::{make_call, make_literal};
use udf_expression::{EvaluationContext, SessionOptions};

#[derive(Parser, Debug)]
struct Options {
    #[command(flatten)]
    logging: udf_logging::Options,

    #[command(flatten)]
    session: SessionOptions,

    /// Name of the function to call
    function: String,

    /// Arguments to pass to the function
    args: Vec<String>,
}

fn parse_literal(arg: &str) -> ScalarValue {
    if arg.eq_ignore_ascii_case("null") {
        ScalarValue::Null
    } else if let Ok(n) = arg.parse::<i32>() {
        n.into()
    } else if let Ok(n) = arg.parse::<i64>() {
        n.into()
    } else if let Ok(n) = arg.parse::<f64>() {
        n.into()
    } else if let Ok(b) = arg.parse::<bool>() {
        b.into()
    } else {
        arg.into()
    }
}

fn main() -> anyhow::Result<()> {
    let options = Options::parse();
    options.logging.init()?;

    let ctx = EvaluationContext::from_options(&options.session)?;
    let args = options
        .args
        .iter()
        .map(|arg| make_literal(parse_literal(arg)))
        .collect();
    let call = make_call(&options.function, args)?;
    info!(%call, ty = %call.ty(), "Evaluating");

    println!("{}", call.eval::<ScalarValue>(&ctx, &[])?);
    Ok(())
}
