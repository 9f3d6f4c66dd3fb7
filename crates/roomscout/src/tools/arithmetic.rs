use std::future::ready;
use std::sync::LazyLock;

use regex::Regex;
use roomscout_core::tool::{Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-?\d+\.?\d*").expect("number pattern is valid")
});

const NOT_ENOUGH_NUMBERS: &str = "Need at least 2 numbers";

fn numbers(expression: &str) -> Vec<f64> {
    NUMBER
        .find_iter(expression)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Renders integral values with a trailing `.0`, e.g. `3234240.0`.
fn render(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

fn evaluate(expression: &str, fold: fn(&[f64]) -> f64) -> String {
    let numbers = numbers(expression);
    if numbers.len() < 2 {
        return NOT_ENOUGH_NUMBERS.to_owned();
    }
    let result = fold(&numbers);
    trace!("{expression:?} => {result}");
    render(result)
}

/// Input of the arithmetic tools.
#[derive(Deserialize, JsonSchema)]
pub struct ArithmeticParameters {
    #[schemars(
        description = "Text containing the numbers, e.g. \"5615, 576\"."
    )]
    expression: String,
}

/// Adds up all numbers in the input, plus one.
pub struct SumPlusOneTool {
    parameter_schema: Value,
}

impl SumPlusOneTool {
    /// Creates a new sum tool.
    #[inline]
    pub fn new() -> Self {
        Self {
            parameter_schema: schema_for!(ArithmeticParameters).to_value(),
        }
    }
}

impl Default for SumPlusOneTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for SumPlusOneTool {
    type Input = ArithmeticParameters;

    fn name(&self) -> &str {
        "sum_plus_one"
    }

    fn description(&self) -> &str {
        "Returns the sum of all numbers in the expression plus one."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: ArithmeticParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        ready(Ok(evaluate(&input.expression, |n| {
            1.0 + n.iter().sum::<f64>()
        })))
    }
}

/// Multiplies all numbers in the input.
pub struct MultiplyTool {
    parameter_schema: Value,
}

impl MultiplyTool {
    /// Creates a new product tool.
    #[inline]
    pub fn new() -> Self {
        Self {
            parameter_schema: schema_for!(ArithmeticParameters).to_value(),
        }
    }
}

impl Default for MultiplyTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for MultiplyTool {
    type Input = ArithmeticParameters;

    fn name(&self) -> &str {
        "multiply"
    }

    fn description(&self) -> &str {
        "Returns the product of all numbers in the expression."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: ArithmeticParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        ready(Ok(evaluate(&input.expression, |n| n.iter().product())))
    }
}
