//! Built-in evaluator for integrals and derivatives in one variable `x`.
//!
//! Expressions are reduced to sums of `c * x**n * f(x)` terms with exact
//! rational coefficients, where `f` is one of `sin`, `cos`, `exp`, `log` or
//! absent. Anything outside that family is rejected as unsupported rather
//! than approximated.

mod algebra;
mod calculus;
mod parser;

use crate::evaluation::{EvaluationResult, Evaluator, Operation};

#[derive(Clone, Copy, Debug, Default)]
pub struct SymbolicEvaluator;

impl SymbolicEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl Evaluator for SymbolicEvaluator {
    fn evaluate(&self, expression: &str, operation: Operation) -> EvaluationResult<String> {
        let parsed = parser::parse(expression)?;
        let result = match operation {
            Operation::Integrate => calculus::integrate(&parsed)?,
            Operation::Differentiate => calculus::differentiate(&parsed)?,
        };
        Ok(result.to_string())
    }
}
