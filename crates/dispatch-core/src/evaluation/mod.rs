pub mod symbolic;

pub use symbolic::SymbolicEvaluator;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Integrate,
    Differentiate,
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum EvaluationError {
    #[error("cannot parse expression: {message}")]
    Parse { message: String },
    #[error("unsupported expression: {message}")]
    Unsupported { message: String },
}

impl EvaluationError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }
}

pub type EvaluationResult<T> = Result<T, EvaluationError>;

/// Computes the symbolic result for one task payload. Implementations may be
/// slow; the runner calls them on the blocking pool.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, expression: &str, operation: Operation) -> EvaluationResult<String>;
}
