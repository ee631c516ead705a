use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Category, TaskId};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoreErrorKind {
    ClassificationMismatch,
    EvaluationFailure,
    StorageFailure,
    Timeout,
    InvalidInput,
    Internal,
}

#[derive(Clone, Debug, Eq, PartialEq, Error, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct CoreError {
    pub task: Option<TaskId>,
    pub category: Option<Category>,
    pub kind: CoreErrorKind,
    pub message: String,
}

impl CoreError {
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            task: None,
            category: None,
            kind,
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::StorageFailure, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::InvalidInput, message)
    }

    /// Fills in task attribution without overwriting what the error already carries.
    pub fn attributed(self, task: TaskId, category: Category) -> Self {
        Self {
            task: self.task.or(Some(task)),
            category: self.category.or(Some(category)),
            kind: self.kind,
            message: self.message,
        }
    }
}
