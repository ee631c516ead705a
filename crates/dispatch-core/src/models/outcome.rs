use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::{Category, CoreError, TaskId, TaskPayload};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Succeeded,
    Failed,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TaskValue {
    Expression { result: String },
    Thesis { word_count: u64, running_total: u64 },
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskResult {
    Succeeded(TaskValue),
    Failed(CoreError),
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub task_id: TaskId,
    pub raw: String,
    pub category: Category,
    pub payload: TaskPayload,
    pub result: TaskResult,
    /// Time spent evaluating and persisting; admission wait is not included.
    pub elapsed: Duration,
}

impl TaskOutcome {
    pub fn status(&self) -> TaskStatus {
        match self.result {
            TaskResult::Succeeded(_) => TaskStatus::Succeeded,
            TaskResult::Failed(_) => TaskStatus::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == TaskStatus::Succeeded
    }

    pub fn error(&self) -> Option<&CoreError> {
        match &self.result {
            TaskResult::Failed(error) => Some(error),
            TaskResult::Succeeded(_) => None,
        }
    }

    pub fn value(&self) -> Option<&TaskValue> {
        match &self.result {
            TaskResult::Succeeded(value) => Some(value),
            TaskResult::Failed(_) => None,
        }
    }
}
