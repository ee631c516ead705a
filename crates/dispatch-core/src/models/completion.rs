use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

use crate::models::{Category, TaskId, TaskOutcome, TaskResult, TaskStatus, TaskValue};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionLevel {
    Info,
    Error,
}

/// The single terminal log entry emitted for each task of a batch.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub task_id: TaskId,
    pub raw: String,
    pub category: Category,
    pub status: TaskStatus,
    pub level: CompletionLevel,
    pub message: String,
    pub elapsed: Duration,
    pub created_at: SystemTime,
}

impl CompletionRecord {
    pub fn from_outcome(outcome: &TaskOutcome) -> Self {
        let (level, message) = match &outcome.result {
            TaskResult::Succeeded(TaskValue::Expression { result }) => (
                CompletionLevel::Info,
                format!("task '{}' completed: {result}", outcome.raw),
            ),
            TaskResult::Succeeded(TaskValue::Thesis {
                word_count,
                running_total,
            }) => (
                CompletionLevel::Info,
                format!(
                    "task '{}' completed: {word_count} words (total {running_total})",
                    outcome.raw
                ),
            ),
            TaskResult::Failed(error) => (
                CompletionLevel::Error,
                format!("task '{}' failed: {error}", outcome.raw),
            ),
        };

        Self {
            task_id: outcome.task_id,
            raw: outcome.raw.clone(),
            category: outcome.category,
            status: outcome.status(),
            level,
            message,
            elapsed: outcome.elapsed,
            created_at: SystemTime::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}
