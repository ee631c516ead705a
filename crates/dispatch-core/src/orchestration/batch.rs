use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::classify;
use crate::models::{Category, Task, TaskId, TaskOutcome, TaskValue};
use crate::orchestration::runner::{emit_completion, outcome_for};
use crate::orchestration::{DispatchContext, internal_error, run_task};

/// Spawns one unit of work per task and waits for all of them.
///
/// Task ids follow submission order. Outcomes come back sorted by task id,
/// one per input task, whatever happened to the individual tasks.
pub async fn run_batch(ctx: &DispatchContext, tasks: Vec<Task>) -> Vec<TaskOutcome> {
    tracing::info!(
        tasks = tasks.len(),
        max_in_flight = ctx.limiter().capacity(),
        "starting batch"
    );

    let mut handles = Vec::with_capacity(tasks.len());
    for (index, task) in tasks.into_iter().enumerate() {
        let task_id = TaskId(index as u64);
        let worker_ctx = ctx.clone();
        let submitted = task.clone();
        let handle = tokio::spawn(async move { run_task(&worker_ctx, task_id, task).await });
        handles.push((task_id, submitted, handle));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (task_id, submitted, handle) in handles {
        match handle.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(join_error) => {
                tracing::error!(
                    task_id = task_id.0,
                    error = %join_error,
                    "task worker terminated abnormally"
                );
                let error = internal_error(format!("task worker join failure: {join_error}"))
                    .attributed(task_id, submitted.category);
                let outcome = outcome_for(task_id, submitted, Err(error), Duration::ZERO);
                emit_completion(ctx, &outcome);
                outcomes.push(outcome);
            }
        }
    }

    outcomes.sort_by_key(|outcome| outcome.task_id);
    outcomes
}

/// Classifies raw task lines, then runs them as one batch.
pub async fn run_lines<I, S>(ctx: &DispatchContext, lines: I) -> Vec<TaskOutcome>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let tasks = lines
        .into_iter()
        .map(|line| classify(line.as_ref()))
        .collect();
    run_batch(ctx, tasks).await
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub integrals: usize,
    pub derivatives: usize,
    pub theses: usize,
    pub failed: usize,
    pub unrecognized: usize,
    pub words_added: u64,
    /// Sum of per-task evaluation time, not wall-clock time of the batch.
    pub busy_time: Duration,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[TaskOutcome]) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            ..Self::default()
        };

        for outcome in outcomes {
            summary.busy_time += outcome.elapsed;
            if outcome.category == Category::Unrecognized {
                summary.unrecognized += 1;
            }
            if !outcome.is_success() {
                summary.failed += 1;
                continue;
            }
            match outcome.category {
                Category::Integral => summary.integrals += 1,
                Category::Derivative => summary.derivatives += 1,
                Category::Thesis => summary.theses += 1,
                Category::Unrecognized => {}
            }
            if let Some(TaskValue::Thesis { word_count, .. }) = outcome.value() {
                summary.words_added += word_count;
            }
        }

        summary
    }

    pub fn succeeded(&self) -> usize {
        self.total - self.failed
    }
}
