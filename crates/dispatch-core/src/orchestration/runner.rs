use std::time::{Duration, Instant};

use crate::classify::word_count;
use crate::evaluation::Operation;
use crate::models::{
    Category, CompletionRecord, CoreError, CoreErrorKind, Task, TaskId, TaskOutcome, TaskPayload,
    TaskResult, TaskValue,
};
use crate::orchestration::{DispatchContext, OrchestrationResult, internal_error};
use crate::storage::LedgerEntry;

/// Runs one task end to end and always yields an outcome.
///
/// Unrecognized tasks fail before admission. Every other task holds an
/// admission from the limiter for the whole evaluate-and-persist step; the
/// admission is dropped on every exit path, including evaluator panics and
/// timeouts. Exactly one completion record is emitted per call.
///
/// A timed-out evaluator call cannot be cancelled: it keeps running on the
/// blocking pool after its admission is released, so with a timeout set more
/// than `max_in_flight` evaluator calls may be running at once.
pub async fn run_task(ctx: &DispatchContext, task_id: TaskId, task: Task) -> TaskOutcome {
    if task.category == Category::Unrecognized {
        let text = match &task.payload {
            TaskPayload::Unrecognized { text } => text.as_str(),
            _ => task.raw.trim(),
        };
        let error = CoreError {
            task: Some(task_id),
            category: Some(Category::Unrecognized),
            kind: CoreErrorKind::ClassificationMismatch,
            message: format!("unrecognized task '{text}'"),
        };
        let outcome = outcome_for(task_id, task, Err(error), Duration::ZERO);
        emit_completion(ctx, &outcome);
        return outcome;
    }

    let (result, elapsed) = match ctx.limiter().admit().await {
        Ok(admission) => {
            tracing::debug!(
                task_id = task_id.0,
                category = %task.category,
                in_flight = ctx.limiter().in_flight(),
                "task admitted"
            );
            let started = Instant::now();
            let result = execute(ctx, &task).await;
            let elapsed = started.elapsed();
            drop(admission);
            (result, elapsed)
        }
        Err(error) => (Err(error), Duration::ZERO),
    };

    let result = result.map_err(|error| error.attributed(task_id, task.category));
    let outcome = outcome_for(task_id, task, result, elapsed);
    emit_completion(ctx, &outcome);
    outcome
}

async fn execute(ctx: &DispatchContext, task: &Task) -> OrchestrationResult<TaskValue> {
    match (&task.payload, task.category) {
        (TaskPayload::Expression { expression }, Category::Integral) => {
            let result = evaluate(ctx, expression, Operation::Integrate).await?;
            ctx.ledgers()
                .append(&LedgerEntry::Integral {
                    expression: expression.clone(),
                    result: result.clone(),
                })
                .await?;
            Ok(TaskValue::Expression { result })
        }
        (TaskPayload::Expression { expression }, Category::Derivative) => {
            let result = evaluate(ctx, expression, Operation::Differentiate).await?;
            ctx.ledgers()
                .append(&LedgerEntry::Derivative {
                    expression: expression.clone(),
                    result: result.clone(),
                })
                .await?;
            Ok(TaskValue::Expression { result })
        }
        (TaskPayload::Thesis { title, body }, Category::Thesis) => {
            let words = word_count(body);
            ctx.ledgers()
                .append(&LedgerEntry::Thesis {
                    title: title.clone(),
                    body: body.clone(),
                })
                .await?;
            let running_total = ctx.counter().add_and_persist(words).await?;
            Ok(TaskValue::Thesis {
                word_count: words,
                running_total,
            })
        }
        (_, category) => Err(internal_error(format!(
            "payload does not match category '{category}'"
        ))),
    }
}

async fn evaluate(
    ctx: &DispatchContext,
    expression: &str,
    operation: Operation,
) -> OrchestrationResult<String> {
    let evaluator = ctx.evaluator();
    let owned = expression.to_string();
    let handle = tokio::task::spawn_blocking(move || evaluator.evaluate(&owned, operation));

    let joined = match ctx.evaluation_timeout() {
        Some(limit) => tokio::time::timeout(limit, handle).await.map_err(|_| {
            CoreError::new(
                CoreErrorKind::Timeout,
                format!(
                    "evaluation of '{expression}' exceeded {} ms",
                    limit.as_millis()
                ),
            )
        })?,
        None => handle.await,
    };

    joined
        .map_err(|join_error| internal_error(format!("evaluator join failure: {join_error}")))?
        .map_err(|error| CoreError::new(CoreErrorKind::EvaluationFailure, error.to_string()))
}

pub(crate) fn outcome_for(
    task_id: TaskId,
    task: Task,
    result: OrchestrationResult<TaskValue>,
    elapsed: Duration,
) -> TaskOutcome {
    TaskOutcome {
        task_id,
        raw: task.raw,
        category: task.category,
        payload: task.payload,
        result: match result {
            Ok(value) => TaskResult::Succeeded(value),
            Err(error) => TaskResult::Failed(error),
        },
        elapsed,
    }
}

pub(crate) fn emit_completion(ctx: &DispatchContext, outcome: &TaskOutcome) {
    ctx.completion_log()
        .record(&CompletionRecord::from_outcome(outcome));
}
