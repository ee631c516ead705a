use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dispatch_core::completion_log::MemoryCompletionLog;
use dispatch_core::evaluation::{EvaluationResult, Evaluator, Operation, SymbolicEvaluator};
use dispatch_core::models::{Category, CoreErrorKind, TaskId, TaskStatus};
use dispatch_core::orchestration::{DispatchContext, run_lines};
use dispatch_core::storage::StorageLayout;

fn temp_data_dir(test_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should be after epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("dispatch-{test_name}-{nanos}"))
}

/// Panics on one marked expression, delegates everything else.
struct PanickingEvaluator;

impl Evaluator for PanickingEvaluator {
    fn evaluate(&self, expression: &str, operation: Operation) -> EvaluationResult<String> {
        if expression.contains("boom") {
            panic!("evaluator crashed on '{expression}'");
        }
        SymbolicEvaluator::new().evaluate(expression, operation)
    }
}

/// Sleeps past any reasonable timeout on one marked expression.
#[derive(Default)]
struct StallingEvaluator {
    stalled: AtomicUsize,
}

impl Evaluator for StallingEvaluator {
    fn evaluate(&self, expression: &str, operation: Operation) -> EvaluationResult<String> {
        if expression.contains("slow") {
            self.stalled.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(400));
            self.stalled.fetch_sub(1, Ordering::SeqCst);
            return Ok("never recorded".to_string());
        }
        SymbolicEvaluator::new().evaluate(expression, operation)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn malformed_expression_fails_only_its_own_task() {
    let layout = StorageLayout::in_dir(temp_data_dir("malformed"));
    let context = DispatchContext::open(&layout, 3)
        .await
        .expect("storage should open");

    let outcomes = run_lines(
        &context,
        ["integral: x**2+(", "integral: x", "derivada: x**2", "tesis: a; b c"],
    )
    .await;

    let error = outcomes[0].error().expect("malformed task should fail");
    assert_eq!(error.kind, CoreErrorKind::EvaluationFailure);
    assert_eq!(error.task, Some(TaskId(0)));
    assert_eq!(error.category, Some(Category::Integral));
    assert!(outcomes[1..].iter().all(|outcome| outcome.is_success()));

    let integrals = context.ledgers().entries(Category::Integral).await.unwrap();
    assert_eq!(integrals, vec!["Integral de x = x**2/2"]);
    let derivatives = context.ledgers().entries(Category::Derivative).await.unwrap();
    assert_eq!(derivatives, vec!["Derivada de x**2 = 2*x"]);
    assert_eq!(context.counter().current().await.unwrap(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn evaluator_panic_is_contained_and_releases_its_slot() {
    let layout = StorageLayout::in_dir(temp_data_dir("panic"));
    let log = Arc::new(MemoryCompletionLog::new());
    let context = DispatchContext::open(&layout, 2)
        .await
        .expect("storage should open")
        .with_evaluator(Arc::new(PanickingEvaluator))
        .with_completion_log(log.clone());

    let outcomes = run_lines(
        &context,
        [
            "integral: boom",
            "derivada: boom",
            "integral: x**3",
            "derivada: cos(x)",
            "tesis: sigue; en pie",
        ],
    )
    .await;

    for outcome in &outcomes[..2] {
        assert_eq!(outcome.error().unwrap().kind, CoreErrorKind::Internal);
    }
    assert!(outcomes[2..].iter().all(|outcome| outcome.is_success()));

    assert_eq!(context.limiter().in_flight(), 0);
    assert_eq!(context.limiter().available(), 2);

    let records = log.records();
    assert_eq!(records.len(), 5);
    assert_eq!(
        records
            .iter()
            .filter(|record| record.status == TaskStatus::Failed)
            .count(),
        2
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn evaluation_timeout_fails_the_task_without_a_ledger_entry() {
    let layout = StorageLayout::in_dir(temp_data_dir("timeout"));
    let evaluator = Arc::new(StallingEvaluator::default());
    let context = DispatchContext::open(&layout, 2)
        .await
        .expect("storage should open")
        .with_evaluator(evaluator.clone())
        .with_evaluation_timeout(Some(Duration::from_millis(50)));

    let outcomes = run_lines(&context, ["integral: slow", "integral: x**2"]).await;

    assert_eq!(outcomes[0].error().unwrap().kind, CoreErrorKind::Timeout);
    assert!(outcomes[1].is_success());

    let integrals = context.ledgers().entries(Category::Integral).await.unwrap();
    assert_eq!(integrals, vec!["Integral de x**2 = x**3/3"]);

    // The slot is free again while the abandoned evaluator call is still running.
    assert_eq!(context.limiter().in_flight(), 0);
    assert_eq!(context.limiter().available(), 2);
    assert_eq!(evaluator.stalled.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unwritable_ledger_fails_its_category_only() {
    let layout = StorageLayout::in_dir(temp_data_dir("unwritable"));
    let context = DispatchContext::open(&layout, 3)
        .await
        .expect("storage should open");

    let integral_path = layout.ledger_path(Category::Integral).unwrap();
    std::fs::remove_file(&integral_path).expect("remove integral ledger");
    std::fs::create_dir(&integral_path).expect("replace ledger with a directory");

    let outcomes = run_lines(
        &context,
        ["integral: x", "derivada: x**2", "tesis: titulo; uno dos"],
    )
    .await;

    let error = outcomes[0].error().expect("integral task should fail");
    assert_eq!(error.kind, CoreErrorKind::StorageFailure);
    assert_eq!(error.category, Some(Category::Integral));
    assert!(outcomes[1].is_success());
    assert!(outcomes[2].is_success());
    assert_eq!(context.counter().current().await.unwrap(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unwritable_counter_fails_theses_but_keeps_their_ledger_lines() {
    let layout = StorageLayout::in_dir(temp_data_dir("counter-unwritable"));
    let context = DispatchContext::open(&layout, 3)
        .await
        .expect("storage should open");

    let counter_path = layout.counter_path();
    std::fs::remove_file(&counter_path).expect("remove counter file");
    std::fs::create_dir(&counter_path).expect("replace counter with a directory");

    let outcomes = run_lines(
        &context,
        ["integral: x", "tesis: titulo; uno dos", "derivada: x**2"],
    )
    .await;

    let error = outcomes[1].error().expect("thesis task should fail");
    assert_eq!(error.kind, CoreErrorKind::StorageFailure);
    assert_eq!(error.category, Some(Category::Thesis));
    assert_eq!(error.task, Some(TaskId(1)));
    assert!(outcomes[0].is_success());
    assert!(outcomes[2].is_success());

    // The ledger line is written before the counter update and is not rolled back.
    let theses = context.ledgers().entries(Category::Thesis).await.unwrap();
    assert_eq!(theses, vec!["Tesis: titulo -- uno dos"]);
    assert_eq!(context.limiter().in_flight(), 0);
}

#[tokio::test]
async fn batch_of_only_unrecognized_tasks_never_admits() {
    let layout = StorageLayout::in_dir(temp_data_dir("never-admits"));
    let context = DispatchContext::open(&layout, 1)
        .await
        .expect("storage should open");

    let outcomes = run_lines(&context, ["hola", "limite: x", "integral x"]).await;

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|outcome| {
        outcome.error().map(|error| error.kind) == Some(CoreErrorKind::ClassificationMismatch)
    }));
    assert_eq!(context.limiter().peak_in_flight(), 0);
}
