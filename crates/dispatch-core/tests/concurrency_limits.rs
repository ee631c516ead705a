use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dispatch_core::evaluation::{EvaluationResult, Evaluator, Operation, SymbolicEvaluator};
use dispatch_core::models::Category;
use dispatch_core::orchestration::{DispatchContext, run_lines};
use dispatch_core::storage::{LedgerEntry, LedgerStore, StorageLayout};

fn temp_data_dir(test_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should be after epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("dispatch-{test_name}-{nanos}"))
}

/// Wraps the real evaluator and records how many calls overlap.
struct InstrumentedEvaluator {
    inner: SymbolicEvaluator,
    delay: Duration,
    current: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl InstrumentedEvaluator {
    fn new(delay: Duration) -> Self {
        Self {
            inner: SymbolicEvaluator::new(),
            delay,
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

impl Evaluator for InstrumentedEvaluator {
    fn evaluate(&self, expression: &str, operation: Operation) -> EvaluationResult<String> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        let result = self.inner.evaluate(expression, operation);
        self.current.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn evaluations_never_exceed_max_in_flight() {
    let layout = StorageLayout::in_dir(temp_data_dir("admission-bound"));
    let evaluator = Arc::new(InstrumentedEvaluator::new(Duration::from_millis(30)));
    let context = DispatchContext::open(&layout, 2)
        .await
        .expect("storage should open")
        .with_evaluator(evaluator.clone());

    let lines: Vec<String> = (0..12)
        .map(|index| {
            if index % 2 == 0 {
                format!("integral: x**{index}")
            } else {
                format!("derivada: x**{index}")
            }
        })
        .collect();
    let outcomes = run_lines(&context, &lines).await;

    assert!(outcomes.iter().all(|outcome| outcome.is_success()));
    assert_eq!(evaluator.calls.load(Ordering::SeqCst), 12);
    assert!(evaluator.peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(context.limiter().peak_in_flight(), 2);
    assert_eq!(context.limiter().in_flight(), 0);
    assert_eq!(context.limiter().available(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_slot_runs_tasks_one_at_a_time() {
    let layout = StorageLayout::in_dir(temp_data_dir("single-slot"));
    let evaluator = Arc::new(InstrumentedEvaluator::new(Duration::from_millis(5)));
    let context = DispatchContext::open(&layout, 1)
        .await
        .expect("storage should open")
        .with_evaluator(evaluator.clone());

    let lines = ["integral: x", "integral: x**2", "derivada: x**3", "tesis: a; b c"];
    let outcomes = run_lines(&context, lines).await;

    assert!(outcomes.iter().all(|outcome| outcome.is_success()));
    assert_eq!(evaluator.peak.load(Ordering::SeqCst), 1);
    assert_eq!(context.limiter().peak_in_flight(), 1);
}

async fn run_theses(test_name: &str, max_in_flight: usize, seed: &str) -> (u64, BTreeSet<String>) {
    let layout = StorageLayout::in_dir(temp_data_dir(test_name));
    std::fs::create_dir_all(&layout.dir).expect("create data dir");
    std::fs::write(layout.counter_path(), seed).expect("seed counter");

    let context = DispatchContext::open(&layout, max_in_flight)
        .await
        .expect("storage should open");

    let lines: Vec<String> = (1..=8)
        .map(|index| {
            let body = vec!["palabra"; index].join(" ");
            format!("tesis: titulo {index}; {body}")
        })
        .collect();
    let outcomes = run_lines(&context, &lines).await;
    assert!(outcomes.iter().all(|outcome| outcome.is_success()));

    let total = context.counter().current().await.expect("read counter");
    let entries = context
        .ledgers()
        .entries(Category::Thesis)
        .await
        .expect("read thesis ledger")
        .into_iter()
        .collect();
    (total, entries)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn counter_total_is_independent_of_parallelism() {
    let (sequential_total, sequential_entries) = run_theses("counter-n1", 1, "10").await;
    let (parallel_total, parallel_entries) = run_theses("counter-n8", 8, "10").await;

    // 10 seeded plus 1 + 2 + ... + 8 words.
    assert_eq!(sequential_total, 46);
    assert_eq!(parallel_total, 46);
    assert_eq!(sequential_entries.len(), 8);
    assert_eq!(sequential_entries, parallel_entries);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_appends_keep_lines_intact() {
    let layout = StorageLayout::in_dir(temp_data_dir("ledger-appends"));
    let ledgers = LedgerStore::open(&layout).await.expect("open ledgers");

    let mut handles = Vec::new();
    for index in 0..60 {
        let ledgers = ledgers.clone();
        handles.push(tokio::spawn(async move {
            let entry = match index % 3 {
                0 => LedgerEntry::Integral {
                    expression: format!("x**{index}"),
                    result: format!("r{index}"),
                },
                1 => LedgerEntry::Derivative {
                    expression: format!("x**{index}"),
                    result: format!("r{index}"),
                },
                _ => LedgerEntry::Thesis {
                    title: format!("t{index}"),
                    body: "cuerpo de prueba".to_string(),
                },
            };
            ledgers.append(&entry).await
        }));
    }
    for handle in handles {
        handle.await.expect("join").expect("append");
    }

    for (category, prefix) in [
        (Category::Integral, "Integral de x**"),
        (Category::Derivative, "Derivada de x**"),
        (Category::Thesis, "Tesis: t"),
    ] {
        let entries = ledgers.entries(category).await.expect("read ledger");
        assert_eq!(entries.len(), 20, "{category}");
        assert!(entries.iter().all(|line| line.starts_with(prefix)), "{category}");
    }
}
