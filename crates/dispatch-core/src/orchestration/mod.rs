pub mod batch;
pub mod limiter;
pub mod runner;

pub use batch::{BatchSummary, run_batch, run_lines};
pub use limiter::{Admission, DEFAULT_MAX_IN_FLIGHT, Limiter};
pub use runner::run_task;

use std::sync::Arc;
use std::time::Duration;

use crate::completion_log::{CompletionLog, TracingCompletionLog};
use crate::config::DispatchConfig;
use crate::evaluation::{Evaluator, SymbolicEvaluator};
use crate::models::{CoreError, CoreErrorKind};
use crate::storage::{AggregateCounter, LedgerStore, StorageLayout};

pub type OrchestrationResult<T> = Result<T, CoreError>;

/// Everything a worker shares with its siblings. Built once per batch run
/// and cloned into each spawned task; clones share the same locks and files.
#[derive(Clone)]
pub struct DispatchContext {
    limiter: Limiter,
    ledgers: LedgerStore,
    counter: AggregateCounter,
    evaluator: Arc<dyn Evaluator>,
    completion_log: Arc<dyn CompletionLog>,
    evaluation_timeout: Option<Duration>,
}

impl DispatchContext {
    pub fn new(limiter: Limiter, ledgers: LedgerStore, counter: AggregateCounter) -> Self {
        Self {
            limiter,
            ledgers,
            counter,
            evaluator: Arc::new(SymbolicEvaluator::new()),
            completion_log: Arc::new(TracingCompletionLog),
            evaluation_timeout: None,
        }
    }

    /// Creates the storage resources named by `layout`. Failure here is fatal
    /// for the run.
    pub async fn open(layout: &StorageLayout, max_in_flight: usize) -> OrchestrationResult<Self> {
        let limiter = Limiter::new(max_in_flight)?;
        let ledgers = LedgerStore::open(layout).await?;
        let counter = AggregateCounter::open(layout.counter_path()).await?;
        Ok(Self::new(limiter, ledgers, counter))
    }

    pub async fn from_config(config: &DispatchConfig) -> OrchestrationResult<Self> {
        config.validate()?;
        let context = Self::open(&config.storage_layout(), config.max_in_flight).await?;
        Ok(context.with_evaluation_timeout(config.evaluation_timeout()))
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_completion_log(mut self, completion_log: Arc<dyn CompletionLog>) -> Self {
        self.completion_log = completion_log;
        self
    }

    pub fn with_evaluation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.evaluation_timeout = timeout;
        self
    }

    pub fn limiter(&self) -> &Limiter {
        &self.limiter
    }

    pub fn ledgers(&self) -> &LedgerStore {
        &self.ledgers
    }

    pub fn counter(&self) -> &AggregateCounter {
        &self.counter
    }

    pub(crate) fn evaluator(&self) -> Arc<dyn Evaluator> {
        self.evaluator.clone()
    }

    pub(crate) fn completion_log(&self) -> &dyn CompletionLog {
        self.completion_log.as_ref()
    }

    pub(crate) fn evaluation_timeout(&self) -> Option<Duration> {
        self.evaluation_timeout
    }
}

pub(crate) fn internal_error(message: impl Into<String>) -> CoreError {
    CoreError::new(CoreErrorKind::Internal, message)
}
