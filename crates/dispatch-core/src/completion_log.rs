use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::models::{CompletionLevel, CompletionRecord};

pub const COMPLETION_TARGET: &str = "dispatch::completion";

pub const DEFAULT_MEMORY_RECORDS: usize = 4096;

/// Receives the one terminal record of every task.
pub trait CompletionLog: Send + Sync {
    fn record(&self, record: &CompletionRecord);
}

/// Forwards completion records to the process-wide `tracing` subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingCompletionLog;

impl CompletionLog for TracingCompletionLog {
    fn record(&self, record: &CompletionRecord) {
        match record.level {
            CompletionLevel::Info => tracing::info!(
                target: COMPLETION_TARGET,
                task_id = record.task_id.0,
                category = %record.category,
                status = ?record.status,
                elapsed_secs = record.elapsed_secs(),
                "{}",
                record.message
            ),
            CompletionLevel::Error => tracing::error!(
                target: COMPLETION_TARGET,
                task_id = record.task_id.0,
                category = %record.category,
                status = ?record.status,
                elapsed_secs = record.elapsed_secs(),
                "{}",
                record.message
            ),
        }
    }
}

/// Keeps the most recent completion records in memory, oldest evicted first.
#[derive(Debug)]
pub struct MemoryCompletionLog {
    records: Mutex<VecDeque<CompletionRecord>>,
    capacity: usize,
}

impl Default for MemoryCompletionLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_RECORDS)
    }
}

impl MemoryCompletionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retains up to `capacity` records. Size it to the batch to keep every record.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_MEMORY_RECORDS))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn records(&self) -> Vec<CompletionRecord> {
        self.records
            .lock()
            .map(|records| records.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CompletionLog for MemoryCompletionLog {
    fn record(&self, record: &CompletionRecord) {
        if let Ok(mut records) = self.records.lock() {
            if records.len() >= self.capacity {
                records.pop_front();
            }
            records.push_back(record.clone());
        }
    }
}

/// Sends each record to several sinks in order.
pub struct FanoutCompletionLog {
    sinks: Vec<Arc<dyn CompletionLog>>,
}

impl FanoutCompletionLog {
    pub fn new(sinks: impl IntoIterator<Item = Arc<dyn CompletionLog>>) -> Self {
        Self {
            sinks: sinks.into_iter().collect(),
        }
    }
}

impl CompletionLog for FanoutCompletionLog {
    fn record(&self, record: &CompletionRecord) {
        for sink in &self.sinks {
            sink.record(record);
        }
    }
}
