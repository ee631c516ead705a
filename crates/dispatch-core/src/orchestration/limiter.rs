use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::models::{CoreError, CoreErrorKind};
use crate::orchestration::OrchestrationResult;

pub const DEFAULT_MAX_IN_FLIGHT: usize = 3;

/// Counting admission gate. Waiters are woken in FIFO order.
///
/// The bound covers admissions, not threads: work abandoned by its holder
/// (an evaluator call past its timeout) is no longer counted.
#[derive(Clone, Debug)]
pub struct Limiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    gauge: Arc<InFlightGauge>,
}

#[derive(Debug, Default)]
struct InFlightGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

/// Held while a task is in flight. Dropping it returns the slot.
#[derive(Debug)]
pub struct Admission {
    _permit: OwnedSemaphorePermit,
    gauge: Arc<InFlightGauge>,
}

impl Limiter {
    pub fn new(capacity: usize) -> OrchestrationResult<Self> {
        if capacity == 0 {
            return Err(CoreError::invalid_input(
                "limiter capacity must be at least 1",
            ));
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            gauge: Arc::new(InFlightGauge::default()),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn admit(&self) -> OrchestrationResult<Admission> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| CoreError::new(CoreErrorKind::Internal, "limiter closed"))?;

        let now = self.gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.gauge.peak.fetch_max(now, Ordering::SeqCst);

        Ok(Admission {
            _permit: permit,
            gauge: self.gauge.clone(),
        })
    }

    pub fn in_flight(&self) -> usize {
        self.gauge.current.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.gauge.peak.load(Ordering::SeqCst)
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        // Runs before the permit field is dropped, so the gauge never reads
        // more holders than the semaphore allows.
        self.gauge.current.fetch_sub(1, Ordering::SeqCst);
    }
}
