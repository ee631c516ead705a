use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::models::{Category, CoreError};
use crate::storage::{StorageResult, ensure_file, storage_error};

/// Shared running total persisted as a single decimal integer.
///
/// Every read-modify-write happens under one acquisition of the counter lock,
/// so concurrent `add_and_persist` calls can never lose an update.
#[derive(Clone)]
pub struct AggregateCounter {
    inner: Arc<CounterFile>,
}

struct CounterFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AggregateCounter {
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        ensure_file(&path).await?;
        Ok(Self {
            inner: Arc::new(CounterFile {
                path,
                lock: Mutex::new(()),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub async fn add_and_persist(&self, delta: u64) -> StorageResult<u64> {
        let _guard = self.inner.lock.lock().await;

        let current = read_total(&self.inner.path).await?;
        let updated = current.saturating_add(delta);
        tokio::fs::write(&self.inner.path, updated.to_string())
            .await
            .map_err(|error| thesis_error(storage_error("write", &self.inner.path, error)))?;

        tracing::debug!(previous = current, delta, total = updated, "aggregate counter updated");
        Ok(updated)
    }

    pub async fn current(&self) -> StorageResult<u64> {
        let _guard = self.inner.lock.lock().await;
        read_total(&self.inner.path).await
    }
}

async fn read_total(path: &Path) -> StorageResult<u64> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(parse_total(&contents)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(error) => Err(thesis_error(storage_error("read", path, error))),
    }
}

/// Empty or unparseable contents count as zero.
fn parse_total(contents: &str) -> u64 {
    contents.trim().parse().unwrap_or(0)
}

fn thesis_error(error: CoreError) -> CoreError {
    CoreError {
        category: Some(Category::Thesis),
        ..error
    }
}
