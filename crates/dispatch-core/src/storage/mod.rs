pub mod counter;
pub mod ledger;

pub use counter::AggregateCounter;
pub use ledger::{LedgerEntry, LedgerStore};

use std::path::{Path, PathBuf};

use crate::models::{Category, CoreError};

pub type StorageResult<T> = Result<T, CoreError>;

pub const DEFAULT_INTEGRAL_FILE: &str = "integrales.txt";
pub const DEFAULT_DERIVATIVE_FILE: &str = "derivadas.txt";
pub const DEFAULT_THESIS_FILE: &str = "tesis.txt";
pub const DEFAULT_COUNTER_FILE: &str = "largo.txt";

/// Where each shared resource lives on disk.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StorageLayout {
    pub dir: PathBuf,
    pub integral: String,
    pub derivative: String,
    pub thesis: String,
    pub counter: String,
}

impl StorageLayout {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            integral: DEFAULT_INTEGRAL_FILE.to_string(),
            derivative: DEFAULT_DERIVATIVE_FILE.to_string(),
            thesis: DEFAULT_THESIS_FILE.to_string(),
            counter: DEFAULT_COUNTER_FILE.to_string(),
        }
    }

    pub fn ledger_path(&self, category: Category) -> Option<PathBuf> {
        let name = match category {
            Category::Integral => &self.integral,
            Category::Derivative => &self.derivative,
            Category::Thesis => &self.thesis,
            Category::Unrecognized => return None,
        };
        Some(self.dir.join(name))
    }

    pub fn counter_path(&self) -> PathBuf {
        self.dir.join(&self.counter)
    }
}

pub(crate) fn storage_error(operation: &str, path: &Path, error: std::io::Error) -> CoreError {
    CoreError::storage(format!(
        "{operation} failed for '{}': {error}",
        path.display()
    ))
}

pub(crate) async fn ensure_file(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|error| storage_error("create directory", parent, error))?;
    }

    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|error| storage_error("create", path, error))?;
    Ok(())
}
