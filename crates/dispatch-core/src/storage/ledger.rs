use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::models::{Category, CoreError};
use crate::storage::{StorageLayout, StorageResult, ensure_file, storage_error};

/// One line of a category ledger.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LedgerEntry {
    Integral { expression: String, result: String },
    Derivative { expression: String, result: String },
    Thesis { title: String, body: String },
}

impl LedgerEntry {
    pub fn category(&self) -> Category {
        match self {
            LedgerEntry::Integral { .. } => Category::Integral,
            LedgerEntry::Derivative { .. } => Category::Derivative,
            LedgerEntry::Thesis { .. } => Category::Thesis,
        }
    }
}

impl Display for LedgerEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerEntry::Integral { expression, result } => {
                write!(f, "Integral de {expression} = {result}")
            }
            LedgerEntry::Derivative { expression, result } => {
                write!(f, "Derivada de {expression} = {result}")
            }
            LedgerEntry::Thesis { title, body } => write!(f, "Tesis: {title} -- {body}"),
        }
    }
}

struct Ledger {
    path: PathBuf,
    lock: Mutex<()>,
}

/// Per-category append-only files. Each category has its own lock, so writers
/// of different categories never wait on each other.
#[derive(Clone)]
pub struct LedgerStore {
    ledgers: Arc<HashMap<Category, Ledger>>,
}

impl LedgerStore {
    pub async fn open(layout: &StorageLayout) -> StorageResult<Self> {
        let mut ledgers = HashMap::new();
        for category in Category::LEDGERED {
            let Some(path) = layout.ledger_path(category) else {
                continue;
            };
            ensure_file(&path).await?;
            ledgers.insert(
                category,
                Ledger {
                    path,
                    lock: Mutex::new(()),
                },
            );
        }

        Ok(Self {
            ledgers: Arc::new(ledgers),
        })
    }

    pub fn path(&self, category: Category) -> Option<&Path> {
        self.ledgers.get(&category).map(|ledger| ledger.path.as_path())
    }

    pub async fn append(&self, entry: &LedgerEntry) -> StorageResult<()> {
        let category = entry.category();
        let ledger = self.ledger(category)?;

        let mut line = entry.to_string();
        if line.contains(['\n', '\r']) {
            return Err(CoreError {
                category: Some(category),
                ..CoreError::invalid_input("ledger entries must fit on one line")
            });
        }
        line.push('\n');

        let _guard = ledger.lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&ledger.path)
            .await
            .map_err(|error| attributed(storage_error("open", &ledger.path, error), category))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|error| attributed(storage_error("append", &ledger.path, error), category))?;
        file.flush()
            .await
            .map_err(|error| attributed(storage_error("flush", &ledger.path, error), category))?;

        tracing::debug!(category = %category, path = %ledger.path.display(), "ledger entry appended");
        Ok(())
    }

    /// Reads a ledger back, one element per line.
    pub async fn entries(&self, category: Category) -> StorageResult<Vec<String>> {
        let ledger = self.ledger(category)?;
        let _guard = ledger.lock.lock().await;
        let contents = tokio::fs::read_to_string(&ledger.path)
            .await
            .map_err(|error| attributed(storage_error("read", &ledger.path, error), category))?;
        Ok(contents.lines().map(str::to_string).collect())
    }

    fn ledger(&self, category: Category) -> StorageResult<&Ledger> {
        self.ledgers.get(&category).ok_or_else(|| CoreError {
            category: Some(category),
            ..CoreError::invalid_input(format!("category '{category}' has no ledger"))
        })
    }
}

fn attributed(error: CoreError, category: Category) -> CoreError {
    CoreError {
        category: Some(category),
        ..error
    }
}
