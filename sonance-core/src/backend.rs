// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Pluggable key-value storage for the wallet record and session state.
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use redb::{Database, ReadableDatabase, TableDefinition};
use tracing::debug;

use crate::error::{Result, WalletError};

fn lock_error<T>(_: PoisonError<T>) -> WalletError {
    WalletError::storage("lock poisoned")
}

/// Table name for session entries.
pub const SESSION_TABLE: &str = "session";

const SESSION_TABLE_DEF: TableDefinition<&str, &str> = TableDefinition::new(SESSION_TABLE);

/// A single write in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    Put { key: String, value: String },
    Remove { key: String },
}

impl StorageOp {
    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn remove(key: impl Into<String>) -> Self {
        Self::Remove { key: key.into() }
    }
}

/// Client-local string storage, shaped like a browser's local storage.
///
/// Implementations must be thread-safe (`Send + Sync`).
pub trait WalletStorage: Send + Sync {
    /// Get the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Remove `key`. Returns true if it existed.
    fn remove(&self, key: &str) -> Result<bool>;

    /// Apply `ops` in order.
    ///
    /// The default implementation applies them one at a time. Backends with
    /// transactions override this to make the batch all-or-nothing.
    fn apply(&self, ops: &[StorageOp]) -> Result<()> {
        for op in ops {
            match op {
                StorageOp::Put { key, value } => self.set(key, value)?,
                StorageOp::Remove { key } => {
                    self.remove(key)?;
                }
            }
        }
        Ok(())
    }
}

/// Redb-based storage (default for the CLI).
pub struct RedbStorage {
    db: Database,
}

impl RedbStorage {
    /// Open the database at `path`, creating it if missing.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::create(path)?;
        let wtxn = db.begin_write()?;
        wtxn.open_table(SESSION_TABLE_DEF)?;
        wtxn.commit()?;

        debug!(path = %path.display(), "opened wallet storage");
        Ok(Self { db })
    }
}

impl WalletStorage for RedbStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let rtxn = self.db.begin_read()?;
        let tbl = rtxn.open_table(SESSION_TABLE_DEF)?;
        Ok(tbl.get(key)?.map(|v| v.value().to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let wtxn = self.db.begin_write()?;
        wtxn.open_table(SESSION_TABLE_DEF)?.insert(key, value)?;
        wtxn.commit()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let wtxn = self.db.begin_write()?;
        let existed = wtxn
            .open_table(SESSION_TABLE_DEF)?
            .remove(key)?
            .is_some();
        wtxn.commit()?;
        Ok(existed)
    }

    fn apply(&self, ops: &[StorageOp]) -> Result<()> {
        let wtxn = self.db.begin_write()?;
        {
            let mut tbl = wtxn.open_table(SESSION_TABLE_DEF)?;
            for op in ops {
                match op {
                    StorageOp::Put { key, value } => {
                        tbl.insert(key.as_str(), value.as_str())?;
                    }
                    StorageOp::Remove { key } => {
                        tbl.remove(key.as_str())?;
                    }
                }
            }
        }
        wtxn.commit()?;
        Ok(())
    }
}

/// In-memory storage for tests and ephemeral sessions.
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl WalletStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(lock_error)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .map_err(lock_error)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.write().map_err(lock_error)?;
        Ok(entries.remove(key).is_some())
    }

    fn apply(&self, ops: &[StorageOp]) -> Result<()> {
        let mut entries = self.entries.write().map_err(lock_error)?;
        for op in ops {
            match op {
                StorageOp::Put { key, value } => {
                    entries.insert(key.clone(), value.clone());
                }
                StorageOp::Remove { key } => {
                    entries.remove(key);
                }
            }
        }
        Ok(())
    }
}
