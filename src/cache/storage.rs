//! Key-value storage trait and its SQLite, in-memory and no-op implementations.

use rusqlite::{params, Connection, OptionalExtension};
#[cfg(test)]
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use super::error::StoreError;

/// Trait for durable string key-value backends.
///
/// Last writer wins; there are no transactions across keys.
pub trait KeyValueStore: Send + Sync {
  /// Get the value stored for a key.
  fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

  /// Replace the value stored for a key.
  fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

  /// Remove a key. Removing a missing key is not an error.
  fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Storage implementation that cannot be used at all.
/// Used when caching is disabled or the database failed to open.
pub struct NoopStorage;

impl KeyValueStore for NoopStorage {
  fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
    Err(StoreError::Unavailable("storage disabled".to_string()))
  }

  fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
    Err(StoreError::Unavailable("storage disabled".to_string()))
  }

  fn remove(&self, _key: &str) -> Result<(), StoreError> {
    Err(StoreError::Unavailable("storage disabled".to_string()))
  }
}

/// Process-local storage for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, String>>,
}

#[cfg(test)]
impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

#[cfg(test)]
impl KeyValueStore for MemoryStorage {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| StoreError::Unavailable(format!("Lock poisoned: {}", e)))?;
    Ok(entries.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| StoreError::Unavailable(format!("Lock poisoned: {}", e)))?;
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| StoreError::Unavailable(format!("Lock poisoned: {}", e)))?;
    entries.remove(key);
    Ok(())
  }
}

/// SQLite-based storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open the store at the given path, creating parent directories.
  pub fn open(path: &Path) -> Result<Self, StoreError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(|e| {
        StoreError::Unavailable(format!("Failed to create store directory: {}", e))
      })?;
    }

    let conn = Connection::open(path).map_err(|e| {
      StoreError::Unavailable(format!(
        "Failed to open store at {}: {}",
        path.display(),
        e
      ))
    })?;

    debug!(path = %path.display(), "opened key-value store");
    Self::with_connection(conn)
  }

  /// Open a store that lives only as long as this value.
  #[cfg(test)]
  pub fn in_memory() -> Result<Self, StoreError> {
    let conn = Connection::open_in_memory()
      .map_err(|e| StoreError::Unavailable(format!("Failed to open in-memory store: {}", e)))?;
    Self::with_connection(conn)
  }

  /// Get the default database path.
  pub fn default_path() -> Option<PathBuf> {
    let data_dir = dirs::data_dir().or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))?;
    Some(data_dir.join("adminctl").join("store.db"))
  }

  fn with_connection(conn: Connection) -> Result<Self, StoreError> {
    conn
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| StoreError::Unavailable(format!("Failed to run store migrations: {}", e)))?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
    self
      .conn
      .lock()
      .map_err(|e| StoreError::Unavailable(format!("Lock poisoned: {}", e)))
  }
}

/// Schema for the key-value table.
const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl KeyValueStore for SqliteStorage {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    let conn = self.conn()?;

    conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| StoreError::Unavailable(format!("Failed to read {}: {}", key, e)))
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let conn = self.conn()?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_store (key, value, written_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| StoreError::Unavailable(format!("Failed to write {}: {}", key, e)))?;

    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    let conn = self.conn()?;

    conn
      .execute("DELETE FROM kv_store WHERE key = ?", params![key])
      .map_err(|e| StoreError::Unavailable(format!("Failed to remove {}: {}", key, e)))?;

    Ok(())
  }
}
