use thiserror::Error;

/// The durable store could not be read or written.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("storage unavailable: {0}")]
  Unavailable(String),
}

/// A stored value that is not a parseable cache entry.
#[derive(Debug, Error)]
#[error("cache entry {key} is corrupt: {reason}")]
pub struct CacheCorrupt {
  pub key: String,
  pub reason: String,
}

/// Failure while reading an entry. Never surfaced past the cache layer.
#[derive(Debug, Error)]
pub(crate) enum CacheReadError {
  #[error(transparent)]
  Store(#[from] StoreError),
  #[error(transparent)]
  Corrupt(#[from] CacheCorrupt),
}

/// Failure of a `resolve` call as seen by callers.
#[derive(Debug, Error)]
pub enum ResolveError {
  #[error("failed to fetch {key}: {reason}")]
  FetchFailed { key: String, reason: String },
}
