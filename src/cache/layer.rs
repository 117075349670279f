//! Cache layer that orchestrates caching logic with network fetching.

use chrono::{DateTime, FixedOffset};
use color_eyre::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::error::{CacheCorrupt, CacheReadError, ResolveError};
use super::policy::ExpiryPolicy;
use super::storage::KeyValueStore;
use super::traits::{CacheEntry, CacheResult, Clock, SystemClock};

/// Cache layer that manages caching logic and network fetching.
///
/// Storage failures never reach the caller: an unreadable store or a corrupt
/// entry is a miss, and a failed write only loses the cache, not the data.
pub struct CacheLayer<S: KeyValueStore + ?Sized> {
  storage: Arc<S>,
  clock: Arc<dyn Clock>,
  /// Upper bound on a single fetch, on top of the transport's own timeout
  fetch_timeout: Option<Duration>,
}

impl<S: KeyValueStore + ?Sized> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: Arc<S>) -> Self {
    Self {
      storage,
      clock: Arc::new(SystemClock),
      fetch_timeout: None,
    }
  }

  /// Replace the clock used for freshness decisions.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
    self.fetch_timeout = Some(timeout);
    self
  }

  /// Serve `key` from the store if `policy` says it is fresh, otherwise fetch.
  ///
  /// 1. Read the entry; unreadable store or corrupt entry counts as a miss
  /// 2. If fresh, return it without calling `fetcher`
  /// 3. Otherwise fetch; on success overwrite the entry and return the payload
  /// 4. On fetch failure return `FetchFailed` and leave the store untouched
  pub async fn resolve<T, F, Fut>(
    &self,
    key: &str,
    policy: ExpiryPolicy,
    fetcher: F,
  ) -> Result<CacheResult<T>, ResolveError>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let now = self.clock.now();

    match self.read_entry::<T>(key) {
      Ok(Some(entry)) if policy.is_fresh(entry.stored_at, now) => {
        debug!(key, policy = %policy.describe(), "cache hit");
        return Ok(CacheResult::from_cache(entry.payload, entry.stored_at));
      }
      Ok(Some(entry)) => {
        debug!(key, stored_at = %entry.stored_at, policy = %policy.describe(), "cache entry expired");
      }
      Ok(None) => debug!(key, "cache miss"),
      Err(CacheReadError::Store(e)) => warn!(key, error = %e, "cache unreadable, fetching"),
      Err(CacheReadError::Corrupt(e)) => warn!(key, error = %e, "discarding corrupt cache entry"),
    }

    let data = self.fetch(key, fetcher).await?;

    // Stamp the write after the fetch so slow fetches don't shorten the entry's life
    let stored_at = self.clock.now();
    self.write_entry(key, &data, stored_at);

    Ok(CacheResult::from_network(data, stored_at))
  }

  /// Drop the entry for `key` so the next `resolve` fetches.
  pub fn invalidate(&self, key: &str) {
    match self.storage.remove(key) {
      Ok(()) => debug!(key, "cache entry invalidated"),
      Err(e) => warn!(key, error = %e, "failed to invalidate cache entry"),
    }
  }

  async fn fetch<T, F, Fut>(&self, key: &str, fetcher: F) -> Result<T, ResolveError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let outcome = match self.fetch_timeout {
      Some(limit) => match tokio::time::timeout(limit, fetcher()).await {
        Ok(outcome) => outcome,
        Err(_) => {
          return Err(ResolveError::FetchFailed {
            key: key.to_string(),
            reason: format!("timed out after {}s", limit.as_secs_f64()),
          })
        }
      },
      None => fetcher().await,
    };

    outcome.map_err(|e| ResolveError::FetchFailed {
      key: key.to_string(),
      reason: format!("{:#}", e),
    })
  }

  fn read_entry<T: DeserializeOwned>(
    &self,
    key: &str,
  ) -> Result<Option<CacheEntry<T>>, CacheReadError> {
    let raw = match self.storage.get(key)? {
      Some(raw) => raw,
      None => return Ok(None),
    };

    let entry = serde_json::from_str(&raw).map_err(|e| CacheCorrupt {
      key: key.to_string(),
      reason: e.to_string(),
    })?;

    Ok(Some(entry))
  }

  fn write_entry<T: Serialize>(&self, key: &str, payload: &T, stored_at: DateTime<FixedOffset>) {
    let entry = CacheEntry { payload, stored_at };

    let json = match serde_json::to_string(&entry) {
      Ok(json) => json,
      Err(e) => {
        warn!(key, error = %e, "failed to serialize cache entry");
        return;
      }
    };

    if let Err(e) = self.storage.set(key, &json) {
      warn!(key, error = %e, "failed to write cache entry");
    }
  }
}

impl<S: KeyValueStore + ?Sized> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      clock: Arc::clone(&self.clock),
      fetch_timeout: self.fetch_timeout,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage::{MemoryStorage, NoopStorage};
  use chrono::Duration as ChronoDuration;
  use color_eyre::eyre::eyre;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Mutex;

  /// Clock that only moves when told to.
  struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
  }

  impl ManualClock {
    fn at(rfc3339: &str) -> Arc<Self> {
      Arc::new(Self {
        now: Mutex::new(DateTime::parse_from_rfc3339(rfc3339).unwrap()),
      })
    }

    fn set(&self, rfc3339: &str) {
      *self.now.lock().unwrap() = DateTime::parse_from_rfc3339(rfc3339).unwrap();
    }

    fn advance(&self, by: ChronoDuration) {
      let mut now = self.now.lock().unwrap();
      *now = *now + by;
    }
  }

  impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
      *self.now.lock().unwrap()
    }
  }

  fn layer_at(rfc3339: &str) -> (CacheLayer<MemoryStorage>, Arc<MemoryStorage>, Arc<ManualClock>) {
    let storage = Arc::new(MemoryStorage::new());
    let clock = ManualClock::at(rfc3339);
    let layer = CacheLayer::new(Arc::clone(&storage)).with_clock(clock.clone());
    (layer, storage, clock)
  }

  async fn counted(
    layer: &CacheLayer<MemoryStorage>,
    key: &str,
    policy: ExpiryPolicy,
    calls: &AtomicU32,
    value: i32,
  ) -> Result<CacheResult<i32>, ResolveError> {
    layer
      .resolve(key, policy, || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value)
      })
      .await
  }

  #[tokio::test]
  async fn test_second_resolve_is_cache_hit() {
    let (layer, _, _) = layer_at("2024-01-15T10:00:00+00:00");
    let calls = AtomicU32::new(0);

    for policy in [ExpiryPolicy::minutes(5).unwrap(), ExpiryPolicy::CalendarDay] {
      calls.store(0, Ordering::SeqCst);
      let key = policy.describe();

      let first = counted(&layer, &key, policy, &calls, 1).await.unwrap();
      let second = counted(&layer, &key, policy, &calls, 2).await.unwrap();

      assert_eq!(calls.load(Ordering::SeqCst), 1);
      assert!(!first.is_cache_hit());
      assert!(second.is_cache_hit());
      assert_eq!(second.data, 1);
    }
  }

  #[tokio::test]
  async fn test_fixed_ttl_hit_before_and_miss_after_expiry() {
    let (layer, _, clock) = layer_at("2024-01-15T10:00:00+00:00");
    let calls = AtomicU32::new(0);
    let policy = ExpiryPolicy::minutes(5).unwrap();

    counted(&layer, "profile", policy, &calls, 1).await.unwrap();

    clock.set("2024-01-15T10:04:59+00:00");
    let hit = counted(&layer, "profile", policy, &calls, 2).await.unwrap();
    assert_eq!(hit.data, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    clock.set("2024-01-15T10:05:01+00:00");
    let miss = counted(&layer, "profile", policy, &calls, 3).await.unwrap();
    assert_eq!(miss.data, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_calendar_day_boundary() {
    let (layer, _, clock) = layer_at("2024-01-15T23:59:00+00:00");
    let calls = AtomicU32::new(0);
    let policy = ExpiryPolicy::CalendarDay;

    counted(&layer, "report", policy, &calls, 1).await.unwrap();

    // Same date, served from cache regardless of elapsed time
    clock.set("2024-01-15T08:00:00+00:00");
    let hit = counted(&layer, "report", policy, &calls, 2).await.unwrap();
    assert!(hit.is_cache_hit());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // One minute after midnight the next day
    clock.set("2024-01-16T00:01:00+00:00");
    let miss = counted(&layer, "report", policy, &calls, 3).await.unwrap();
    assert!(!miss.is_cache_hit());
    assert_eq!(miss.data, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_corrupt_entry_is_refetched_and_overwritten() {
    let (layer, storage, _) = layer_at("2024-01-15T10:00:00+00:00");
    let calls = AtomicU32::new(0);
    let policy = ExpiryPolicy::minutes(5).unwrap();

    counted(&layer, "users", policy, &calls, 1).await.unwrap();

    let raw = storage.get("users").unwrap().unwrap();
    storage.set("users", &raw[..raw.len() / 2]).unwrap();

    let result = counted(&layer, "users", policy, &calls, 2).await.unwrap();
    assert_eq!(result.data, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // The rewritten entry is valid again
    let raw = storage.get("users").unwrap().unwrap();
    let entry: CacheEntry<i32> = serde_json::from_str(&raw).unwrap();
    assert_eq!(entry.payload, 2);
  }

  #[tokio::test]
  async fn test_failed_fetch_leaves_existing_entry_untouched() {
    let (layer, storage, clock) = layer_at("2024-01-15T10:00:00+00:00");
    let calls = AtomicU32::new(0);
    let policy = ExpiryPolicy::minutes(5).unwrap();

    counted(&layer, "users", policy, &calls, 1).await.unwrap();
    let before = storage.get("users").unwrap();

    clock.advance(ChronoDuration::minutes(10));
    let err = layer
      .resolve::<i32, _, _>("users", policy, || async { Err(eyre!("connection refused")) })
      .await
      .unwrap_err();

    assert!(matches!(err, ResolveError::FetchFailed { ref key, .. } if key == "users"));
    assert!(err.to_string().contains("connection refused"));
    assert_eq!(storage.get("users").unwrap(), before);

    // Stale entry is still there, with its original timestamp
    let raw = storage.get("users").unwrap().unwrap();
    let entry: CacheEntry<i32> = serde_json::from_str(&raw).unwrap();
    assert_eq!(entry.stored_at.to_rfc3339(), "2024-01-15T10:00:00+00:00");
  }

  #[tokio::test]
  async fn test_failed_fetch_with_no_entry_writes_nothing() {
    let (layer, storage, _) = layer_at("2024-01-15T10:00:00+00:00");

    let result = layer
      .resolve::<i32, _, _>("users", ExpiryPolicy::CalendarDay, || async {
        Err(eyre!("500 Internal Server Error"))
      })
      .await;

    assert!(result.is_err());
    assert_eq!(storage.get("users").unwrap(), None);
  }

  #[tokio::test]
  async fn test_unavailable_store_always_fetches() {
    let layer = CacheLayer::new(Arc::new(NoopStorage));
    let calls = AtomicU32::new(0);

    for expected in 1..=2 {
      let result = layer
        .resolve("users", ExpiryPolicy::minutes(5).unwrap(), || async {
          calls.fetch_add(1, Ordering::SeqCst);
          Ok(expected)
        })
        .await
        .unwrap();
      assert_eq!(result.data, expected);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_parameterized_keys_do_not_collide() {
    let (layer, _, _) = layer_at("2024-01-15T10:00:00+00:00");
    let calls = AtomicU32::new(0);
    let policy = ExpiryPolicy::minutes(5).unwrap();

    counted(&layer, "user_profile:1", policy, &calls, 1).await.unwrap();
    counted(&layer, "user_profile:2", policy, &calls, 2).await.unwrap();

    let one = counted(&layer, "user_profile:1", policy, &calls, 99).await.unwrap();
    let two = counted(&layer, "user_profile:2", policy, &calls, 99).await.unwrap();

    assert_eq!(one.data, 1);
    assert_eq!(two.data, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_invalidate_forces_fetch() {
    let (layer, _, _) = layer_at("2024-01-15T10:00:00+00:00");
    let calls = AtomicU32::new(0);
    let policy = ExpiryPolicy::CalendarDay;

    counted(&layer, "users", policy, &calls, 1).await.unwrap();
    layer.invalidate("users");
    let result = counted(&layer, "users", policy, &calls, 2).await.unwrap();

    assert_eq!(result.data, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_fetch_timeout_reports_fetch_failed() {
    let (layer, storage, _) = layer_at("2024-01-15T10:00:00+00:00");
    let layer = layer.with_fetch_timeout(Duration::from_millis(10));

    let err = layer
      .resolve::<i32, _, _>("slow", ExpiryPolicy::minutes(1).unwrap(), || async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(1)
      })
      .await
      .unwrap_err();

    assert!(err.to_string().contains("timed out"));
    assert_eq!(storage.get("slow").unwrap(), None);
  }
}
