//! Core types for the caching system.

use chrono::{DateTime, FixedOffset, Local};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};

/// Source of the current time.
///
/// Injected so that expiry decisions can be tested without sleeping.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock in the local offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
  }
}

/// What is written to the store for one key.
///
/// Writes always replace the whole entry. Older entries written as
/// `{"data": ..., "timestamp": <epoch millis>}` are still readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
  #[serde(alias = "data")]
  pub payload: T,
  #[serde(alias = "timestamp", deserialize_with = "deserialize_stored_at")]
  pub stored_at: DateTime<FixedOffset>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredAtRepr {
  Rfc3339(DateTime<FixedOffset>),
  EpochMillis(i64),
}

fn deserialize_stored_at<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
where
  D: Deserializer<'de>,
{
  match StoredAtRepr::deserialize(deserializer)? {
    StoredAtRepr::Rfc3339(dt) => Ok(dt),
    StoredAtRepr::EpochMillis(ms) => DateTime::from_timestamp_millis(ms)
      .map(|dt| dt.fixed_offset())
      .ok_or_else(|| D::Error::custom(format!("timestamp {} out of range", ms))),
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the served entry was written
  pub stored_at: DateTime<FixedOffset>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T, stored_at: DateTime<FixedOffset>) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      stored_at,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T, stored_at: DateTime<FixedOffset>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      stored_at,
    }
  }

  pub fn is_cache_hit(&self) -> bool {
    self.source == CacheSource::Cache
  }
}

/// Indicates where served data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fetched just now
  Network,
  /// Fresh entry from the store
  Cache,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_entry_serializes_payload_and_stored_at() {
    let stored_at = DateTime::parse_from_rfc3339("2024-01-15T10:00:00+00:00").unwrap();
    let entry = CacheEntry {
      payload: vec![1, 2, 3],
      stored_at,
    };

    let json = serde_json::to_string(&entry).unwrap();
    assert!(json.contains("\"payload\":[1,2,3]"));
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let written = value["storedAt"].as_str().unwrap();
    assert_eq!(DateTime::parse_from_rfc3339(written).unwrap(), stored_at);
  }

  #[test]
  fn test_entry_reads_legacy_browser_shape() {
    let json = r#"{"data": {"total": 7}, "timestamp": 1705312800000}"#;
    let entry: CacheEntry<serde_json::Value> = serde_json::from_str(json).unwrap();

    assert_eq!(entry.payload["total"], 7);
    assert_eq!(entry.stored_at.to_rfc3339(), "2024-01-15T10:00:00+00:00");
  }

  #[test]
  fn test_entry_without_timestamp_is_rejected() {
    let json = r#"{"payload": [1]}"#;
    assert!(serde_json::from_str::<CacheEntry<Vec<i32>>>(json).is_err());
  }
}
