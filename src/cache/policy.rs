//! Expiry policies deciding whether a stored entry may be served.

use chrono::{DateTime, Duration, FixedOffset};

/// Staleness rule for one resource.
///
/// Every cached resource declares exactly one policy; there is no "never
/// expires" variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryPolicy {
  /// Fresh while less than the duration has elapsed since the entry was stored.
  FixedTtl(Duration),
  /// Fresh while the entry was stored on the same calendar day as `now`,
  /// compared in `now`'s offset. Elapsed time is irrelevant.
  CalendarDay,
}

impl ExpiryPolicy {
  /// A fixed TTL of `minutes`, or `None` when it does not fit a `Duration`.
  pub fn minutes(minutes: i64) -> Option<Self> {
    Duration::try_minutes(minutes).map(ExpiryPolicy::FixedTtl)
  }

  /// Check whether an entry stored at `stored_at` may be served at `now`.
  pub fn is_fresh(&self, stored_at: DateTime<FixedOffset>, now: DateTime<FixedOffset>) -> bool {
    match self {
      ExpiryPolicy::FixedTtl(ttl) => now - stored_at < *ttl,
      ExpiryPolicy::CalendarDay => {
        stored_at.with_timezone(now.offset()).date_naive() == now.date_naive()
      }
    }
  }

  /// Short label for logs.
  pub fn describe(&self) -> String {
    match self {
      ExpiryPolicy::FixedTtl(ttl) => format!("ttl {}s", ttl.num_seconds()),
      ExpiryPolicy::CalendarDay => "calendar day".to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn at(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
  }

  #[test]
  fn test_fixed_ttl_boundary() {
    let policy = ExpiryPolicy::minutes(5).unwrap();
    let stored = at("2024-01-15T10:00:00+00:00");

    assert!(policy.is_fresh(stored, at("2024-01-15T10:04:59+00:00")));
    assert!(!policy.is_fresh(stored, at("2024-01-15T10:05:01+00:00")));
    // Exactly at the boundary the entry is no longer fresh
    assert!(!policy.is_fresh(stored, at("2024-01-15T10:05:00+00:00")));
  }

  #[test]
  fn test_fixed_ttl_zero_elapsed_is_fresh() {
    let policy = ExpiryPolicy::minutes(1).unwrap();
    let stored = at("2024-01-15T10:00:00+00:00");
    assert!(policy.is_fresh(stored, stored));
  }

  #[test]
  fn test_calendar_day_crosses_midnight() {
    let policy = ExpiryPolicy::CalendarDay;
    let stored = at("2024-01-15T23:59:00+00:00");

    assert!(!policy.is_fresh(stored, at("2024-01-16T00:01:00+00:00")));
  }

  #[test]
  fn test_calendar_day_ignores_elapsed_time() {
    let policy = ExpiryPolicy::CalendarDay;
    let stored = at("2024-01-15T00:05:00+00:00");

    // Nearly a full day later, still the same date
    assert!(policy.is_fresh(stored, at("2024-01-15T23:50:00+00:00")));
    // A ten minute TTL would have rejected this
    assert!(!ExpiryPolicy::minutes(10).unwrap().is_fresh(stored, at("2024-01-15T23:50:00+00:00")));
  }

  #[test]
  fn test_calendar_day_uses_callers_offset() {
    let policy = ExpiryPolicy::CalendarDay;
    // 23:30 UTC on the 15th is 01:30 on the 16th at +02:00
    let stored = at("2024-01-15T23:30:00+00:00");

    assert!(policy.is_fresh(stored, at("2024-01-16T08:00:00+02:00")));
    assert!(!policy.is_fresh(stored, at("2024-01-16T08:00:00+00:00")));
  }

  #[test]
  fn test_minutes_out_of_range() {
    assert_eq!(ExpiryPolicy::minutes(i64::MAX), None);
    assert_eq!(ExpiryPolicy::minutes(i64::MIN), None);
    assert_eq!(
      ExpiryPolicy::minutes(90),
      Some(ExpiryPolicy::FixedTtl(Duration::minutes(90)))
    );
  }
}
