use chrono::{DateTime, FixedOffset};
use std::fmt::Display;

use crate::cache::CacheSource;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display a value, or `N/A` when it is missing.
pub fn or_na<T: Display>(value: Option<T>) -> String {
  value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

/// Up to two uppercase initials, `U` when there is no name.
pub fn initials(name: Option<&str>) -> String {
  let initials: String = name
    .unwrap_or_default()
    .split_whitespace()
    .filter_map(|part| part.chars().next())
    .flat_map(char::to_uppercase)
    .take(2)
    .collect();

  if initials.is_empty() {
    "U".to_string()
  } else {
    initials
  }
}

/// Format an RFC3339 timestamp like `Jan 5, 2024 14:30`, or `N/A`.
pub fn format_date(value: Option<&str>) -> String {
  value
    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    .map_or_else(
      || "N/A".to_string(),
      |dt| dt.format("%b %-d, %Y %H:%M").to_string(),
    )
}

/// One line saying where the page's data came from.
pub fn source_line(
  source: CacheSource,
  stored_at: DateTime<FixedOffset>,
  now: DateTime<FixedOffset>,
) -> String {
  match source {
    CacheSource::Network => "fetched just now".to_string(),
    CacheSource::Cache => {
      let minutes = (now - stored_at).num_minutes().max(0);
      let age = match minutes {
        0 => "less than a minute ago".to_string(),
        1 => "1 minute ago".to_string(),
        m if m < 120 => format!("{} minutes ago", m),
        m => format!("{} hours ago", m / 60),
      };
      format!("cached {} ({})", age, stored_at.format("%Y-%m-%d %H:%M"))
    }
  }
}
