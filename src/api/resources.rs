//! Cache keys and expiry policies for the admin API's read endpoints.

use chrono::Duration;
use sha2::{Digest, Sha256};

use crate::cache::ExpiryPolicy;
use crate::config::CacheConfig;

/// One cacheable unit of server data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceKey {
  /// All users
  Users,
  /// Weekly summary shown on the dashboard
  WeeklyReport,
  /// Weekly AI performance metrics
  AiPerformance,
  /// Subscription dashboard figures
  SubscriptionDashboard,
  /// A single user's profile
  UserProfile { user_id: u64 },
  /// All point adjustments
  PointAdjustments,
}

impl ResourceKey {
  /// Human-readable identity, unique per resource and entity.
  pub fn canonical(&self) -> String {
    match self {
      Self::Users => "users".to_string(),
      Self::WeeklyReport => "weekly_report".to_string(),
      Self::AiPerformance => "ai_performance".to_string(),
      Self::SubscriptionDashboard => "subscription_dashboard".to_string(),
      Self::UserProfile { user_id } => format!("user_profile:{}", user_id),
      Self::PointAdjustments => "point_adjustments".to_string(),
    }
  }

  /// Key under which the entry is stored.
  pub fn storage_key(&self) -> String {
    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(self.canonical().as_bytes());
    format!("cache:{}", hex::encode(hasher.finalize()))
  }

  /// Reports regenerate once a day server-side; everything else can change
  /// within the day and uses a fixed TTL.
  pub fn policy(&self, config: &CacheConfig) -> ExpiryPolicy {
    match self {
      Self::WeeklyReport | Self::AiPerformance | Self::SubscriptionDashboard => {
        ExpiryPolicy::CalendarDay
      }
      Self::Users => fixed_ttl(config.users_ttl_minutes),
      Self::UserProfile { .. } => fixed_ttl(config.profile_ttl_minutes),
      Self::PointAdjustments => fixed_ttl(config.point_adjustments_ttl_minutes),
    }
  }

  pub fn description(&self) -> String {
    match self {
      Self::Users => "users".to_string(),
      Self::WeeklyReport => "weekly report".to_string(),
      Self::AiPerformance => "AI performance".to_string(),
      Self::SubscriptionDashboard => "subscription dashboard".to_string(),
      Self::UserProfile { user_id } => format!("profile of user {}", user_id),
      Self::PointAdjustments => "point adjustments".to_string(),
    }
  }
}

/// Out-of-range TTLs are rejected at config load. Should one get here, entries
/// are always stale.
fn fixed_ttl(minutes: i64) -> ExpiryPolicy {
  ExpiryPolicy::minutes(minutes).unwrap_or(ExpiryPolicy::FixedTtl(Duration::zero()))
}
