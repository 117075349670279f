//! Serde types matching the admin API's requests and responses.
//!
//! Most payloads are cached as-is, so every type here round-trips through JSON.
//! Fields the dashboard can live without default instead of failing the parse.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Standard `{ "data": ... }` wrapper used by most endpoints.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
  pub data: T,
}

/// Lists come back either wrapped or bare depending on the endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
  Wrapped { data: Vec<T> },
  Bare(Vec<T>),
}

impl<T> ListResponse<T> {
  pub fn into_vec(self) -> Vec<T> {
    match self {
      ListResponse::Wrapped { data } => data,
      ListResponse::Bare(items) => items,
    }
  }
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
  pub email: &'a str,
  pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
  pub access_token: String,
  #[serde(default)]
  pub user: Value,
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: u64,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub is_blocked: bool,
  #[serde(default)]
  pub last_active_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
  pub user: ProfileUser,
  pub xp: Xp,
  pub ranking: Ranking,
  pub certificates: Option<u64>,
  pub meta: XpBreakdown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileUser {
  pub name: Option<String>,
  pub email: Option<String>,
  pub last_active_at: Option<String>,
  pub is_blocked: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Xp {
  pub total: Option<u64>,
  pub level: Option<u32>,
  pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ranking {
  pub global_rank: Option<u64>,
  pub total_users: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct XpBreakdown {
  pub solo_xp: Option<u64>,
  pub team_xp: Option<u64>,
  pub challenge_xp: Option<u64>,
  pub bonus_xp: Option<u64>,
}

/// Extract a profile from either `{success, data: {data: ...}}` or `{data: ...}`.
pub fn unwrap_profile(response: Value) -> Result<UserProfile> {
  let success = response
    .get("success")
    .and_then(Value::as_bool)
    .unwrap_or(false);
  let data = response.get("data");

  let profile = match data.and_then(|d| d.get("data")) {
    Some(inner) if success && !inner.is_null() => inner,
    _ => match data {
      Some(d) if !d.is_null() => d,
      _ => return Err(eyre!("Invalid response structure")),
    },
  };

  serde_json::from_value(profile.clone())
    .map_err(|e| eyre!("Failed to parse user profile: {}", e))
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReport {
  pub summary: ReportSummary,
  #[serde(default)]
  pub weekly: Vec<WeeklyPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportSummary {
  pub total_users: u64,
  pub ai_performance: f64,
  pub total_subscriptions: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeeklyPoint {
  pub date: String,
  pub active_users: u64,
  pub new_registrations: u64,
}

// ============================================================================
// Point adjustments
// ============================================================================

/// A point adjustment record. Only the id is interpreted; everything else is
/// carried through for display and editing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointAdjustment {
  pub id: u64,
  #[serde(flatten)]
  pub fields: serde_json::Map<String, Value>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_user_defaults_missing_fields() {
    let user: User = serde_json::from_value(json!({"id": 3, "name": "Ada"})).unwrap();
    assert_eq!(user.email, "");
    assert!(!user.is_blocked);
  }

  #[test]
  fn test_list_response_accepts_both_shapes() {
    let wrapped: ListResponse<u64> = serde_json::from_value(json!({"data": [1, 2]})).unwrap();
    let bare: ListResponse<u64> = serde_json::from_value(json!([3])).unwrap();
    assert_eq!(wrapped.into_vec(), vec![1, 2]);
    assert_eq!(bare.into_vec(), vec![3]);
  }

  #[test]
  fn test_unwrap_profile_nested() {
    let response = json!({
      "success": true,
      "data": {"data": {"user": {"name": "Ada Lovelace"}, "xp": {"total": 1200, "level": 4}}}
    });
    let profile = unwrap_profile(response).unwrap();
    assert_eq!(profile.user.name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(profile.xp.level, Some(4));
  }

  #[test]
  fn test_unwrap_profile_flat() {
    let response = json!({"data": {"certificates": 2, "ranking": {"globalRank": 9}}});
    let profile = unwrap_profile(response).unwrap();
    assert_eq!(profile.certificates, Some(2));
    assert_eq!(profile.ranking.global_rank, Some(9));
  }

  #[test]
  fn test_unwrap_profile_rejects_missing_data() {
    assert!(unwrap_profile(json!({"success": false})).is_err());
    assert!(unwrap_profile(json!({"data": null})).is_err());
  }

  #[test]
  fn test_weekly_report_parses_camel_case() {
    let report: WeeklyReport = serde_json::from_value(json!({
      "summary": {"totalUsers": 120, "aiPerformance": 95.5, "totalSubscriptions": 40},
      "weekly": [{"date": "2024-01-15", "activeUsers": 80, "newRegistrations": 5}]
    }))
    .unwrap();
    assert_eq!(report.summary.total_users, 120);
    assert_eq!(report.weekly[0].new_registrations, 5);
  }

  #[test]
  fn test_point_adjustment_keeps_unknown_fields() {
    let adjustment: PointAdjustment =
      serde_json::from_value(json!({"id": 1, "points": 50, "reason": "bonus"})).unwrap();
    assert_eq!(adjustment.fields["points"], 50);

    let back = serde_json::to_value(&adjustment).unwrap();
    assert_eq!(back, json!({"id": 1, "points": 50, "reason": "bonus"}));
  }
}
