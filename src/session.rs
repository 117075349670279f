//! Admin session: credential storage, token decoding and the route guard.
//!
//! The guard runs once per protected page mount. It never refreshes or polls
//! the token, so a session that expires mid-command stays usable until the
//! next mount re-checks it.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::cache::KeyValueStore;

const ACCESS_TOKEN_KEY: &str = "accessToken";
const ADMIN_USER_KEY: &str = "adminUser";
const ADMIN_ROLE: &str = "admin";

/// Claims carried in the access token payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Claims {
  #[serde(rename = "sub", deserialize_with = "string_or_number")]
  pub subject_id: String,
  #[serde(default)]
  pub email: Option<String>,
  pub role: String,
  #[serde(default)]
  pub iat: Option<i64>,
  /// Expiry, seconds since the epoch
  #[serde(rename = "exp", deserialize_with = "numeric_date")]
  pub expires_at: i64,
}

impl Claims {
  pub fn is_admin(&self) -> bool {
    self.role == ADMIN_ROLE
  }

  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.expires_at <= now.timestamp()
  }

  pub fn expiry(&self) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(self.expires_at, 0)
  }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Id {
    Text(String),
    Number(i64),
  }

  Ok(match Id::deserialize(deserializer)? {
    Id::Text(s) => s,
    Id::Number(n) => n.to_string(),
  })
}

/// JWT NumericDate: whole or fractional seconds, truncated to whole seconds.
fn numeric_date<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Seconds {
    Whole(i64),
    Fractional(f64),
  }

  Ok(match Seconds::deserialize(deserializer)? {
    Seconds::Whole(n) => n,
    Seconds::Fractional(f) => f.floor() as i64,
  })
}

#[derive(Debug, Error)]
pub enum DecodeError {
  #[error("token is not a three-part JWT")]
  Malformed,
  #[error("token payload is not base64url: {0}")]
  Base64(#[from] base64::DecodeError),
  #[error("token payload is not valid claims JSON: {0}")]
  Claims(#[from] serde_json::Error),
}

/// Decode the claims of a JWT without verifying its signature.
///
/// The backend verifies signatures on every request; this only decides what
/// the client is willing to show.
pub fn decode_claims(token: &str) -> Result<Claims, DecodeError> {
  let mut parts = token.trim().split('.');
  let (Some(_header), Some(payload), Some(_signature), None) =
    (parts.next(), parts.next(), parts.next(), parts.next())
  else {
    return Err(DecodeError::Malformed);
  };

  if payload.is_empty() {
    return Err(DecodeError::Malformed);
  }

  let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
  Ok(serde_json::from_slice(&bytes)?)
}

/// Stored credentials, kept in the same key-value store as the cache.
pub struct CredentialStore<S: KeyValueStore + ?Sized> {
  storage: Arc<S>,
}

impl<S: KeyValueStore + ?Sized> CredentialStore<S> {
  pub fn new(storage: Arc<S>) -> Self {
    Self { storage }
  }

  /// The stored access token. An unreadable store reads as no token.
  pub fn token(&self) -> Option<String> {
    match self.storage.get(ACCESS_TOKEN_KEY) {
      Ok(token) => token.filter(|t| !t.trim().is_empty()),
      Err(e) => {
        warn!(error = %e, "credential store unreadable");
        None
      }
    }
  }

  /// The stored admin user record as raw JSON.
  pub fn user(&self) -> Option<String> {
    self
      .storage
      .get(ADMIN_USER_KEY)
      .ok()
      .flatten()
      .filter(|u| !u.trim().is_empty())
  }

  pub fn save(&self, token: &str, user_json: &str) -> color_eyre::Result<()> {
    self.storage.set(ACCESS_TOKEN_KEY, token)?;
    self.storage.set(ADMIN_USER_KEY, user_json)?;
    Ok(())
  }

  /// Remove both the token and the user record.
  pub fn clear(&self) {
    for key in [ACCESS_TOKEN_KEY, ADMIN_USER_KEY] {
      if let Err(e) = self.storage.remove(key) {
        warn!(key, error = %e, "failed to clear credential");
      }
    }
  }
}

/// Why a protected page was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
  /// No stored token
  NoToken,
  /// Token could not be decoded; credentials were cleared
  Malformed,
  /// Token belongs to a non-admin; credentials were cleared
  NotAdmin,
  /// Admin token past its expiry
  Expired,
}

impl DenyReason {
  /// Whether the caller should be sent to the login page.
  pub fn redirects_to_login(&self) -> bool {
    !matches!(self, DenyReason::NotAdmin)
  }

  pub fn message(&self) -> &'static str {
    match self {
      DenyReason::NoToken => "not signed in",
      DenyReason::Malformed => "stored session is invalid and was cleared",
      DenyReason::NotAdmin => "access denied: account is not an admin",
      DenyReason::Expired => "session expired",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
  Authorized(Claims),
  Unauthorized(DenyReason),
}

/// Decides whether the stored credential may view admin-only pages.
pub struct SessionGuard<S: KeyValueStore + ?Sized> {
  credentials: CredentialStore<S>,
}

impl<S: KeyValueStore + ?Sized> SessionGuard<S> {
  pub fn new(storage: Arc<S>) -> Self {
    Self {
      credentials: CredentialStore::new(storage),
    }
  }

  /// A session needs both the token and the admin user record.
  pub fn check(&self, now: DateTime<Utc>) -> GuardDecision {
    let (Some(token), Some(_user)) = (self.credentials.token(), self.credentials.user()) else {
      return GuardDecision::Unauthorized(DenyReason::NoToken);
    };

    let claims = match decode_claims(&token) {
      Ok(claims) => claims,
      Err(e) => {
        warn!(error = %e, "clearing undecodable access token");
        self.credentials.clear();
        return GuardDecision::Unauthorized(DenyReason::Malformed);
      }
    };

    if !claims.is_admin() {
      info!(subject = %claims.subject_id, role = %claims.role, "clearing non-admin session");
      self.credentials.clear();
      return GuardDecision::Unauthorized(DenyReason::NotAdmin);
    }

    if claims.is_expired(now) {
      return GuardDecision::Unauthorized(DenyReason::Expired);
    }

    GuardDecision::Authorized(claims)
  }
}
