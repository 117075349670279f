use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::api::types::{
  unwrap_profile, Envelope, ListResponse, LoginRequest, LoginResponse, PointAdjustment, User,
  UserProfile, WeeklyReport,
};
use crate::config::ApiConfig;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("invalid API base URL {url}: {reason}")]
  BaseUrl { url: String, reason: String },
  #[error("unauthorized (401)")]
  Unauthorized,
  #[error("{method} {path} returned {status}: {body}")]
  Status {
    method: Method,
    path: String,
    status: StatusCode,
    body: String,
  },
  #[error("request to {path} failed: {source}")]
  Transport {
    path: String,
    #[source]
    source: reqwest::Error,
  },
  #[error("unexpected response from {path}: {reason}")]
  InvalidResponse { path: String, reason: String },
}

/// Admin API client wrapper
#[derive(Clone)]
pub struct AdminClient {
  http: reqwest::Client,
  base_url: Url,
  token: Option<String>,
}

impl AdminClient {
  pub fn new(config: &ApiConfig, token: Option<String>) -> Result<Self, ApiError> {
    let base_url = parse_base_url(&config.base_url)?;

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| ApiError::Transport {
        path: base_url.to_string(),
        source: e,
      })?;

    Ok(Self {
      http,
      base_url,
      token,
    })
  }

  fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
    self
      .base_url
      .join(path.trim_start_matches('/'))
      .map_err(|e| ApiError::BaseUrl {
        url: format!("{}{}", self.base_url, path),
        reason: e.to_string(),
      })
  }

  fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
    let url = self.endpoint(path)?;
    let builder = self.http.request(method, url);
    Ok(match &self.token {
      Some(token) => builder.bearer_auth(token),
      None => builder,
    })
  }

  async fn send<T: DeserializeOwned>(
    &self,
    method: Method,
    path: &str,
    body: Option<&Value>,
  ) -> Result<T, ApiError> {
    let mut builder = self.request(method.clone(), path)?;
    if let Some(body) = body {
      builder = builder.json(body);
    }

    debug!(%method, path, "api request");
    let response = builder.send().await.map_err(|e| ApiError::Transport {
      path: path.to_string(),
      source: e,
    })?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
      return Err(ApiError::Unauthorized);
    }
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(ApiError::Status {
        method,
        path: path.to_string(),
        status,
        body,
      });
    }

    response.json().await.map_err(|e| ApiError::InvalidResponse {
      path: path.to_string(),
      reason: e.to_string(),
    })
  }

  /// Exchange credentials for an access token
  pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
    let body = serde_json::to_value(LoginRequest { email, password }).map_err(|e| {
      ApiError::InvalidResponse {
        path: "/auth/login".to_string(),
        reason: e.to_string(),
      }
    })?;
    self.send(Method::POST, "/auth/login", Some(&body)).await
  }

  pub async fn get_users(&self) -> Result<Vec<User>, ApiError> {
    let response: Envelope<Vec<User>> = self.send(Method::GET, "/users", None).await?;
    Ok(response.data)
  }

  pub async fn delete_user(&self, id: u64) -> Result<Value, ApiError> {
    self
      .send(Method::DELETE, &format!("/users/{}", id), None)
      .await
  }

  /// Flip a user's blocked flag
  pub async fn toggle_block_user(&self, id: u64) -> Result<Value, ApiError> {
    self
      .send(Method::PATCH, &format!("/users/block-toggle/{}", id), None)
      .await
  }

  pub async fn get_user_profile(&self, id: u64) -> Result<UserProfile, ApiError> {
    let path = format!("/users/{}/profile", id);
    let response: Value = self.send(Method::GET, &path, None).await?;
    unwrap_profile(response).map_err(|e| ApiError::InvalidResponse {
      path,
      reason: e.to_string(),
    })
  }

  /// Kick off the weekly email campaign
  pub async fn trigger_weekly_email(&self) -> Result<Value, ApiError> {
    self.send(Method::POST, "/mail/trigger-weekly", None).await
  }

  pub async fn get_weekly_report(&self) -> Result<WeeklyReport, ApiError> {
    let response: Envelope<WeeklyReport> =
      self.send(Method::GET, "/users/weekly-report", None).await?;
    Ok(response.data)
  }

  pub async fn get_weekly_ai_performance(&self) -> Result<Value, ApiError> {
    self
      .send(Method::GET, "/users/ai-performance/weekly", None)
      .await
  }

  pub async fn get_subscription_dashboard(&self) -> Result<Value, ApiError> {
    self
      .send(Method::GET, "/subscriptions/dashboard", None)
      .await
  }

  pub async fn get_point_adjustments(&self) -> Result<Vec<PointAdjustment>, ApiError> {
    let response: ListResponse<PointAdjustment> = self
      .send(Method::GET, "/admin/point-adjustment", None)
      .await?;
    Ok(response.into_vec())
  }

  pub async fn create_point_adjustment(&self, body: &Value) -> Result<Value, ApiError> {
    self
      .send(Method::POST, "/admin/point-adjustment", Some(body))
      .await
  }

  pub async fn update_point_adjustment(&self, id: u64, body: &Value) -> Result<Value, ApiError> {
    self
      .send(
        Method::PATCH,
        &format!("/admin/point-adjustment/{}", id),
        Some(body),
      )
      .await
  }

  pub async fn delete_point_adjustment(&self, id: u64) -> Result<Value, ApiError> {
    self
      .send(
        Method::DELETE,
        &format!("/admin/point-adjustment/{}", id),
        None,
      )
      .await
  }
}

/// Parse the configured base URL so that relative joins keep its path.
fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
  let trimmed = raw.trim();
  let with_slash = if trimmed.ends_with('/') {
    trimmed.to_string()
  } else {
    format!("{}/", trimmed)
  };

  let url = Url::parse(&with_slash).map_err(|e| ApiError::BaseUrl {
    url: raw.to_string(),
    reason: e.to_string(),
  })?;

  if !matches!(url.scheme(), "http" | "https") {
    return Err(ApiError::BaseUrl {
      url: raw.to_string(),
      reason: format!("unsupported scheme {}", url.scheme()),
    });
  }

  Ok(url)
}
