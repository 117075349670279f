//! Cached admin client that wraps AdminClient with transparent caching.

use color_eyre::Result;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::future::Future;
use tracing::info;

use crate::cache::{CacheLayer, CacheResult, KeyValueStore};
use crate::config::CacheConfig;

use super::client::AdminClient;
use super::resources::ResourceKey;
use super::types::{PointAdjustment, User, UserProfile, WeeklyReport};

/// A write against the API, and the cached reads it makes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
  DeleteUser { user_id: u64 },
  ToggleBlock { user_id: u64 },
  PointAdjustment,
}

impl Mutation {
  pub fn invalidates(&self) -> Vec<ResourceKey> {
    match *self {
      Mutation::DeleteUser { user_id } => vec![
        ResourceKey::Users,
        ResourceKey::UserProfile { user_id },
        ResourceKey::WeeklyReport,
      ],
      Mutation::ToggleBlock { user_id } => {
        vec![ResourceKey::Users, ResourceKey::UserProfile { user_id }]
      }
      Mutation::PointAdjustment => vec![ResourceKey::PointAdjustments],
    }
  }
}

/// Admin client with transparent caching support.
///
/// Reads go through the cache layer with the resource's own expiry policy.
/// Writes are never cached; a successful write drops every entry it affects
/// so the next read refetches instead of patching cached data in place.
#[derive(Clone)]
pub struct CachedAdminClient {
  inner: AdminClient,
  cache: CacheLayer<dyn KeyValueStore>,
  config: CacheConfig,
}

impl CachedAdminClient {
  pub fn new(inner: AdminClient, cache: CacheLayer<dyn KeyValueStore>, config: CacheConfig) -> Self {
    Self {
      inner,
      cache,
      config,
    }
  }

  async fn read<T, F, Fut, E>(&self, key: ResourceKey, fetcher: F) -> Result<CacheResult<T>>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce(AdminClient) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
  {
    let inner = self.inner.clone();
    let result = self
      .cache
      .resolve(&key.storage_key(), key.policy(&self.config), || async move {
        Ok(fetcher(inner).await?)
      })
      .await?;
    Ok(result)
  }

  /// Drop the cached entry for one resource.
  pub fn invalidate(&self, key: &ResourceKey) {
    self.cache.invalidate(&key.storage_key());
  }

  fn invalidate_after(&self, mutation: Mutation) {
    for key in mutation.invalidates() {
      self.invalidate(&key);
    }
  }

  pub async fn get_users(&self) -> Result<CacheResult<Vec<User>>> {
    self
      .read(ResourceKey::Users, |api| async move { api.get_users().await })
      .await
  }

  pub async fn get_weekly_report(&self) -> Result<CacheResult<WeeklyReport>> {
    self
      .read(ResourceKey::WeeklyReport, |api| async move {
        api.get_weekly_report().await
      })
      .await
  }

  pub async fn get_ai_performance(&self) -> Result<CacheResult<Value>> {
    self
      .read(ResourceKey::AiPerformance, |api| async move {
        api.get_weekly_ai_performance().await
      })
      .await
  }

  pub async fn get_subscription_dashboard(&self) -> Result<CacheResult<Value>> {
    self
      .read(ResourceKey::SubscriptionDashboard, |api| async move {
        api.get_subscription_dashboard().await
      })
      .await
  }

  pub async fn get_user_profile(&self, user_id: u64) -> Result<CacheResult<UserProfile>> {
    self
      .read(ResourceKey::UserProfile { user_id }, |api| async move {
        api.get_user_profile(user_id).await
      })
      .await
  }

  pub async fn get_point_adjustments(&self) -> Result<CacheResult<Vec<PointAdjustment>>> {
    self
      .read(ResourceKey::PointAdjustments, |api| async move {
        api.get_point_adjustments().await
      })
      .await
  }

  /// Delete a user (not cached - write operation).
  pub async fn delete_user(&self, user_id: u64) -> Result<Value> {
    let response = self.inner.delete_user(user_id).await?;
    info!(user_id, "user deleted");
    self.invalidate_after(Mutation::DeleteUser { user_id });
    Ok(response)
  }

  /// Block or unblock a user (not cached - write operation).
  pub async fn toggle_block_user(&self, user_id: u64) -> Result<Value> {
    let response = self.inner.toggle_block_user(user_id).await?;
    info!(user_id, "user block status toggled");
    self.invalidate_after(Mutation::ToggleBlock { user_id });
    Ok(response)
  }

  pub async fn create_point_adjustment(&self, body: &Value) -> Result<Value> {
    let response = self.inner.create_point_adjustment(body).await?;
    info!("point adjustment created");
    self.invalidate_after(Mutation::PointAdjustment);
    Ok(response)
  }

  pub async fn update_point_adjustment(&self, id: u64, body: &Value) -> Result<Value> {
    let response = self.inner.update_point_adjustment(id, body).await?;
    info!(id, "point adjustment updated");
    self.invalidate_after(Mutation::PointAdjustment);
    Ok(response)
  }

  pub async fn delete_point_adjustment(&self, id: u64) -> Result<Value> {
    let response = self.inner.delete_point_adjustment(id).await?;
    info!(id, "point adjustment deleted");
    self.invalidate_after(Mutation::PointAdjustment);
    Ok(response)
  }

  /// Trigger the weekly email campaign (not cached, invalidates nothing).
  pub async fn trigger_weekly_email(&self) -> Result<Value> {
    let response = self.inner.trigger_weekly_email().await?;
    info!("weekly email triggered");
    Ok(response)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_toggle_block_invalidates_list_and_that_profile_only() {
    let keys = Mutation::ToggleBlock { user_id: 7 }.invalidates();

    assert!(keys.contains(&ResourceKey::Users));
    assert!(keys.contains(&ResourceKey::UserProfile { user_id: 7 }));
    assert!(!keys.contains(&ResourceKey::UserProfile { user_id: 8 }));
    assert!(!keys.contains(&ResourceKey::WeeklyReport));
  }

  #[test]
  fn test_delete_user_invalidates_report_counts() {
    let keys = Mutation::DeleteUser { user_id: 7 }.invalidates();
    assert!(keys.contains(&ResourceKey::WeeklyReport));
  }

  #[test]
  fn test_point_adjustment_invalidates_list() {
    assert_eq!(
      Mutation::PointAdjustment.invalidates(),
      vec![ResourceKey::PointAdjustments]
    );
  }
}
