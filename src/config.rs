use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::{ExpiryPolicy, SqliteStorage};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the admin API, e.g. https://api.example.com/api
  #[serde(default)]
  pub base_url: String,
  /// Per-request timeout enforced by the HTTP client
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: String::new(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

fn default_timeout_secs() -> u64 {
  15
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// When false, every read goes to the network. Sessions are still stored.
  pub enabled: bool,
  /// Location of the key-value store (default: $XDG_DATA_HOME/adminctl/store.db)
  pub path: Option<PathBuf>,
  pub users_ttl_minutes: i64,
  pub profile_ttl_minutes: i64,
  pub point_adjustments_ttl_minutes: i64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      path: None,
      users_ttl_minutes: 10,
      profile_ttl_minutes: 5,
      point_adjustments_ttl_minutes: 1,
    }
  }
}

impl CacheConfig {
  pub fn store_path(&self) -> Option<PathBuf> {
    self.path.clone().or_else(SqliteStorage::default_path)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Directory for the rolling log file (default: $XDG_DATA_HOME/adminctl/logs)
  pub directory: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file, then apply environment overrides.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./adminctl.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/adminctl/config.yaml
  ///
  /// With no file found, defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(url) = std::env::var("ADMINCTL_API_URL") {
      config.api.base_url = url;
    }

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("adminctl.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("adminctl").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    Ok(serde_yaml::from_str(contents)?)
  }

  fn validate(&self) -> Result<()> {
    let ttls = [
      ("users_ttl_minutes", self.cache.users_ttl_minutes),
      ("profile_ttl_minutes", self.cache.profile_ttl_minutes),
      (
        "point_adjustments_ttl_minutes",
        self.cache.point_adjustments_ttl_minutes,
      ),
    ];
    for (name, minutes) in ttls {
      if minutes <= 0 {
        return Err(eyre!("cache.{} must be positive, got {}", name, minutes));
      }
      if ExpiryPolicy::minutes(minutes).is_none() {
        return Err(eyre!("cache.{} is out of range, got {}", name, minutes));
      }
    }

    if self.api.timeout_secs == 0 {
      return Err(eyre!("api.timeout_secs must be positive"));
    }

    Ok(())
  }

  /// The API settings, failing if no base URL was configured anywhere.
  pub fn require_api(&self) -> Result<&ApiConfig> {
    if self.api.base_url.trim().is_empty() {
      return Err(eyre!(
        "No API base URL configured. Set api.base_url in ~/.config/adminctl/config.yaml\n\
                 or the ADMINCTL_API_URL environment variable."
      ));
    }
    Ok(&self.api)
  }

  /// Get the login password from environment variables.
  ///
  /// Checks ADMINCTL_PASSWORD.
  pub fn get_password() -> Result<String> {
    std::env::var("ADMINCTL_PASSWORD").map_err(|_| {
      eyre!("Password not provided. Pass --password or set ADMINCTL_PASSWORD environment variable.")
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_yaml_uses_defaults() {
    let config = Config::from_yaml("{}").unwrap();
    assert_eq!(config.api.timeout_secs, 15);
    assert!(config.cache.enabled);
    assert_eq!(config.cache.users_ttl_minutes, 10);
    assert_eq!(config.cache.profile_ttl_minutes, 5);
  }

  #[test]
  fn test_partial_yaml_overrides() {
    let yaml = r#"
api:
  base_url: https://api.example.com
cache:
  enabled: false
  profile_ttl_minutes: 2
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.api.base_url, "https://api.example.com");
    assert_eq!(config.api.timeout_secs, 15);
    assert!(!config.cache.enabled);
    assert_eq!(config.cache.profile_ttl_minutes, 2);
    assert_eq!(config.cache.users_ttl_minutes, 10);
  }

  #[test]
  fn test_validate_rejects_zero_ttl() {
    let config = Config::from_yaml("cache:\n  users_ttl_minutes: 0\n").unwrap();
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_validate_rejects_huge_ttl() {
    let config =
      Config::from_yaml("cache:\n  profile_ttl_minutes: 9223372036854775807\n").unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("profile_ttl_minutes"));
  }

  #[test]
  fn test_require_api_needs_base_url() {
    let config = Config::default();
    assert!(config.require_api().is_err());
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    let result = Config::load(Some(Path::new("/definitely/not/here.yaml")));
    assert!(result.is_err());
  }
}
