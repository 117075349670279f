//! Tracing setup: a daily rolling log file, optionally mirrored to stderr.
//!
//! Stdout carries page output only, so logs never go there.

use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogConfig;

const LOG_ENV: &str = "ADMINCTL_LOG";
const DEFAULT_DIRECTIVE: &str = "adminctl=info";
const LOG_FILE_PREFIX: &str = "adminctl.log";

/// Install the global subscriber. Keep the returned guard alive until exit so
/// buffered lines are flushed.
pub fn init(config: &LogConfig, verbose: bool) -> Result<WorkerGuard> {
  let directory = log_directory(config)
    .ok_or_else(|| eyre!("Could not determine a log directory. Set log.directory in the config."))?;
  std::fs::create_dir_all(&directory)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", directory.display(), e))?;

  let appender = tracing_appender::rolling::daily(&directory, LOG_FILE_PREFIX);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

  let file_layer = fmt::layer().with_writer(writer).with_ansi(false);
  let stderr_layer = verbose.then(|| {
    fmt::layer()
      .with_writer(std::io::stderr)
      .with_target(false)
      .compact()
  });

  tracing_subscriber::registry()
    .with(filter)
    .with(file_layer)
    .with(stderr_layer)
    .try_init()?;

  Ok(guard)
}

/// `log.directory`, or `$XDG_DATA_HOME/adminctl/logs`.
fn log_directory(config: &LogConfig) -> Option<PathBuf> {
  config
    .directory
    .clone()
    .or_else(|| dirs::data_dir().map(|d| d.join("adminctl").join("logs")))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_explicit_directory_wins() {
    let config = LogConfig {
      directory: Some(PathBuf::from("/tmp/adminctl-logs")),
    };
    assert_eq!(log_directory(&config), Some(PathBuf::from("/tmp/adminctl-logs")));
  }

  #[test]
  fn test_default_directory_is_under_data_dir() {
    if let Some(dir) = log_directory(&LogConfig::default()) {
      assert!(dir.ends_with("adminctl/logs"));
    }
  }
}
