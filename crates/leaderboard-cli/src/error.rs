//! Error types for `leaderboard-cli`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to load configuration: {0}")]
  Config(#[from] config::ConfigError),

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("core error: {0}")]
  Core(#[from] leaderboard_core::Error),

  #[error("export error: {0}")]
  Export(#[from] leaderboard_export::Error),

  #[error("cannot read feed {}: {source}", .path.display())]
  Feed {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("malformed feed: {0}")]
  Json(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
