//! Error types for `leaderboard-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("badge {badge:?} has no variant {variant:?}")]
  UnknownVariant { badge: String, variant: String },

  #[error("badge rule {0:?} has no matching definition")]
  UnknownBadge(String),

  #[error("username {0:?} is not safe to use as a file name")]
  UnsafeUsername(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
