//! Where scraped activity comes from.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use leaderboard_core::{activity::Activity, contributor::Contributor};
use serde::Deserialize;

use crate::{Error, Result};

/// Everything one fetch produced.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScrapeBatch {
  #[serde(default)]
  pub contributors: Vec<Contributor>,
  #[serde(default)]
  pub activities:   Vec<Activity>,
}

/// A producer of contributor activity.
pub trait ActivitySource: Send + Sync {
  /// Used in log lines only.
  fn name(&self) -> &str;

  /// Activities that occurred at or after `since`, plus any contributor
  /// profiles the source knows about.
  fn fetch(&self, since: DateTime<Utc>) -> impl Future<Output = Result<ScrapeBatch>> + Send + '_;
}

/// A JSON document on disk shaped like [`ScrapeBatch`].
#[derive(Debug, Clone)]
pub struct FeedSource {
  path: PathBuf,
}

impl FeedSource {
  pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
}

impl ActivitySource for FeedSource {
  fn name(&self) -> &str { "feed" }

  async fn fetch(&self, since: DateTime<Utc>) -> Result<ScrapeBatch> {
    let body = tokio::fs::read_to_string(&self.path)
      .await
      .map_err(|source| Error::Feed { path: self.path.clone(), source })?;
    let mut batch: ScrapeBatch = serde_json::from_str(&body)?;

    let before = batch.activities.len();
    batch.activities.retain(|a| a.occurred_at >= since);
    tracing::debug!(
      feed = %self.path.display(),
      kept = batch.activities.len(),
      dropped = before - batch.activities.len(),
      "read feed"
    );
    Ok(batch)
  }
}
