//! Activity types: the raw events the pipeline scrapes, stores and exports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered kind of activity, e.g. "pr_merged".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDefinition {
  pub slug:        String,
  pub name:        String,
  pub description: String,
  /// Default points awarded per activity of this kind.
  pub points:      Option<i64>,
  pub icon:        Option<String>,
}

/// A single recorded event attributable to one contributor.
///
/// `slug` is the merge key: re-ingesting the same slug overwrites the
/// descriptive fields but never creates a second record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
  pub slug:                String,
  pub contributor:         String,
  pub activity_definition: String,
  pub title:               Option<String>,
  pub occurred_at:         DateTime<Utc>,
  pub link:                Option<String>,
  pub text:                Option<String>,
  pub points:              Option<i64>,
  /// Kind-specific metrics, read by the aggregation engine.
  pub meta:                Option<serde_json::Value>,
}

impl Activity {
  /// Look up a key in the activity's metadata object.
  pub fn meta_field(&self, key: &str) -> Option<&serde_json::Value> {
    self.meta.as_ref()?.as_object()?.get(key)
  }
}

/// Parameters for [`crate::store::LeaderboardStore::list_activities`] and
/// [`crate::store::LeaderboardStore::activity_totals`].
#[derive(Debug, Clone, Default)]
pub struct ActivityQuery {
  pub contributor: Option<String>,
  /// Restrict to these activity definition slugs; empty matches every kind.
  pub kinds:       Vec<String>,
  /// Inclusive lower bound on `occurred_at`.
  pub since:       Option<DateTime<Utc>>,
  /// Exclusive upper bound on `occurred_at`.
  pub until:       Option<DateTime<Utc>>,
}

impl ActivityQuery {
  /// A query for the given activity kinds.
  pub fn kinds<I, S>(kinds: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      kinds: kinds.into_iter().map(Into::into).collect(),
      ..Default::default()
    }
  }

  /// In-memory equivalent of the store-side filter.
  pub fn matches(&self, activity: &Activity) -> bool {
    if let Some(c) = &self.contributor
      && *c != activity.contributor
    {
      return false;
    }
    if !self.kinds.is_empty()
      && !self.kinds.iter().any(|k| *k == activity.activity_definition)
    {
      return false;
    }
    if let Some(since) = self.since
      && activity.occurred_at < since
    {
      return false;
    }
    if let Some(until) = self.until
      && activity.occurred_at >= until
    {
      return false;
    }
    true
  }
}
