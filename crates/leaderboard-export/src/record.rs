//! The on-disk shapes of exported records.
//!
//! The file format is read by static-site consumers and by older exports, so
//! it is kept apart from the domain types. Note the historical `occured_at`
//! spelling.

use chrono::{DateTime, NaiveDate, Utc};
use leaderboard_core::{activity::Activity, badge::ContributorBadge};
use serde::{Deserialize, Serialize};

/// One element of `activities/<contributor>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
  pub slug:                String,
  pub contributor:         String,
  pub activity_definition: String,
  pub title:               Option<String>,
  #[serde(rename = "occured_at")]
  pub occurred_at:         DateTime<Utc>,
  pub link:                Option<String>,
  pub text:                Option<String>,
  pub points:              Option<i64>,
  pub meta:                Option<serde_json::Value>,
}

impl From<Activity> for ActivityRecord {
  fn from(a: Activity) -> Self {
    Self {
      slug:                a.slug,
      contributor:         a.contributor,
      activity_definition: a.activity_definition,
      title:               a.title,
      occurred_at:         a.occurred_at,
      link:                a.link,
      text:                a.text,
      points:              a.points,
      meta:                a.meta,
    }
  }
}

impl From<ActivityRecord> for Activity {
  fn from(r: ActivityRecord) -> Self {
    Self {
      slug:                r.slug,
      contributor:         r.contributor,
      activity_definition: r.activity_definition,
      title:               r.title,
      occurred_at:         r.occurred_at,
      link:                r.link,
      text:                r.text,
      points:              r.points,
      meta:                r.meta,
    }
  }
}

/// One element of `badges/<contributor>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeRecord {
  pub slug:        String,
  pub badge:       String,
  pub contributor: String,
  pub variant:     String,
  /// Serialised as `YYYY-MM-DD`.
  pub achieved_on: NaiveDate,
  pub meta:        Option<serde_json::Value>,
}

impl From<ContributorBadge> for BadgeRecord {
  fn from(b: ContributorBadge) -> Self {
    Self {
      slug:        b.slug,
      badge:       b.badge,
      contributor: b.contributor,
      variant:     b.variant,
      achieved_on: b.achieved_on,
      meta:        b.meta,
    }
  }
}

impl From<BadgeRecord> for ContributorBadge {
  fn from(r: BadgeRecord) -> Self {
    Self {
      slug:        r.slug,
      badge:       r.badge,
      contributor: r.contributor,
      variant:     r.variant,
      achieved_on: r.achieved_on,
      meta:        r.meta,
    }
  }
}

/// Records that know which contributor file they belong in.
pub trait ByContributor {
  fn contributor(&self) -> &str;
}

impl ByContributor for ActivityRecord {
  fn contributor(&self) -> &str { &self.contributor }
}

impl ByContributor for BadgeRecord {
  fn contributor(&self) -> &str { &self.contributor }
}
