//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so they sort
//! lexicographically; award dates as `YYYY-MM-DD`. Open metadata, badge
//! variants and aggregate values are stored as compact JSON.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use leaderboard_core::{
  activity::{Activity, ActivityDefinition},
  aggregate::{AggregateDefinition, AggregateValue, ContributorAggregate, GlobalAggregate},
  badge::{BadgeDefinition, ContributorBadge},
  contributor::Contributor,
};
use rusqlite::types::Value;

use crate::{Error, Result, upsert::SqlRow};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Nanos, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── JSON ────────────────────────────────────────────────────────────────────

pub fn encode_json(v: &impl serde::Serialize) -> Result<String> { Ok(serde_json::to_string(v)?) }

pub fn decode_json<T: serde::de::DeserializeOwned>(s: &str) -> Result<T> {
  Ok(serde_json::from_str(s)?)
}

fn encode_meta(meta: Option<serde_json::Value>) -> Result<Value> {
  Ok(opt_text(meta.map(|m| encode_json(&m)).transpose()?))
}

fn decode_meta(s: Option<String>) -> Result<Option<serde_json::Value>> {
  s.as_deref().map(decode_json).transpose()
}

// ─── Column values ───────────────────────────────────────────────────────────

fn text(s: String) -> Value { Value::Text(s) }

fn opt_text(s: Option<String>) -> Value { s.map_or(Value::Null, Value::Text) }

fn opt_int(n: Option<i64>) -> Value { n.map_or(Value::Null, Value::Integer) }

// ─── Row mappings ────────────────────────────────────────────────────────────

impl SqlRow for Contributor {
  const TABLE: &'static str = "contributors";
  const COLUMNS: &'static [&'static str] = &["username", "name", "role", "avatar_url", "meta"];
  const KEY: &'static [&'static str] = &["username"];

  fn into_values(self) -> Result<Vec<Value>> {
    Ok(vec![
      text(self.username),
      opt_text(self.name),
      opt_text(self.role),
      opt_text(self.avatar_url),
      encode_meta(self.meta)?,
    ])
  }
}

impl SqlRow for ActivityDefinition {
  const TABLE: &'static str = "activity_definitions";
  const COLUMNS: &'static [&'static str] = &["slug", "name", "description", "points", "icon"];
  const KEY: &'static [&'static str] = &["slug"];

  fn into_values(self) -> Result<Vec<Value>> {
    Ok(vec![
      text(self.slug),
      text(self.name),
      text(self.description),
      opt_int(self.points),
      opt_text(self.icon),
    ])
  }
}

impl SqlRow for Activity {
  const TABLE: &'static str = "activities";
  const COLUMNS: &'static [&'static str] = &[
    "slug",
    "contributor",
    "activity_definition",
    "title",
    "occurred_at",
    "link",
    "text",
    "points",
    "meta",
  ];
  const KEY: &'static [&'static str] = &["slug"];

  fn into_values(self) -> Result<Vec<Value>> {
    Ok(vec![
      text(self.slug),
      text(self.contributor),
      text(self.activity_definition),
      opt_text(self.title),
      text(encode_dt(self.occurred_at)),
      opt_text(self.link),
      opt_text(self.text),
      opt_int(self.points),
      encode_meta(self.meta)?,
    ])
  }
}

impl SqlRow for BadgeDefinition {
  const TABLE: &'static str = "badge_definitions";
  const COLUMNS: &'static [&'static str] = &["slug", "name", "description", "variants"];
  const KEY: &'static [&'static str] = &["slug"];

  fn into_values(self) -> Result<Vec<Value>> {
    Ok(vec![
      text(self.slug),
      text(self.name),
      text(self.description),
      text(encode_json(&self.variants)?),
    ])
  }
}

impl SqlRow for ContributorBadge {
  const TABLE: &'static str = "contributor_badges";
  const COLUMNS: &'static [&'static str] =
    &["slug", "badge", "contributor", "variant", "achieved_on", "meta"];
  const KEY: &'static [&'static str] = &["slug"];

  fn into_values(self) -> Result<Vec<Value>> {
    Ok(vec![
      text(self.slug),
      text(self.badge),
      text(self.contributor),
      text(self.variant),
      text(encode_date(self.achieved_on)),
      encode_meta(self.meta)?,
    ])
  }
}

impl SqlRow for AggregateDefinition {
  const TABLE: &'static str = "aggregate_definitions";
  const COLUMNS: &'static [&'static str] = &["slug", "name", "description"];
  const KEY: &'static [&'static str] = &["slug"];

  fn into_values(self) -> Result<Vec<Value>> {
    Ok(vec![text(self.slug), text(self.name), opt_text(self.description)])
  }
}

impl SqlRow for GlobalAggregate {
  const TABLE: &'static str = "global_aggregates";
  const COLUMNS: &'static [&'static str] = &["slug", "name", "description", "value", "meta"];
  const KEY: &'static [&'static str] = &["slug"];

  fn into_values(self) -> Result<Vec<Value>> {
    Ok(vec![
      text(self.slug),
      text(self.name),
      opt_text(self.description),
      text(encode_json(&self.value)?),
      encode_meta(self.meta)?,
    ])
  }
}

impl SqlRow for ContributorAggregate {
  const TABLE: &'static str = "contributor_aggregates";
  const COLUMNS: &'static [&'static str] = &["aggregate", "contributor", "value", "meta"];
  const KEY: &'static [&'static str] = &["aggregate", "contributor"];

  fn into_values(self) -> Result<Vec<Value>> {
    Ok(vec![
      text(self.aggregate),
      text(self.contributor),
      text(encode_json(&self.value)?),
      encode_meta(self.meta)?,
    ])
  }
}

// ─── Raw row types ───────────────────────────────────────────────────────────

/// Raw column values read from a `contributors` row.
pub struct RawContributor {
  pub username:   String,
  pub name:       Option<String>,
  pub role:       Option<String>,
  pub avatar_url: Option<String>,
  pub meta:       Option<String>,
}

impl RawContributor {
  pub fn into_contributor(self) -> Result<Contributor> {
    Ok(Contributor {
      username:   self.username,
      name:       self.name,
      role:       self.role,
      avatar_url: self.avatar_url,
      meta:       decode_meta(self.meta)?,
    })
  }
}

/// Raw column values read from an `activities` row.
pub struct RawActivity {
  pub slug:                String,
  pub contributor:         String,
  pub activity_definition: String,
  pub title:               Option<String>,
  pub occurred_at:         String,
  pub link:                Option<String>,
  pub text:                Option<String>,
  pub points:              Option<i64>,
  pub meta:                Option<String>,
}

impl RawActivity {
  pub fn into_activity(self) -> Result<Activity> {
    Ok(Activity {
      slug:                self.slug,
      contributor:         self.contributor,
      activity_definition: self.activity_definition,
      title:               self.title,
      occurred_at:         decode_dt(&self.occurred_at)?,
      link:                self.link,
      text:                self.text,
      points:              self.points,
      meta:                decode_meta(self.meta)?,
    })
  }
}

/// Raw column values read from a `badge_definitions` row.
pub struct RawBadgeDefinition {
  pub slug:        String,
  pub name:        String,
  pub description: String,
  pub variants:    String,
}

impl RawBadgeDefinition {
  pub fn into_definition(self) -> Result<BadgeDefinition> {
    Ok(BadgeDefinition {
      slug:        self.slug,
      name:        self.name,
      description: self.description,
      variants:    decode_json(&self.variants)?,
    })
  }
}

/// Raw column values read from a `contributor_badges` row.
pub struct RawContributorBadge {
  pub slug:        String,
  pub badge:       String,
  pub contributor: String,
  pub variant:     String,
  pub achieved_on: String,
  pub meta:        Option<String>,
}

impl RawContributorBadge {
  pub fn into_badge(self) -> Result<ContributorBadge> {
    Ok(ContributorBadge {
      slug:        self.slug,
      badge:       self.badge,
      contributor: self.contributor,
      variant:     self.variant,
      achieved_on: decode_date(&self.achieved_on)?,
      meta:        decode_meta(self.meta)?,
    })
  }
}

/// Raw column values read from a `global_aggregates` row.
pub struct RawGlobalAggregate {
  pub slug:        String,
  pub name:        String,
  pub description: Option<String>,
  pub value:       String,
  pub meta:        Option<String>,
}

impl RawGlobalAggregate {
  pub fn into_aggregate(self) -> Result<GlobalAggregate> {
    Ok(GlobalAggregate {
      slug:        self.slug,
      name:        self.name,
      description: self.description,
      value:       decode_json::<AggregateValue>(&self.value)?,
      meta:        decode_meta(self.meta)?,
    })
  }
}

/// Raw column values read from a `contributor_aggregates` row.
pub struct RawContributorAggregate {
  pub aggregate:   String,
  pub contributor: String,
  pub value:       String,
  pub meta:        Option<String>,
}

impl RawContributorAggregate {
  pub fn into_aggregate(self) -> Result<ContributorAggregate> {
    Ok(ContributorAggregate {
      aggregate:   self.aggregate,
      contributor: self.contributor,
      value:       decode_json::<AggregateValue>(&self.value)?,
      meta:        decode_meta(self.meta)?,
    })
  }
}

/// Raw `(contributor, count, first occurred_at)` from the totals query.
pub struct RawTotal {
  pub contributor: String,
  pub count:       i64,
  pub first:       String,
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_are_fixed_width_and_sortable() {
    let a = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let b = a + chrono::Duration::milliseconds(1);
    assert_eq!(encode_dt(a), "2024-01-01T09:00:00.000000000Z");
    assert!(encode_dt(a) < encode_dt(b));
    assert_eq!(decode_dt(&encode_dt(b)).unwrap(), b);
  }

  #[test]
  fn dates_use_iso_calendar_format() {
    let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    assert_eq!(encode_date(d), "2024-02-29");
    assert_eq!(decode_date("2024-02-29").unwrap(), d);
    assert!(decode_date("29/02/2024").is_err());
  }

  #[test]
  fn row_values_match_columns() {
    let c = Contributor::new("alice");
    assert_eq!(c.into_values().unwrap().len(), Contributor::COLUMNS.len());
  }
}
