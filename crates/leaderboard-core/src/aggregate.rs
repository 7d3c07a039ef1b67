//! Aggregates: derived numeric summaries over activity metadata.
//!
//! Aggregates are derived state: every `prebuild` recomputes them from the
//! stored activities and overwrites whatever was there before.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::activity::{Activity, ActivityQuery};

// ─── Values ──────────────────────────────────────────────────────────────────

/// A typed aggregate payload, stored as `{"type": ..., "value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AggregateValue {
  Number(serde_json::Number),
}

impl AggregateValue {
  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Self::Number(n) => n.as_i64(),
    }
  }
}

impl From<i64> for AggregateValue {
  fn from(n: i64) -> Self { Self::Number(n.into()) }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A site-wide aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalAggregate {
  pub slug:        String,
  pub name:        String,
  pub description: Option<String>,
  pub value:       AggregateValue,
  pub meta:        Option<serde_json::Value>,
}

/// Describes a contributor-scoped aggregate family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateDefinition {
  pub slug:        String,
  pub name:        String,
  pub description: Option<String>,
}

/// One contributor's value for an aggregate family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributorAggregate {
  pub aggregate:   String,
  pub contributor: String,
  pub value:       AggregateValue,
  pub meta:        Option<serde_json::Value>,
}

// ─── Specs ───────────────────────────────────────────────────────────────────

/// How a list of values is reduced to one number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Statistic {
  /// Arithmetic mean, rounded half-up.
  Mean,
  /// Sum, rounded half-up.
  Sum,
  /// Number of values.
  Count,
}

impl Statistic {
  /// Reduce `values`; `None` when there is nothing to reduce.
  pub fn reduce(self, values: &[f64]) -> Option<i64> {
    if values.is_empty() {
      return None;
    }
    let sum: f64 = values.iter().sum();
    Some(match self {
      Self::Mean => round_half_up(sum / values.len() as f64),
      Self::Sum => round_half_up(sum),
      Self::Count => values.len() as i64,
    })
  }
}

/// Round to the nearest integer, ties towards positive infinity
/// (`2.5 -> 3`, `-2.5 -> -2`).
pub fn round_half_up(x: f64) -> i64 {
  // `(x + 0.5).floor()` would carry 0.49999999999999994 up to 1.
  let r = x.round();
  let r = if (r - x).abs() == 0.5 { x.ceil() } else { r };
  r as i64
}

/// What an aggregate measures and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSpec {
  pub slug:        String,
  pub name:        String,
  pub description: Option<String>,
  /// Activity kinds read; empty reads every kind.
  pub kinds:       Vec<String>,
  /// The `meta` key holding the numeric sample.
  pub field:       String,
  pub statistic:   Statistic,
  /// Only read activities from the last `window_days` days.
  pub window_days: Option<u32>,
}

impl AggregateSpec {
  /// The definition row for this spec's contributor-scoped values.
  pub fn definition(&self) -> AggregateDefinition {
    AggregateDefinition {
      slug:        self.slug.clone(),
      name:        self.name.clone(),
      description: self.description.clone(),
    }
  }

  /// The activity query this spec reads, relative to `now`.
  pub fn query(&self, now: chrono::DateTime<chrono::Utc>) -> ActivityQuery {
    ActivityQuery {
      kinds: self.kinds.clone(),
      since: self
        .window_days
        .map(|d| now - chrono::Duration::days(i64::from(d))),
      ..Default::default()
    }
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// The result of evaluating one [`AggregateSpec`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateOutcome {
  /// Absent when no activity carried a numeric sample.
  pub global:       Option<GlobalAggregate>,
  /// One entry per contributor with at least one sample, ordered by username.
  pub contributors: Vec<ContributorAggregate>,
}

impl AggregateOutcome {
  pub fn is_empty(&self) -> bool { self.global.is_none() && self.contributors.is_empty() }
}

/// Evaluate `spec` over `activities`.
///
/// Activities of other kinds, or without a numeric `spec.field` in their
/// metadata, are skipped; a non-numeric value is never read as zero. The
/// global value is computed over every individual sample, not over the
/// per-contributor results.
pub fn compute<'a, I>(spec: &AggregateSpec, activities: I) -> AggregateOutcome
where
  I: IntoIterator<Item = &'a Activity>,
{
  let mut by_contributor: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
  let mut all: Vec<f64> = Vec::new();

  for activity in activities {
    if !spec.kinds.is_empty()
      && !spec.kinds.iter().any(|k| *k == activity.activity_definition)
    {
      continue;
    }
    let Some(sample) = activity.meta_field(&spec.field).and_then(serde_json::Value::as_f64)
    else {
      continue;
    };
    by_contributor
      .entry(activity.contributor.as_str())
      .or_default()
      .push(sample);
    all.push(sample);
  }

  let contributors = by_contributor
    .into_iter()
    .filter_map(|(contributor, values)| {
      let value = spec.statistic.reduce(&values)?;
      Some(ContributorAggregate {
        aggregate:   spec.slug.clone(),
        contributor: contributor.to_owned(),
        value:       value.into(),
        meta:        Some(serde_json::json!({ "samples": values.len() })),
      })
    })
    .collect();

  let global = spec.statistic.reduce(&all).map(|value| GlobalAggregate {
    slug:        spec.slug.clone(),
    name:        spec.name.clone(),
    description: spec.description.clone(),
    value:       value.into(),
    meta:        Some(serde_json::json!({ "samples": all.len() })),
  });

  AggregateOutcome { global, contributors }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use serde_json::{Value, json};

  use super::*;

  fn spec(statistic: Statistic) -> AggregateSpec {
    AggregateSpec {
      slug: "avg_merge_time_hours".into(),
      name: "Average merge time".into(),
      description: None,
      kinds: vec!["pr_merged".into()],
      field: "merge_time_hours".into(),
      statistic,
      window_days: None,
    }
  }

  fn activity(contributor: &str, kind: &str, meta: Value) -> Activity {
    Activity {
      slug:                format!("{contributor}-{kind}-{meta}"),
      contributor:         contributor.into(),
      activity_definition: kind.into(),
      title:               None,
      occurred_at:         Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
      link:                None,
      text:                None,
      points:              None,
      meta:                Some(meta),
    }
  }

  fn merged(contributor: &str, hours: i64) -> Activity {
    activity(contributor, "pr_merged", json!({ "merge_time_hours": hours }))
  }

  #[test]
  fn rounding_is_half_up() {
    assert_eq!(round_half_up(2.5), 3);
    assert_eq!(round_half_up(2.4999), 2);
    assert_eq!(round_half_up(-2.5), -2);
    assert_eq!(round_half_up(-2.6), -3);
    assert_eq!(round_half_up(0.0), 0);
    assert_eq!(round_half_up(0.49999999999999994), 0);
    assert_eq!(round_half_up(-0.5), 0);
  }

  #[test]
  fn global_mean_uses_every_sample() {
    let activities = vec![merged("alice", 10), merged("bob", 20), merged("bob", 30)];
    let out = compute(&spec(Statistic::Mean), &activities);

    let global = out.global.unwrap();
    assert_eq!(global.value.as_i64(), Some(20));

    // alice = 10, bob = 25; the mean of means would be 18.
    let per: Vec<_> = out
      .contributors
      .iter()
      .map(|c| (c.contributor.as_str(), c.value.as_i64().unwrap()))
      .collect();
    assert_eq!(per, [("alice", 10), ("bob", 25)]);
  }

  #[test]
  fn mean_rounds_point_five_up() {
    let activities = vec![merged("alice", 2), merged("alice", 3)];
    let out = compute(&spec(Statistic::Mean), &activities);
    assert_eq!(out.global.unwrap().value.as_i64(), Some(3));
  }

  #[test]
  fn non_numeric_and_missing_fields_are_skipped() {
    let activities = vec![
      merged("alice", 10),
      activity("alice", "pr_merged", json!({ "merge_time_hours": "lots" })),
      activity("alice", "pr_merged", json!({ "merge_time_hours": null })),
      activity("bob", "pr_merged", json!({ "other": 1 })),
      activity("carol", "issue_opened", json!({ "merge_time_hours": 99 })),
    ];
    let out = compute(&spec(Statistic::Mean), &activities);

    assert_eq!(out.global.unwrap().value.as_i64(), Some(10));
    assert_eq!(out.contributors.len(), 1);
    assert_eq!(out.contributors[0].contributor, "alice");
  }

  #[test]
  fn no_samples_produces_nothing() {
    let activities = vec![activity("bob", "pr_merged", json!({}))];
    let out = compute(&spec(Statistic::Mean), &activities);
    assert!(out.is_empty());
    assert!(compute(&spec(Statistic::Sum), &[]).is_empty());
  }

  #[test]
  fn sum_and_count() {
    let activities = vec![merged("alice", 1), merged("alice", 2), merged("bob", 4)];
    let sum = compute(&spec(Statistic::Sum), &activities);
    assert_eq!(sum.global.unwrap().value.as_i64(), Some(7));

    let count = compute(&spec(Statistic::Count), &activities);
    assert_eq!(count.global.unwrap().value.as_i64(), Some(3));
    assert_eq!(count.contributors[0].value.as_i64(), Some(2));
  }

  #[test]
  fn value_serializes_as_tagged_number() {
    let v = AggregateValue::from(20);
    assert_eq!(serde_json::to_value(&v).unwrap(), json!({ "type": "number", "value": 20 }));
  }

  #[test]
  fn windowed_spec_builds_lower_bound() {
    let mut s = spec(Statistic::Sum);
    s.window_days = Some(30);
    let now = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
    let q = s.query(now);
    assert_eq!(q.since, Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()));
    assert_eq!(q.kinds, ["pr_merged"]);
  }
}
