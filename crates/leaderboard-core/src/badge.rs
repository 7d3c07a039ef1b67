//! Badges: tiered achievement families and the engine that awards them.
//!
//! A [`BadgeDefinition`] describes a family and its variants. Which variant a
//! contributor earns is decided by a [`BadgeRule`]: an explicit threshold list
//! evaluated against per-contributor [`ContributorMetric`]s.
//!
//! Awards are immutable. Their slug, `{badge}__{contributor}__{variant}`, is
//! the idempotency key; stores insert awards with
//! [`ConflictPolicy::Ignore`](crate::merge::ConflictPolicy::Ignore), so every
//! run may re-assert every tier it finds without moving an existing award
//! date.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Definitions ─────────────────────────────────────────────────────────────

/// One tier within a badge family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeVariant {
  pub description: String,
  /// Path or URL of the tier's icon.
  pub svg_url:     String,
  /// Human-readable requirement, e.g. "10+ activities".
  pub requirement: Option<String>,
}

/// A named achievement family.
///
/// `variants` is keyed by variant id and carries no tier order; order comes
/// from the [`BadgeRule`] thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeDefinition {
  pub slug:        String,
  pub name:        String,
  pub description: String,
  pub variants:    BTreeMap<String, BadgeVariant>,
}

/// A badge granted to a contributor. Never updated after first insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributorBadge {
  pub slug:        String,
  pub badge:       String,
  pub contributor: String,
  pub variant:     String,
  pub achieved_on: NaiveDate,
  pub meta:        Option<serde_json::Value>,
}

/// The award slug. Changing this format orphans every award already stored.
pub fn award_slug(badge: &str, contributor: &str, variant: &str) -> String {
  format!("{badge}__{contributor}__{variant}")
}

// ─── Rules ───────────────────────────────────────────────────────────────────

/// A minimum metric value that earns `variant`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threshold {
  pub variant:  String,
  pub required: u64,
}

impl Threshold {
  pub fn new(variant: impl Into<String>, required: u64) -> Self {
    Self { variant: variant.into(), required }
  }
}

/// How a badge family is earned.
///
/// Thresholds are conventionally listed in ascending order, but the engine
/// never sorts them: each one is checked on its own, so an unsorted or
/// non-monotonic list can award non-adjacent tiers in the same pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeRule {
  pub badge:      String,
  /// Activity kinds that count towards the metric; empty counts every kind.
  pub kinds:      Vec<String>,
  pub thresholds: Vec<Threshold>,
}

impl BadgeRule {
  /// Ensure every threshold names a variant present in `definition`.
  pub fn validate(&self, definition: &BadgeDefinition) -> Result<()> {
    if definition.slug != self.badge {
      return Err(Error::UnknownBadge(self.badge.clone()));
    }
    for t in &self.thresholds {
      if !definition.variants.contains_key(&t.variant) {
        return Err(Error::UnknownVariant {
          badge:   self.badge.clone(),
          variant: t.variant.clone(),
        });
      }
    }
    Ok(())
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// The metric a badge rule is evaluated against, for one contributor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorMetric {
  pub contributor:    String,
  pub count:          u64,
  /// The date every award from this metric is dated with, typically the
  /// contributor's first matching activity.
  pub reference_date: NaiveDate,
}

/// Audit metadata stored on every automated award.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardMeta {
  pub metric_value: u64,
  pub threshold:    u64,
  pub awarded_by:   String,
}

/// Award every threshold each contributor meets.
///
/// `achieved_on` is the metric's reference date rather than today, so a run
/// months later produces byte-identical awards.
pub fn evaluate<'a, I>(
  badge: &str,
  metrics: I,
  thresholds: &[Threshold],
) -> Result<Vec<ContributorBadge>>
where
  I: IntoIterator<Item = &'a ContributorMetric>,
{
  let mut awards = Vec::new();

  for metric in metrics {
    for t in thresholds.iter().filter(|t| metric.count >= t.required) {
      let meta = AwardMeta {
        metric_value: metric.count,
        threshold:    t.required,
        awarded_by:   "automated".to_owned(),
      };
      awards.push(ContributorBadge {
        slug:        award_slug(badge, &metric.contributor, &t.variant),
        badge:       badge.to_owned(),
        contributor: metric.contributor.clone(),
        variant:     t.variant.clone(),
        achieved_on: metric.reference_date,
        meta:        Some(serde_json::to_value(meta)?),
      });
    }
  }

  Ok(awards)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn tiers() -> Vec<Threshold> {
    vec![
      Threshold::new("bronze", 10),
      Threshold::new("silver", 50),
      Threshold::new("gold", 100),
      Threshold::new("platinum", 500),
      Threshold::new("diamond", 1000),
    ]
  }

  fn metric(contributor: &str, count: u64) -> ContributorMetric {
    ContributorMetric {
      contributor:    contributor.into(),
      count,
      reference_date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
    }
  }

  fn variants(awards: &[ContributorBadge]) -> Vec<&str> {
    awards.iter().map(|a| a.variant.as_str()).collect()
  }

  #[test]
  fn awards_every_met_threshold() {
    let awards = evaluate("engagement_champion", &[metric("alice", 75)], &tiers()).unwrap();
    assert_eq!(variants(&awards), ["bronze", "silver"]);
  }

  #[test]
  fn threshold_is_inclusive() {
    let awards = evaluate("engagement_champion", &[metric("alice", 100)], &tiers()).unwrap();
    assert_eq!(variants(&awards), ["bronze", "silver", "gold"]);
  }

  #[test]
  fn award_fields_follow_the_metric() {
    let awards = evaluate("engagement_champion", &[metric("alice", 12)], &tiers()).unwrap();
    assert_eq!(awards.len(), 1);

    let a = &awards[0];
    assert_eq!(a.slug, "engagement_champion__alice__bronze");
    assert_eq!(a.badge, "engagement_champion");
    assert_eq!(a.contributor, "alice");
    assert_eq!(a.achieved_on, NaiveDate::from_ymd_opt(2023, 6, 1).unwrap());
    assert_eq!(
      a.meta,
      Some(json!({ "metricValue": 12, "threshold": 10, "awardedBy": "automated" }))
    );
  }

  #[test]
  fn unsorted_thresholds_are_evaluated_independently() {
    let thresholds = vec![
      Threshold::new("gold", 100),
      Threshold::new("bronze", 10),
      Threshold::new("odd", 500),
      Threshold::new("silver", 50),
    ];
    let awards = evaluate("b", &[metric("alice", 120)], &thresholds).unwrap();
    assert_eq!(variants(&awards), ["gold", "bronze", "silver"]);
  }

  #[test]
  fn no_metrics_or_no_qualifying_tiers_is_empty() {
    assert!(evaluate("b", &[], &tiers()).unwrap().is_empty());
    assert!(evaluate("b", &[metric("alice", 9)], &tiers()).unwrap().is_empty());
    assert!(evaluate("b", &[metric("alice", 9)], &[]).unwrap().is_empty());
  }

  #[test]
  fn each_contributor_is_evaluated_separately() {
    let awards =
      evaluate("b", &[metric("alice", 10), metric("bob", 60)], &tiers()).unwrap();
    let slugs: Vec<_> = awards.iter().map(|a| a.slug.as_str()).collect();
    assert_eq!(slugs, ["b__alice__bronze", "b__bob__bronze", "b__bob__silver"]);
  }

  #[test]
  fn rule_validation_rejects_unknown_variants() {
    let definition = BadgeDefinition {
      slug:        "b".into(),
      name:        "B".into(),
      description: String::new(),
      variants:    BTreeMap::from([(
        "bronze".to_owned(),
        BadgeVariant {
          description: String::new(),
          svg_url:     String::new(),
          requirement: None,
        },
      )]),
    };
    let mut rule = BadgeRule {
      badge:      "b".into(),
      kinds:      vec![],
      thresholds: vec![Threshold::new("bronze", 1)],
    };
    assert!(rule.validate(&definition).is_ok());

    rule.thresholds.push(Threshold::new("silver", 5));
    assert!(matches!(
      rule.validate(&definition),
      Err(Error::UnknownVariant { ref variant, .. }) if variant == "silver"
    ));
  }
}
