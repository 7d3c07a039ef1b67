//! The built-in catalog: activity kinds, badge families and aggregates this
//! template ships with. Forks edit this file to describe their own project.

use std::collections::BTreeMap;

use crate::{
  activity::ActivityDefinition,
  aggregate::{AggregateSpec, Statistic},
  badge::{BadgeDefinition, BadgeRule, BadgeVariant, Threshold},
};

pub const PR_OPENED: &str = "pr_opened";
pub const PR_MERGED: &str = "pr_merged";
pub const ISSUE_OPENED: &str = "issue_opened";
pub const COMMENT_CREATED: &str = "comment_created";

pub fn activity_definitions() -> Vec<ActivityDefinition> {
  let def = |slug: &str, name: &str, description: &str, points: i64| ActivityDefinition {
    slug:        slug.to_owned(),
    name:        name.to_owned(),
    description: description.to_owned(),
    points:      Some(points),
    icon:        None,
  };

  vec![
    def(PR_OPENED, "PR opened", "Opened a pull request", 1),
    def(PR_MERGED, "PR merged", "Had a pull request merged", 7),
    def(ISSUE_OPENED, "Issue opened", "Opened an issue", 2),
    def(COMMENT_CREATED, "Comment", "Commented on an issue or pull request", 0),
  ]
}

// ─── Badges ──────────────────────────────────────────────────────────────────

pub const ENGAGEMENT_CHAMPION: &str = "engagement_champion";
pub const MERGE_MASTER: &str = "merge_master";

fn tiered(slug: &str, name: &str, description: &str, tiers: &[(&str, u64)]) -> BadgeDefinition {
  let variants = tiers
    .iter()
    .map(|(variant, required)| {
      (
        (*variant).to_owned(),
        BadgeVariant {
          description: format!("{name} ({variant})"),
          svg_url:     format!("/badges/{slug}/{variant}.svg"),
          requirement: Some(format!("{required}+")),
        },
      )
    })
    .collect::<BTreeMap<_, _>>();

  BadgeDefinition {
    slug: slug.to_owned(),
    name: name.to_owned(),
    description: description.to_owned(),
    variants,
  }
}

const ENGAGEMENT_TIERS: &[(&str, u64)] = &[
  ("bronze", 10),
  ("silver", 50),
  ("gold", 100),
  ("platinum", 500),
  ("diamond", 1000),
];

const MERGE_TIERS: &[(&str, u64)] = &[("bronze", 1), ("silver", 10), ("gold", 50)];

pub fn badge_definitions() -> Vec<BadgeDefinition> {
  vec![
    tiered(
      ENGAGEMENT_CHAMPION,
      "Engagement Champion",
      "Awarded for sustained activity of any kind",
      ENGAGEMENT_TIERS,
    ),
    tiered(
      MERGE_MASTER,
      "Merge Master",
      "Awarded for merged pull requests",
      MERGE_TIERS,
    ),
  ]
}

/// Threshold lists in ascending order, one rule per badge definition.
pub fn badge_rules() -> Vec<BadgeRule> {
  let thresholds = |tiers: &[(&str, u64)]| -> Vec<Threshold> {
    tiers
      .iter()
      .map(|(variant, required)| Threshold::new(*variant, *required))
      .collect()
  };

  vec![
    BadgeRule {
      badge:      ENGAGEMENT_CHAMPION.to_owned(),
      kinds:      vec![],
      thresholds: thresholds(ENGAGEMENT_TIERS),
    },
    BadgeRule {
      badge:      MERGE_MASTER.to_owned(),
      kinds:      vec![PR_MERGED.to_owned()],
      thresholds: thresholds(MERGE_TIERS),
    },
  ]
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

pub fn aggregate_specs() -> Vec<AggregateSpec> {
  vec![
    AggregateSpec {
      slug:        "avg_merge_time_hours".to_owned(),
      name:        "Average merge time".to_owned(),
      description: Some("Mean hours from opening to merge".to_owned()),
      kinds:       vec![PR_MERGED.to_owned()],
      field:       "merge_time_hours".to_owned(),
      statistic:   Statistic::Mean,
      window_days: None,
    },
    AggregateSpec {
      slug:        "lines_changed_30d".to_owned(),
      name:        "Lines changed (30 days)".to_owned(),
      description: Some("Lines changed by merged pull requests".to_owned()),
      kinds:       vec![PR_MERGED.to_owned()],
      field:       "lines_changed".to_owned(),
      statistic:   Statistic::Sum,
      window_days: Some(30),
    },
  ]
}
