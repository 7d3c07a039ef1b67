//! The pipeline stages, one per CLI subcommand.
//!
//! Each stage takes the store by reference and runs its batches in sequence.
//! The first failing batch aborts the stage.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use leaderboard_core::{
  activity::ActivityQuery,
  aggregate::{self, AggregateSpec},
  badge::{self, BadgeDefinition, BadgeRule},
  catalog,
  store::LeaderboardStore,
};
use leaderboard_export::{DataLayout, ExportSummary, ImportSummary};

use crate::{Error, Result, source::ActivitySource};

// ─── prepare ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrepareSummary {
  pub activity_definitions:  usize,
  pub badge_definitions:     usize,
  pub aggregate_definitions: usize,
}

/// Register every catalog definition, updating any that already exist.
pub async fn prepare<S: LeaderboardStore>(store: &S) -> Result<PrepareSummary> {
  let activity_definitions = store
    .upsert_activity_definitions(catalog::activity_definitions())
    .await
    .map_err(Error::store)?
    .total();

  let badges = catalog::badge_definitions();
  for rule in catalog::badge_rules() {
    rule.validate(definition_for(&rule, &badges)?)?;
  }
  let badge_definitions = store
    .upsert_badge_definitions(badges)
    .await
    .map_err(Error::store)?
    .total();

  let aggregates = catalog::aggregate_specs()
    .iter()
    .map(AggregateSpec::definition)
    .collect();
  let aggregate_definitions = store
    .upsert_aggregate_definitions(aggregates)
    .await
    .map_err(Error::store)?
    .total();

  let summary = PrepareSummary {
    activity_definitions,
    badge_definitions,
    aggregate_definitions,
  };
  tracing::info!(?summary, "prepared definitions");
  Ok(summary)
}

fn definition_for<'a>(rule: &BadgeRule, definitions: &'a [BadgeDefinition]) -> Result<&'a BadgeDefinition> {
  definitions
    .iter()
    .find(|d| d.slug == rule.badge)
    .ok_or_else(|| leaderboard_core::Error::UnknownBadge(rule.badge.clone()).into())
}

// ─── scrape ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeSummary {
  pub contributors: usize,
  pub activities:   usize,
  /// Activities whose kind is not registered in the store.
  pub skipped:      usize,
}

/// Fetch the last `days` of activity from `source` and persist it.
pub async fn scrape<S, A>(store: &S, source: &A, now: DateTime<Utc>, days: u32) -> Result<ScrapeSummary>
where
  S: LeaderboardStore,
  A: ActivitySource,
{
  store
    .upsert_activity_definitions(catalog::activity_definitions())
    .await
    .map_err(Error::store)?;
  let known: BTreeSet<String> = store
    .list_activity_definitions()
    .await
    .map_err(Error::store)?
    .into_iter()
    .map(|d| d.slug)
    .collect();

  let since = now - Duration::days(i64::from(days));
  tracing::info!(source = source.name(), %since, "scraping");
  let batch = source.fetch(since).await?;

  let mut summary = ScrapeSummary::default();
  let (activities, unknown): (Vec<_>, Vec<_>) = batch
    .activities
    .into_iter()
    .partition(|a| known.contains(&a.activity_definition));
  for a in &unknown {
    tracing::warn!(
      slug = %a.slug,
      kind = %a.activity_definition,
      "skipping activity of unknown kind"
    );
  }
  summary.skipped = unknown.len();

  summary.contributors = store
    .upsert_contributors(batch.contributors)
    .await
    .map_err(Error::store)?
    .total();

  let owners: BTreeSet<&str> = activities.iter().map(|a| a.contributor.as_str()).collect();
  store
    .ensure_contributors(owners.into_iter().map(str::to_owned).collect())
    .await
    .map_err(Error::store)?;

  summary.activities = store
    .upsert_activities(activities)
    .await
    .map_err(Error::store)?
    .total();

  tracing::info!(source = source.name(), ?summary, "scraped");
  Ok(summary)
}

// ─── prebuild ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrebuildSummary {
  pub global_aggregates:      usize,
  pub contributor_aggregates: usize,
  /// Stored values removed because they no longer had samples.
  pub stale_aggregates:       usize,
  /// Awards evaluated this run, including ones already stored.
  pub awards_evaluated:       usize,
  /// Awards that were not stored before this run.
  pub awards_inserted:        usize,
}

/// Compute every catalog aggregate, then award every catalog badge.
///
/// Definitions must already be registered by [`prepare`]. Aggregates are
/// recomputed from scratch for the current window. Running this twice over
/// unchanged activity leaves the stored awards untouched.
pub async fn prebuild<S: LeaderboardStore>(store: &S, now: DateTime<Utc>) -> Result<PrebuildSummary> {
  let mut summary = PrebuildSummary::default();

  for spec in catalog::aggregate_specs() {
    let activities = store
      .list_activities(&spec.query(now))
      .await
      .map_err(Error::store)?;
    let outcome = aggregate::compute(&spec, &activities);

    // Each run replaces the whole family: values that fell out of the
    // window are removed, not left behind.
    let keep = outcome
      .contributors
      .iter()
      .map(|a| a.contributor.clone())
      .collect();
    summary.stale_aggregates += store
      .delete_contributor_aggregates(spec.slug.clone(), keep)
      .await
      .map_err(Error::store)?;

    match outcome.global {
      Some(global) => {
        summary.global_aggregates += store
          .upsert_global_aggregates(vec![global])
          .await
          .map_err(Error::store)?
          .total();
      }
      None => {
        tracing::info!(aggregate = %spec.slug, "no samples");
        summary.stale_aggregates += store
          .delete_global_aggregate(spec.slug.clone())
          .await
          .map_err(Error::store)?;
      }
    }
    summary.contributor_aggregates += store
      .upsert_contributor_aggregates(outcome.contributors)
      .await
      .map_err(Error::store)?
      .total();
  }

  let definitions = catalog::badge_definitions();
  for rule in catalog::badge_rules() {
    rule.validate(definition_for(&rule, &definitions)?)?;

    let query = ActivityQuery::kinds(rule.kinds.iter().cloned());
    let metrics = store.activity_totals(&query).await.map_err(Error::store)?;
    let awards = badge::evaluate(&rule.badge, &metrics, &rule.thresholds)?;
    summary.awards_evaluated += awards.len();

    let report = store.award_badges(awards).await.map_err(Error::store)?;
    tracing::info!(
      badge = %rule.badge,
      contributors = metrics.len(),
      inserted = report.total(),
      "awarded"
    );
    summary.awards_inserted += report.total();
  }

  tracing::info!(?summary, "prebuild finished");
  Ok(summary)
}

// ─── export / import ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportStageSummary {
  pub activities: ExportSummary,
  pub badges:     ExportSummary,
}

pub async fn export<S: LeaderboardStore>(store: &S, layout: &DataLayout) -> Result<ExportStageSummary> {
  let activities = leaderboard_export::export_activities(store, layout).await?;
  let badges = leaderboard_export::export_badges(store, layout).await?;
  Ok(ExportStageSummary { activities, badges })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStageSummary {
  pub activities: ImportSummary,
  pub badges:     ImportSummary,
}

/// Register activity definitions, then read activity and badge files.
///
/// Badge definitions are not registered here; run [`prepare`] first.
pub async fn import<S: LeaderboardStore>(store: &S, layout: &DataLayout) -> Result<ImportStageSummary> {
  store
    .upsert_activity_definitions(catalog::activity_definitions())
    .await
    .map_err(Error::store)?;
  let activities = leaderboard_export::import_activities(store, layout).await?;
  let badges = leaderboard_export::import_badges(store, layout).await?;
  Ok(ImportStageSummary { activities, badges })
}
