//! The `LeaderboardStore` trait.
//!
//! Implemented by storage backends (e.g. `leaderboard-store-sqlite`). The
//! pipeline stages and the export layer depend on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use crate::{
  activity::{Activity, ActivityDefinition, ActivityQuery},
  aggregate::{AggregateDefinition, ContributorAggregate, GlobalAggregate},
  badge::{BadgeDefinition, ContributorBadge, ContributorMetric},
  contributor::Contributor,
  merge::UpsertReport,
};

/// Abstraction over a leaderboard store backend.
///
/// Every write is a batched upsert. Input is deduplicated and chunked as
/// described in [`crate::merge`]; chunks are written strictly in sequence and
/// the first failing chunk aborts the call. Conflicts are never errors: each
/// entity kind resolves them with its
/// [`ConflictPolicy`](crate::merge::ConflictPolicy).
pub trait LeaderboardStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Contributors ──────────────────────────────────────────────────────

  /// Insert or update full contributor profiles.
  fn upsert_contributors(
    &self,
    contributors: Vec<Contributor>,
  ) -> impl Future<Output = Result<UpsertReport, Self::Error>> + Send + '_;

  /// Register bare usernames, leaving existing profiles untouched.
  fn ensure_contributors(
    &self,
    usernames: Vec<String>,
  ) -> impl Future<Output = Result<UpsertReport, Self::Error>> + Send + '_;

  fn list_contributors(
    &self,
  ) -> impl Future<Output = Result<Vec<Contributor>, Self::Error>> + Send + '_;

  // ── Activities ────────────────────────────────────────────────────────

  fn upsert_activity_definitions(
    &self,
    definitions: Vec<ActivityDefinition>,
  ) -> impl Future<Output = Result<UpsertReport, Self::Error>> + Send + '_;

  fn list_activity_definitions(
    &self,
  ) -> impl Future<Output = Result<Vec<ActivityDefinition>, Self::Error>> + Send + '_;

  /// Insert or update activities keyed by slug. Contributors and activity
  /// definitions must already exist.
  fn upsert_activities(
    &self,
    activities: Vec<Activity>,
  ) -> impl Future<Output = Result<UpsertReport, Self::Error>> + Send + '_;

  /// Activities matching `query`, ordered by contributor, then `occurred_at`,
  /// then slug.
  fn list_activities<'a>(
    &'a self,
    query: &'a ActivityQuery,
  ) -> impl Future<Output = Result<Vec<Activity>, Self::Error>> + Send + 'a;

  /// Per-contributor activity count and first-activity date over activities
  /// matching `query`. Contributors without matches are omitted.
  fn activity_totals<'a>(
    &'a self,
    query: &'a ActivityQuery,
  ) -> impl Future<Output = Result<Vec<ContributorMetric>, Self::Error>> + Send + 'a;

  // ── Badges ────────────────────────────────────────────────────────────

  fn upsert_badge_definitions(
    &self,
    definitions: Vec<BadgeDefinition>,
  ) -> impl Future<Output = Result<UpsertReport, Self::Error>> + Send + '_;

  fn list_badge_definitions(
    &self,
  ) -> impl Future<Output = Result<Vec<BadgeDefinition>, Self::Error>> + Send + '_;

  /// Insert awards, ignoring any whose slug already exists. The affected
  /// count is the number of newly recorded awards.
  fn award_badges(
    &self,
    awards: Vec<ContributorBadge>,
  ) -> impl Future<Output = Result<UpsertReport, Self::Error>> + Send + '_;

  /// Awards, optionally for a single contributor, ordered by slug.
  fn list_contributor_badges(
    &self,
    contributor: Option<String>,
  ) -> impl Future<Output = Result<Vec<ContributorBadge>, Self::Error>> + Send + '_;

  // ── Aggregates ────────────────────────────────────────────────────────

  fn upsert_aggregate_definitions(
    &self,
    definitions: Vec<AggregateDefinition>,
  ) -> impl Future<Output = Result<UpsertReport, Self::Error>> + Send + '_;

  fn upsert_global_aggregates(
    &self,
    aggregates: Vec<GlobalAggregate>,
  ) -> impl Future<Output = Result<UpsertReport, Self::Error>> + Send + '_;

  fn list_global_aggregates(
    &self,
  ) -> impl Future<Output = Result<Vec<GlobalAggregate>, Self::Error>> + Send + '_;

  /// Remove the global value of `slug`; returns the number of rows deleted.
  fn delete_global_aggregate(
    &self,
    slug: String,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  fn upsert_contributor_aggregates(
    &self,
    aggregates: Vec<ContributorAggregate>,
  ) -> impl Future<Output = Result<UpsertReport, Self::Error>> + Send + '_;

  /// Remove every contributor value of `aggregate` whose contributor is not
  /// in `keep`; returns the number of rows deleted.
  fn delete_contributor_aggregates(
    &self,
    aggregate: String,
    keep: Vec<String>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Contributor aggregates, optionally for one aggregate family, ordered by
  /// aggregate then contributor.
  fn list_contributor_aggregates(
    &self,
    aggregate: Option<String>,
  ) -> impl Future<Output = Result<Vec<ContributorAggregate>, Self::Error>> + Send + '_;
}
