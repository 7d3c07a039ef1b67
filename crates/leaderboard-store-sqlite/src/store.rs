//! [`SqliteStore`], the SQLite implementation of [`LeaderboardStore`].

use std::path::Path;

use leaderboard_core::{
  activity::{Activity, ActivityDefinition, ActivityQuery},
  aggregate::{AggregateDefinition, ContributorAggregate, GlobalAggregate},
  badge::{BadgeDefinition, ContributorBadge, ContributorMetric},
  contributor::Contributor,
  merge::{ConflictPolicy, UpsertReport},
  store::LeaderboardStore,
};
use rusqlite::types::Value;

use crate::{
  Error, Result,
  encode::{
    RawActivity, RawBadgeDefinition, RawContributor, RawContributorAggregate,
    RawContributorBadge, RawGlobalAggregate, RawTotal, decode_dt, encode_dt,
  },
  schema::{DROP_ALL, SCHEMA},
};

/// Path sentinel selecting a transient in-memory database.
pub const IN_MEMORY: &str = ":memory:";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A leaderboard store backed by a single SQLite file.
///
/// Clones share one reference-counted connection. Open one
/// store per process and hand it to each pipeline stage.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  ///
  /// A path of [`IN_MEMORY`] opens a transient database instead.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    if path.as_ref() == Path::new(IN_MEMORY) {
      return Self::open_in_memory().await;
    }
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a transient in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Drop every table and recreate an empty schema.
  pub async fn reset(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(DROP_ALL)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("store reset");
    Ok(())
  }
}

// ─── Query building ──────────────────────────────────────────────────────────

/// Render `query` as a `WHERE` clause over the `activities` table plus its
/// positional parameters.
fn activity_filter(query: &ActivityQuery) -> (String, Vec<Value>) {
  let mut conds: Vec<String> = vec![];
  let mut params: Vec<Value> = vec![];

  if let Some(c) = &query.contributor {
    conds.push("contributor = ?".into());
    params.push(Value::Text(c.clone()));
  }
  if !query.kinds.is_empty() {
    let marks = vec!["?"; query.kinds.len()].join(", ");
    conds.push(format!("activity_definition IN ({marks})"));
    params.extend(query.kinds.iter().cloned().map(Value::Text));
  }
  if let Some(since) = query.since {
    conds.push("occurred_at >= ?".into());
    params.push(Value::Text(encode_dt(since)));
  }
  if let Some(until) = query.until {
    conds.push("occurred_at < ?".into());
    params.push(Value::Text(encode_dt(until)));
  }

  let clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };
  (clause, params)
}

// ─── LeaderboardStore impl ───────────────────────────────────────────────────

impl LeaderboardStore for SqliteStore {
  type Error = Error;

  // ── Contributors ──────────────────────────────────────────────────────────

  async fn upsert_contributors(&self, contributors: Vec<Contributor>) -> Result<UpsertReport> {
    self.upsert_default(contributors).await
  }

  async fn ensure_contributors(&self, usernames: Vec<String>) -> Result<UpsertReport> {
    let bare: Vec<Contributor> = usernames.into_iter().map(Contributor::new).collect();
    self.upsert_rows(bare, ConflictPolicy::Ignore).await
  }

  async fn list_contributors(&self) -> Result<Vec<Contributor>> {
    let raws: Vec<RawContributor> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT username, name, role, avatar_url, meta
           FROM contributors ORDER BY username",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawContributor {
              username:   row.get(0)?,
              name:       row.get(1)?,
              role:       row.get(2)?,
              avatar_url: row.get(3)?,
              meta:       row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContributor::into_contributor).collect()
  }

  // ── Activities ────────────────────────────────────────────────────────────

  async fn upsert_activity_definitions(
    &self,
    definitions: Vec<ActivityDefinition>,
  ) -> Result<UpsertReport> {
    self.upsert_default(definitions).await
  }

  async fn list_activity_definitions(&self) -> Result<Vec<ActivityDefinition>> {
    let defs = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT slug, name, description, points, icon
           FROM activity_definitions ORDER BY slug",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(ActivityDefinition {
              slug:        row.get(0)?,
              name:        row.get(1)?,
              description: row.get(2)?,
              points:      row.get(3)?,
              icon:        row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(defs)
  }

  async fn upsert_activities(&self, activities: Vec<Activity>) -> Result<UpsertReport> {
    self.upsert_default(activities).await
  }

  async fn list_activities(&self, query: &ActivityQuery) -> Result<Vec<Activity>> {
    let (where_clause, params) = activity_filter(query);

    let raws: Vec<RawActivity> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT slug, contributor, activity_definition, title, occurred_at,
                  link, text, points, meta
           FROM activities
           {where_clause}
           ORDER BY contributor, occurred_at, slug"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| {
            Ok(RawActivity {
              slug:                row.get(0)?,
              contributor:         row.get(1)?,
              activity_definition: row.get(2)?,
              title:               row.get(3)?,
              occurred_at:         row.get(4)?,
              link:                row.get(5)?,
              text:                row.get(6)?,
              points:              row.get(7)?,
              meta:                row.get(8)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawActivity::into_activity).collect()
  }

  async fn activity_totals(&self, query: &ActivityQuery) -> Result<Vec<ContributorMetric>> {
    let (where_clause, params) = activity_filter(query);

    let raws: Vec<RawTotal> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT contributor, COUNT(*), MIN(occurred_at)
           FROM activities
           {where_clause}
           GROUP BY contributor
           ORDER BY contributor"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| {
            Ok(RawTotal {
              contributor: row.get(0)?,
              count:       row.get(1)?,
              first:       row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|raw| -> Result<ContributorMetric> {
        Ok(ContributorMetric {
          contributor:    raw.contributor,
          count:          u64::try_from(raw.count).map_err(|_| Error::Count(raw.count))?,
          reference_date: decode_dt(&raw.first)?.date_naive(),
        })
      })
      .collect()
  }

  // ── Badges ────────────────────────────────────────────────────────────────

  async fn upsert_badge_definitions(
    &self,
    definitions: Vec<BadgeDefinition>,
  ) -> Result<UpsertReport> {
    self.upsert_default(definitions).await
  }

  async fn list_badge_definitions(&self) -> Result<Vec<BadgeDefinition>> {
    let raws: Vec<RawBadgeDefinition> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT slug, name, description, variants
           FROM badge_definitions ORDER BY slug",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawBadgeDefinition {
              slug:        row.get(0)?,
              name:        row.get(1)?,
              description: row.get(2)?,
              variants:    row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawBadgeDefinition::into_definition).collect()
  }

  async fn award_badges(&self, awards: Vec<ContributorBadge>) -> Result<UpsertReport> {
    self.upsert_default(awards).await
  }

  async fn list_contributor_badges(
    &self,
    contributor: Option<String>,
  ) -> Result<Vec<ContributorBadge>> {
    let raws: Vec<RawContributorBadge> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT slug, badge, contributor, variant, achieved_on, meta
           FROM contributor_badges
           WHERE ?1 IS NULL OR contributor = ?1
           ORDER BY slug",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![contributor], |row| {
            Ok(RawContributorBadge {
              slug:        row.get(0)?,
              badge:       row.get(1)?,
              contributor: row.get(2)?,
              variant:     row.get(3)?,
              achieved_on: row.get(4)?,
              meta:        row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContributorBadge::into_badge).collect()
  }

  // ── Aggregates ────────────────────────────────────────────────────────────

  async fn upsert_aggregate_definitions(
    &self,
    definitions: Vec<AggregateDefinition>,
  ) -> Result<UpsertReport> {
    self.upsert_default(definitions).await
  }

  async fn upsert_global_aggregates(
    &self,
    aggregates: Vec<GlobalAggregate>,
  ) -> Result<UpsertReport> {
    self.upsert_default(aggregates).await
  }

  async fn list_global_aggregates(&self) -> Result<Vec<GlobalAggregate>> {
    let raws: Vec<RawGlobalAggregate> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT slug, name, description, value, meta
           FROM global_aggregates ORDER BY slug",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawGlobalAggregate {
              slug:        row.get(0)?,
              name:        row.get(1)?,
              description: row.get(2)?,
              value:       row.get(3)?,
              meta:        row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawGlobalAggregate::into_aggregate).collect()
  }

  async fn delete_global_aggregate(&self, slug: String) -> Result<usize> {
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM global_aggregates WHERE slug = ?1",
          rusqlite::params![slug],
        )?)
      })
      .await?;
    Ok(deleted)
  }

  async fn upsert_contributor_aggregates(
    &self,
    aggregates: Vec<ContributorAggregate>,
  ) -> Result<UpsertReport> {
    self.upsert_default(aggregates).await
  }

  async fn delete_contributor_aggregates(
    &self,
    aggregate: String,
    keep: Vec<String>,
  ) -> Result<usize> {
    let keep = serde_json::to_string(&keep)?;
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM contributor_aggregates
           WHERE aggregate = ?1
             AND contributor NOT IN (SELECT value FROM json_each(?2))",
          rusqlite::params![aggregate, keep],
        )?)
      })
      .await?;
    tracing::debug!(deleted, "pruned contributor aggregates");
    Ok(deleted)
  }

  async fn list_contributor_aggregates(
    &self,
    aggregate: Option<String>,
  ) -> Result<Vec<ContributorAggregate>> {
    let raws: Vec<RawContributorAggregate> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT aggregate, contributor, value, meta
           FROM contributor_aggregates
           WHERE ?1 IS NULL OR aggregate = ?1
           ORDER BY aggregate, contributor",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![aggregate], |row| {
            Ok(RawContributorAggregate {
              aggregate:   row.get(0)?,
              contributor: row.get(1)?,
              value:       row.get(2)?,
              meta:        row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContributorAggregate::into_aggregate).collect()
  }
}
