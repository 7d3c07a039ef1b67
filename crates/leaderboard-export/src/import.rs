//! Files -> store.
//!
//! A missing directory means there is nothing to import. Unreadable JSON,
//! records that fail to parse and records naming an unregistered activity
//! kind or badge are skipped with a warning; the rest of the directory is
//! still imported. I/O and store failures abort.

use std::{
  collections::BTreeSet,
  path::{Path, PathBuf},
};

use leaderboard_core::{
  activity::Activity, badge::ContributorBadge, merge::UpsertReport, store::LeaderboardStore,
};
use serde::de::DeserializeOwned;

use crate::{
  Error, Result,
  layout::{DataLayout, RecordKind},
  record::{ActivityRecord, BadgeRecord, ByContributor},
};

/// What one import call read and persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
  pub files:           usize,
  pub records:         usize,
  pub skipped_files:   usize,
  pub skipped_records: usize,
  /// Rows affected by the final upsert; `None` when nothing was read.
  pub affected:        Option<usize>,
}

/// Read `activities/*.json` and upsert every activity (update on conflict).
///
/// Referenced contributors are registered first. Activities of a kind the
/// store does not know are skipped.
pub async fn import_activities<S>(store: &S, layout: &DataLayout) -> Result<ImportSummary>
where
  S: LeaderboardStore,
{
  let (records, mut summary) =
    read_records::<ActivityRecord>(&layout.dir(RecordKind::Activities)).await?;
  if records.is_empty() {
    return Ok(summary);
  }

  let known: BTreeSet<String> = store
    .list_activity_definitions()
    .await
    .map_err(Error::store)?
    .into_iter()
    .map(|d| d.slug)
    .collect();
  let records = retain_registered(records, &known, &mut summary, |r| r.activity_definition.as_str());
  if records.is_empty() {
    return Ok(summary);
  }

  ensure_owners(store, &records).await?;
  let activities: Vec<Activity> = records.into_iter().map(Activity::from).collect();
  let report = store.upsert_activities(activities).await.map_err(Error::store)?;

  summary.affected = Some(report_total(RecordKind::Activities, &report));
  Ok(summary)
}

/// Read `badges/*.json` and record every award not already present.
///
/// Existing awards keep their stored date and metadata. Awards of a badge
/// the store does not know are skipped.
pub async fn import_badges<S>(store: &S, layout: &DataLayout) -> Result<ImportSummary>
where
  S: LeaderboardStore,
{
  let (records, mut summary) =
    read_records::<BadgeRecord>(&layout.dir(RecordKind::Badges)).await?;
  if records.is_empty() {
    return Ok(summary);
  }

  let known: BTreeSet<String> = store
    .list_badge_definitions()
    .await
    .map_err(Error::store)?
    .into_iter()
    .map(|d| d.slug)
    .collect();
  let records = retain_registered(records, &known, &mut summary, |r| r.badge.as_str());
  if records.is_empty() {
    return Ok(summary);
  }

  ensure_owners(store, &records).await?;
  let awards: Vec<ContributorBadge> = records.into_iter().map(ContributorBadge::from).collect();
  let report = store.award_badges(awards).await.map_err(Error::store)?;

  summary.affected = Some(report_total(RecordKind::Badges, &report));
  Ok(summary)
}

/// Drop records whose `slug_of` is not in `known`.
fn retain_registered<R, F>(
  records: Vec<R>,
  known: &BTreeSet<String>,
  summary: &mut ImportSummary,
  slug_of: F,
) -> Vec<R>
where
  R: ByContributor,
  F: Fn(&R) -> &str,
{
  let (kept, unknown): (Vec<R>, Vec<R>) = records
    .into_iter()
    .partition(|r| known.contains(slug_of(r)));
  for record in &unknown {
    tracing::warn!(
      contributor = record.contributor(),
      unregistered = slug_of(record),
      "skipping record"
    );
  }
  summary.records -= unknown.len();
  summary.skipped_records += unknown.len();
  kept
}

async fn ensure_owners<S, R>(store: &S, records: &[R]) -> Result<()>
where
  S: LeaderboardStore,
  R: ByContributor,
{
  let usernames: BTreeSet<&str> = records.iter().map(ByContributor::contributor).collect();
  let usernames = usernames.into_iter().map(str::to_owned).collect();
  store
    .ensure_contributors(usernames)
    .await
    .map_err(Error::store)?;
  Ok(())
}

fn report_total(kind: RecordKind, report: &UpsertReport) -> usize {
  tracing::info!(
    %kind,
    policy = %report.policy,
    chunks = report.chunks(),
    affected = report.total(),
    "imported"
  );
  report.total()
}

/// Every `*.json` file directly under `dir`, sorted by name.
async fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
  let mut entries = tokio::fs::read_dir(dir).await.map_err(Error::io(dir))?;
  let mut files = Vec::new();
  while let Some(entry) = entries.next_entry().await.map_err(Error::io(dir))? {
    let path = entry.path();
    if path.extension().is_some_and(|ext| ext == "json") {
      files.push(path);
    }
  }
  files.sort();
  Ok(files)
}

/// Parse every record in `dir`, skipping what cannot be parsed.
async fn read_records<T>(dir: &Path) -> Result<(Vec<T>, ImportSummary)>
where
  T: DeserializeOwned,
{
  let mut summary = ImportSummary::default();
  let mut records = Vec::new();

  let exists = tokio::fs::try_exists(dir).await.map_err(Error::io(dir))?;
  if !exists {
    tracing::info!(dir = %dir.display(), "directory not found, nothing to import");
    return Ok((records, summary));
  }

  for path in json_files(dir).await? {
    let body = tokio::fs::read_to_string(&path)
      .await
      .map_err(Error::io(&path))?;

    let items = match serde_json::from_str::<serde_json::Value>(&body) {
      Ok(serde_json::Value::Array(items)) => items,
      Ok(_) => {
        tracing::warn!(file = %path.display(), "expected a JSON array, skipping file");
        summary.skipped_files += 1;
        continue;
      }
      Err(e) => {
        tracing::warn!(file = %path.display(), error = %e, "invalid JSON, skipping file");
        summary.skipped_files += 1;
        continue;
      }
    };

    summary.files += 1;
    for (index, item) in items.into_iter().enumerate() {
      match serde_json::from_value::<T>(item) {
        Ok(record) => {
          records.push(record);
          summary.records += 1;
        }
        Err(e) => {
          tracing::warn!(file = %path.display(), index, error = %e, "skipping record");
          summary.skipped_records += 1;
        }
      }
    }
  }

  Ok((records, summary))
}
