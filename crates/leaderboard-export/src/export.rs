//! Store -> files.

use std::collections::BTreeMap;

use leaderboard_core::{activity::ActivityQuery, store::LeaderboardStore};
use serde::Serialize;

use crate::{
  Error, Result,
  layout::{DataLayout, RecordKind},
  record::{ActivityRecord, BadgeRecord, ByContributor},
};

/// What one export call wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
  pub files:   usize,
  pub records: usize,
  /// Contributors whose username cannot be used as a file name.
  pub skipped: Vec<String>,
}

/// Write every stored activity to `activities/<contributor>.json`.
pub async fn export_activities<S>(store: &S, layout: &DataLayout) -> Result<ExportSummary>
where
  S: LeaderboardStore,
{
  let activities = store
    .list_activities(&ActivityQuery::default())
    .await
    .map_err(Error::store)?;

  let records = activities.into_iter().map(ActivityRecord::from);
  write_grouped(layout, RecordKind::Activities, records).await
}

/// Write every stored award to `badges/<contributor>.json`.
pub async fn export_badges<S>(store: &S, layout: &DataLayout) -> Result<ExportSummary>
where
  S: LeaderboardStore,
{
  let awards = store
    .list_contributor_badges(None)
    .await
    .map_err(Error::store)?;

  let records = awards.into_iter().map(BadgeRecord::from);
  write_grouped(layout, RecordKind::Badges, records).await
}

async fn write_grouped<R, I>(layout: &DataLayout, kind: RecordKind, records: I) -> Result<ExportSummary>
where
  R: ByContributor + Serialize,
  I: IntoIterator<Item = R>,
{
  let mut groups: BTreeMap<String, Vec<R>> = BTreeMap::new();
  for record in records {
    groups
      .entry(record.contributor().to_owned())
      .or_default()
      .push(record);
  }

  let dir = layout.dir(kind);
  tokio::fs::create_dir_all(&dir)
    .await
    .map_err(Error::io(&dir))?;

  let mut summary = ExportSummary::default();
  for (contributor, group) in groups {
    let path = match layout.file(kind, &contributor) {
      Ok(path) => path,
      Err(e) => {
        tracing::warn!(%kind, contributor = %contributor, error = %e, "skipping contributor");
        summary.skipped.push(contributor);
        continue;
      }
    };

    let mut body = serde_json::to_string_pretty(&group)?;
    body.push('\n');
    tokio::fs::write(&path, body)
      .await
      .map_err(Error::io(&path))?;

    summary.files += 1;
    summary.records += group.len();
  }

  tracing::info!(
    %kind,
    dir = %dir.display(),
    files = summary.files,
    records = summary.records,
    "exported"
  );
  Ok(summary)
}
