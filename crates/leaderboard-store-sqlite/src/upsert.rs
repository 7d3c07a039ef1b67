//! Chunked multi-row upserts.
//!
//! Every write goes through [`SqliteStore::upsert_rows`]: the input is
//! deduplicated and chunked by [`leaderboard_core::merge::into_chunks`], and
//! each chunk becomes one `INSERT ... ON CONFLICT` statement whose conflict
//! clause is chosen by the [`ConflictPolicy`].

use leaderboard_core::merge::{BATCH_SIZE, ConflictPolicy, Record, UpsertReport, into_chunks};
use rusqlite::types::Value;

use crate::{Result, store::SqliteStore};

/// A record that maps onto one table row.
pub trait SqlRow: Record + Send + 'static {
  const TABLE: &'static str;
  /// Column names, in the order produced by [`SqlRow::into_values`].
  const COLUMNS: &'static [&'static str];
  /// The conflict target; a subset of `COLUMNS` backed by a unique index.
  const KEY: &'static [&'static str];

  fn into_values(self) -> Result<Vec<Value>>;
}

/// Build the statement writing `rows` rows into `table`.
pub fn upsert_sql(
  table: &str,
  columns: &[&str],
  key: &[&str],
  policy: ConflictPolicy,
  rows: usize,
) -> String {
  let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
  let values = vec![placeholders.as_str(); rows].join(", ");

  let action = match policy {
    ConflictPolicy::Ignore => "DO NOTHING".to_owned(),
    ConflictPolicy::Update => {
      let set: Vec<String> = columns
        .iter()
        .filter(|c| !key.contains(*c))
        .map(|c| format!("{c} = excluded.{c}"))
        .collect();
      if set.is_empty() {
        "DO NOTHING".to_owned()
      } else {
        format!("DO UPDATE SET {}", set.join(", "))
      }
    }
  };

  format!(
    "INSERT INTO {table} ({}) VALUES {values} ON CONFLICT ({}) {action}",
    columns.join(", "),
    key.join(", "),
  )
}

impl SqliteStore {
  /// Persist `rows` with the entity kind's default conflict policy.
  pub(crate) async fn upsert_default<R: SqlRow>(&self, rows: Vec<R>) -> Result<UpsertReport> {
    self.upsert_rows(rows, R::KIND.conflict_policy()).await
  }

  /// Persist `rows` chunk by chunk. The first failing chunk aborts the call;
  /// earlier chunks stay committed.
  pub(crate) async fn upsert_rows<R: SqlRow>(
    &self,
    rows: Vec<R>,
    policy: ConflictPolicy,
  ) -> Result<UpsertReport> {
    let mut report = UpsertReport::new(R::KIND, policy);

    for chunk in into_chunks(rows, policy, BATCH_SIZE) {
      let sql = upsert_sql(R::TABLE, R::COLUMNS, R::KEY, policy, chunk.len());
      let mut params = Vec::with_capacity(chunk.len() * R::COLUMNS.len());
      for row in chunk {
        params.extend(row.into_values()?);
      }

      let affected = self
        .conn
        .call(move |conn| Ok(conn.execute(&sql, rusqlite::params_from_iter(params))?))
        .await?;

      tracing::debug!(
        table = R::TABLE,
        %policy,
        chunk = report.chunks(),
        affected,
        "upserted chunk"
      );
      report.affected.push(affected);
    }

    Ok(report)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn update_sql_sets_non_key_columns() {
    let sql = upsert_sql("t", &["slug", "name", "meta"], &["slug"], ConflictPolicy::Update, 2);
    assert_eq!(
      sql,
      "INSERT INTO t (slug, name, meta) VALUES (?, ?, ?), (?, ?, ?) \
       ON CONFLICT (slug) DO UPDATE SET name = excluded.name, meta = excluded.meta"
    );
  }

  #[test]
  fn ignore_sql_does_nothing() {
    let sql = upsert_sql("t", &["slug", "meta"], &["slug"], ConflictPolicy::Ignore, 1);
    assert_eq!(sql, "INSERT INTO t (slug, meta) VALUES (?, ?) ON CONFLICT (slug) DO NOTHING");
  }

  #[test]
  fn composite_key_is_excluded_from_update() {
    let sql = upsert_sql(
      "contributor_aggregates",
      &["aggregate", "contributor", "value"],
      &["aggregate", "contributor"],
      ConflictPolicy::Update,
      1,
    );
    assert!(sql.ends_with("ON CONFLICT (aggregate, contributor) DO UPDATE SET value = excluded.value"));
  }
}
