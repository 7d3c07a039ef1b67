//! Conflict policies and batching rules shared by every store backend.
//!
//! Each entity kind has a default [`ConflictPolicy`]. Input is deduplicated by
//! identity key and split into fixed-size chunks before it reaches the
//! database; the outcome is the same as applying the records one at a time,
//! whatever the chunk boundaries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{
  activity::{Activity, ActivityDefinition},
  aggregate::{AggregateDefinition, ContributorAggregate, GlobalAggregate},
  badge::{BadgeDefinition, ContributorBadge},
  contributor::Contributor,
};

/// Maximum number of records written by a single statement.
pub const BATCH_SIZE: usize = 1000;

// ─── Policies ────────────────────────────────────────────────────────────────

/// What happens when a record's identity key already exists.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConflictPolicy {
  /// Overwrite every non-key column with the incoming values.
  Update,
  /// Keep the stored row untouched.
  Ignore,
}

/// The kinds of records the store persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
  Contributor,
  ActivityDefinition,
  Activity,
  BadgeDefinition,
  ContributorBadge,
  AggregateDefinition,
  GlobalAggregate,
  ContributorAggregate,
}

impl EntityKind {
  /// The default policy for this kind. Badge awards are immutable once
  /// written; everything else is either a mutable definition or derived state.
  pub fn conflict_policy(self) -> ConflictPolicy {
    match self {
      Self::ContributorBadge => ConflictPolicy::Ignore,
      _ => ConflictPolicy::Update,
    }
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A persistable record with an identity key.
pub trait Record {
  const KIND: EntityKind;

  /// The uniqueness key. Composite keys are joined with `\u{1f}`.
  fn key(&self) -> String;
}

impl Record for Contributor {
  const KIND: EntityKind = EntityKind::Contributor;
  fn key(&self) -> String { self.username.clone() }
}

impl Record for ActivityDefinition {
  const KIND: EntityKind = EntityKind::ActivityDefinition;
  fn key(&self) -> String { self.slug.clone() }
}

impl Record for Activity {
  const KIND: EntityKind = EntityKind::Activity;
  fn key(&self) -> String { self.slug.clone() }
}

impl Record for BadgeDefinition {
  const KIND: EntityKind = EntityKind::BadgeDefinition;
  fn key(&self) -> String { self.slug.clone() }
}

impl Record for ContributorBadge {
  const KIND: EntityKind = EntityKind::ContributorBadge;
  fn key(&self) -> String { self.slug.clone() }
}

impl Record for AggregateDefinition {
  const KIND: EntityKind = EntityKind::AggregateDefinition;
  fn key(&self) -> String { self.slug.clone() }
}

impl Record for GlobalAggregate {
  const KIND: EntityKind = EntityKind::GlobalAggregate;
  fn key(&self) -> String { self.slug.clone() }
}

impl Record for ContributorAggregate {
  const KIND: EntityKind = EntityKind::ContributorAggregate;
  fn key(&self) -> String { format!("{}\u{1f}{}", self.aggregate, self.contributor) }
}

// ─── Batching ────────────────────────────────────────────────────────────────

/// Collapse records sharing a key so one statement never sees the same key
/// twice.
///
/// Under [`ConflictPolicy::Update`] the last occurrence wins; under
/// [`ConflictPolicy::Ignore`] the first one does. Either way the surviving
/// record sits at the position of the key's first appearance.
pub fn dedup_by_key<R: Record>(records: Vec<R>, policy: ConflictPolicy) -> Vec<R> {
  let mut index: HashMap<String, usize> = HashMap::with_capacity(records.len());
  let mut out: Vec<R> = Vec::with_capacity(records.len());

  for record in records {
    match index.get(&record.key()) {
      Some(&i) => {
        if policy == ConflictPolicy::Update {
          out[i] = record;
        }
      }
      None => {
        index.insert(record.key(), out.len());
        out.push(record);
      }
    }
  }
  out
}

/// Deduplicate `records` and split them into chunks of at most `size`.
pub fn into_chunks<R: Record>(
  records: Vec<R>,
  policy: ConflictPolicy,
  size: usize,
) -> Vec<Vec<R>> {
  let size = size.max(1);
  let mut chunks = Vec::new();
  let mut iter = dedup_by_key(records, policy).into_iter().peekable();
  while iter.peek().is_some() {
    chunks.push(iter.by_ref().take(size).collect());
  }
  chunks
}

// ─── Reporting ───────────────────────────────────────────────────────────────

/// Rows affected by one upsert call, per chunk.
///
/// Informational only: conflicts resolved by [`ConflictPolicy::Ignore`]
/// legitimately lower the count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertReport {
  pub kind:     EntityKind,
  pub policy:   ConflictPolicy,
  pub affected: Vec<usize>,
}

impl UpsertReport {
  pub fn new(kind: EntityKind, policy: ConflictPolicy) -> Self {
    Self { kind, policy, affected: Vec::new() }
  }

  pub fn total(&self) -> usize { self.affected.iter().sum() }

  pub fn chunks(&self) -> usize { self.affected.len() }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn named(username: &str, name: &str) -> Contributor {
    Contributor { name: Some(name.into()), ..Contributor::new(username) }
  }

  #[test]
  fn awards_default_to_ignore() {
    assert_eq!(EntityKind::ContributorBadge.conflict_policy(), ConflictPolicy::Ignore);
    assert_eq!(EntityKind::BadgeDefinition.conflict_policy(), ConflictPolicy::Update);
    assert_eq!(EntityKind::GlobalAggregate.conflict_policy(), ConflictPolicy::Update);
    assert_eq!(EntityKind::Activity.conflict_policy(), ConflictPolicy::Update);
  }

  #[test]
  fn update_dedup_keeps_last_occurrence() {
    let out = dedup_by_key(
      vec![named("alice", "A1"), named("bob", "B"), named("alice", "A2")],
      ConflictPolicy::Update,
    );
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].name.as_deref(), Some("A2"));
    assert_eq!(out[1].username, "bob");
  }

  #[test]
  fn ignore_dedup_keeps_first_occurrence() {
    let out = dedup_by_key(
      vec![named("alice", "A1"), named("alice", "A2")],
      ConflictPolicy::Ignore,
    );
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].name.as_deref(), Some("A1"));
  }

  #[test]
  fn chunks_are_bounded_and_cover_input() {
    let records: Vec<_> = (0..2500).map(|i| Contributor::new(format!("user{i}"))).collect();
    let chunks = into_chunks(records, ConflictPolicy::Update, BATCH_SIZE);
    let sizes: Vec<_> = chunks.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![1000, 1000, 500]);
  }

  #[test]
  fn empty_input_yields_no_chunks() {
    let chunks = into_chunks(Vec::<Contributor>::new(), ConflictPolicy::Update, BATCH_SIZE);
    assert!(chunks.is_empty());
  }

  #[test]
  fn policy_names_round_trip_through_strum() {
    assert_eq!(ConflictPolicy::Ignore.to_string(), "ignore");
    assert_eq!("update".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Update);
    assert_eq!(EntityKind::ContributorBadge.as_ref(), "contributor_badge");
  }
}
