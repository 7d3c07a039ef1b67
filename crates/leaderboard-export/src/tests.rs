//! Export/import against a temporary data tree and in-memory stores.

use chrono::{NaiveDate, TimeZone, Utc};
use leaderboard_core::{
  activity::{Activity, ActivityQuery},
  badge::{self, ContributorBadge},
  catalog,
  contributor::Contributor,
  store::LeaderboardStore,
};
use leaderboard_store_sqlite::SqliteStore;
use serde_json::json;
use tempfile::TempDir;

use crate::{
  DataLayout, ImportSummary, RecordKind, export_activities, export_badges, import_activities,
  import_badges,
  record::{ActivityRecord, BadgeRecord},
};

/// An empty store with the catalog's definitions registered.
async fn prepared() -> SqliteStore {
  let store = SqliteStore::open_in_memory().await.unwrap();
  store
    .upsert_activity_definitions(catalog::activity_definitions())
    .await
    .unwrap();
  store
    .upsert_badge_definitions(catalog::badge_definitions())
    .await
    .unwrap();
  store
}

fn activity(slug: &str, contributor: &str, hour: u32) -> Activity {
  Activity {
    slug:                slug.into(),
    contributor:         contributor.into(),
    activity_definition: catalog::PR_MERGED.into(),
    title:               Some(format!("Merge {slug}")),
    occurred_at:         Utc.with_ymd_and_hms(2024, 5, 3, hour, 0, 0).unwrap(),
    link:                Some(format!("https://example.test/{slug}")),
    text:                None,
    points:              Some(5),
    meta:                Some(json!({ "merge_time_hours": hour, "lines_changed": 40 })),
  }
}

fn award(contributor: &str) -> ContributorBadge {
  ContributorBadge {
    slug:        badge::award_slug(catalog::ENGAGEMENT_CHAMPION, contributor, "bronze"),
    badge:       catalog::ENGAGEMENT_CHAMPION.into(),
    contributor: contributor.into(),
    variant:     "bronze".into(),
    achieved_on: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
    meta:        Some(json!({ "metricValue": 12, "threshold": 10, "awardedBy": "automated" })),
  }
}

async fn populated(contributors: &[&str]) -> SqliteStore {
  let store = prepared().await;
  store
    .upsert_contributors(contributors.iter().map(|c| Contributor::new(*c)).collect())
    .await
    .unwrap();

  let mut activities = Vec::new();
  for (i, c) in contributors.iter().enumerate() {
    activities.push(activity(&format!("{c}-a"), c, 9 + i as u32));
    activities.push(activity(&format!("{c}-b"), c, 14));
  }
  store.upsert_activities(activities).await.unwrap();
  store
    .award_badges(contributors.iter().map(|c| award(c)).collect())
    .await
    .unwrap();
  store
}

fn layout(dir: &TempDir) -> DataLayout { DataLayout::new(dir.path(), "github").unwrap() }

#[tokio::test]
async fn export_then_import_reproduces_the_store() {
  let dir = TempDir::new().unwrap();
  let layout = layout(&dir);
  let source = populated(&["alice", "bob"]).await;

  let activities = export_activities(&source, &layout).await.unwrap();
  assert_eq!(activities.files, 2);
  assert_eq!(activities.records, 4);
  let badges = export_badges(&source, &layout).await.unwrap();
  assert_eq!(badges.files, 2);
  assert_eq!(badges.records, 2);

  let target = prepared().await;
  let imported = import_activities(&target, &layout).await.unwrap();
  assert_eq!(imported.records, 4);
  assert_eq!(imported.affected, Some(4));
  import_badges(&target, &layout).await.unwrap();

  let all = ActivityQuery::default();
  assert_eq!(
    source.list_activities(&all).await.unwrap(),
    target.list_activities(&all).await.unwrap()
  );
  assert_eq!(
    source.list_contributor_badges(None).await.unwrap(),
    target.list_contributor_badges(None).await.unwrap()
  );

  let usernames: Vec<String> = target
    .list_contributors()
    .await
    .unwrap()
    .into_iter()
    .map(|c| c.username)
    .collect();
  assert_eq!(usernames, ["alice", "bob"]);
}

#[tokio::test]
async fn exported_files_use_the_wire_keys() {
  let dir = TempDir::new().unwrap();
  let layout = layout(&dir);
  let source = populated(&["alice"]).await;
  export_activities(&source, &layout).await.unwrap();
  export_badges(&source, &layout).await.unwrap();

  let read = |kind| {
    let path = layout.file(kind, "alice").unwrap();
    let body = std::fs::read_to_string(path).unwrap();
    serde_json::from_str::<serde_json::Value>(&body).unwrap()
  };

  let activities = read(RecordKind::Activities);
  let first = &activities.as_array().unwrap()[0];
  assert!(first.get("occured_at").is_some());
  assert_eq!(first["contributor"], "alice");

  let badges = read(RecordKind::Badges);
  assert_eq!(badges[0]["achieved_on"], "2024-05-01");
  assert_eq!(badges[0]["slug"], "engagement_champion__alice__bronze");
}

#[tokio::test]
async fn missing_directories_import_nothing() {
  let dir = TempDir::new().unwrap();
  let store = prepared().await;

  let summary = import_activities(&store, &layout(&dir)).await.unwrap();
  assert_eq!(summary, ImportSummary::default());
  let summary = import_badges(&store, &layout(&dir)).await.unwrap();
  assert_eq!(summary.affected, None);
  assert!(store.list_contributors().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_records_are_skipped() {
  let dir = TempDir::new().unwrap();
  let layout = layout(&dir);
  let badges = layout.dir(RecordKind::Badges);
  std::fs::create_dir_all(&badges).unwrap();

  let good = serde_json::to_value(BadgeRecord::from(award("carol"))).unwrap();
  let mut bad = good.clone();
  bad["achieved_on"] = json!("not-a-date");
  std::fs::write(badges.join("carol.json"), json!([bad, good]).to_string()).unwrap();

  let store = prepared().await;
  let summary = import_badges(&store, &layout).await.unwrap();
  assert_eq!(summary.records, 1);
  assert_eq!(summary.skipped_records, 1);
  assert_eq!(store.list_contributor_badges(None).await.unwrap(), vec![award("carol")]);
}

#[tokio::test]
async fn unregistered_kinds_and_badges_are_skipped() {
  let dir = TempDir::new().unwrap();
  let layout = layout(&dir);
  let activities = layout.dir(RecordKind::Activities);
  let badges = layout.dir(RecordKind::Badges);
  std::fs::create_dir_all(&activities).unwrap();
  std::fs::create_dir_all(&badges).unwrap();

  let merged = ActivityRecord::from(activity("pr-1", "alice", 9));
  let mut deployed = ActivityRecord::from(activity("deploy-1", "bob", 10));
  deployed.activity_definition = "deployment".into();
  std::fs::write(activities.join("alice.json"), json!([merged]).to_string()).unwrap();
  std::fs::write(activities.join("bob.json"), json!([deployed]).to_string()).unwrap();

  let mut unknown = BadgeRecord::from(award("bob"));
  unknown.badge = "night_owl".into();
  std::fs::write(
    badges.join("alice.json"),
    json!([BadgeRecord::from(award("alice"))]).to_string(),
  )
  .unwrap();
  std::fs::write(badges.join("bob.json"), json!([unknown]).to_string()).unwrap();

  let store = prepared().await;
  let summary = import_activities(&store, &layout).await.unwrap();
  assert_eq!(summary.records, 1);
  assert_eq!(summary.skipped_records, 1);
  assert_eq!(summary.affected, Some(1));
  let summary = import_badges(&store, &layout).await.unwrap();
  assert_eq!(summary.skipped_records, 1);
  assert_eq!(summary.affected, Some(1));

  let stored = store.list_activities(&ActivityQuery::default()).await.unwrap();
  assert_eq!(stored, vec![activity("pr-1", "alice", 9)]);
  assert_eq!(store.list_contributor_badges(None).await.unwrap(), vec![award("alice")]);

  // bob only appeared in skipped records.
  let usernames: Vec<String> = store
    .list_contributors()
    .await
    .unwrap()
    .into_iter()
    .map(|c| c.username)
    .collect();
  assert_eq!(usernames, ["alice"]);
}

#[tokio::test]
async fn files_that_are_not_arrays_are_skipped() {
  let dir = TempDir::new().unwrap();
  let layout = layout(&dir);
  let activities = layout.dir(RecordKind::Activities);
  std::fs::create_dir_all(&activities).unwrap();
  std::fs::write(activities.join("alice.json"), r#"{"slug": "x"}"#).unwrap();
  std::fs::write(activities.join("bob.json"), "[not json").unwrap();
  std::fs::write(activities.join("notes.txt"), "ignored").unwrap();

  let store = prepared().await;
  let summary = import_activities(&store, &layout).await.unwrap();
  assert_eq!(summary.files, 0);
  assert_eq!(summary.skipped_files, 2);
  assert_eq!(summary.affected, None);
}

#[tokio::test]
async fn unsafe_usernames_are_not_written() {
  let dir = TempDir::new().unwrap();
  let layout = layout(&dir);
  let source = populated(&["alice", "../evil"]).await;

  let summary = export_activities(&source, &layout).await.unwrap();
  assert_eq!(summary.files, 1);
  assert_eq!(summary.skipped, ["../evil"]);
  assert!(!dir.path().join("github/evil.json").exists());
  assert!(!dir.path().join("github/activities/../evil.json").exists());
}
