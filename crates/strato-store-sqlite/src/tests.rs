//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, Utc};
use strato_core::{
  constraint::{
    Altitude, Constraint, ConstraintCategory, ConstraintState, Extent,
    NewConstraint, OutlinePolygon, TimePoint, Volume,
  },
  remote::{RemoteChangeResponse, RemoteOutcome},
  store::ConstraintStore,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

const T0: i64 = 1_700_000_000;

fn tp(unix: i64) -> TimePoint {
  TimePoint::new(DateTime::<Utc>::from_timestamp(unix, 0).unwrap())
}

fn altitude(value: f64) -> Altitude {
  Altitude {
    reference: "W84".to_owned(),
    units:     "M".to_owned(),
    value,
  }
}

fn extent(start: i64, end: i64) -> Extent {
  Extent {
    volume:     Volume {
      outline_polygon: OutlinePolygon::new(vec![
        [103.8550, 1.2887],
        [103.8535, 1.2829],
        [103.8553, 1.2805],
        [103.8550, 1.2887],
      ]),
      altitude_lower:  altitude(0.0),
      altitude_upper:  altitude(100.0),
    },
    time_start: tp(start),
    time_end:   tp(end),
  }
}

fn new_constraint(
  category: ConstraintCategory,
  start: i64,
  end: i64,
) -> NewConstraint {
  NewConstraint {
    category,
    state: ConstraintState::Accepted,
    extent: extent(start, end),
    uss_base_url: "https://uss.example.net".to_owned(),
  }
}

// ─── Create / get ────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_assigns_id_and_version_one() {
  let s = store().await;

  let created = s
    .create(new_constraint(ConstraintCategory::Stc, T0, T0 + 600))
    .await
    .unwrap();
  assert_eq!(created.version, 1);
  assert_eq!(created.state, ConstraintState::Accepted);

  let fetched = s.get(created.constraint_id).await.unwrap().unwrap();
  assert_eq!(fetched.constraint_id, created.constraint_id);
  assert_eq!(fetched.version, 1);
  assert_eq!(fetched.category, ConstraintCategory::Stc);
  assert_eq!(fetched.extent, created.extent);
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get(Uuid::new_v4()).await.unwrap().is_none());
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_overwrites_the_full_row() {
  let s = store().await;
  let created = s
    .create(new_constraint(ConstraintCategory::Stc, T0, T0 + 600))
    .await
    .unwrap();

  let mut updated = created.clone();
  updated.version = 2;
  updated.extent = extent(T0 + 100, T0 + 700);
  s.update(&updated).await.unwrap();

  let fetched = s.get(created.constraint_id).await.unwrap().unwrap();
  assert_eq!(fetched.version, 2);
  assert_eq!(fetched.extent.start_unix(), T0 + 100);
}

#[tokio::test]
async fn update_clears_previously_attached_remote_outcome() {
  let s = store().await;
  let created = s
    .create(new_constraint(ConstraintCategory::Stc, T0, T0 + 600))
    .await
    .unwrap();
  s.attach_remote_outcome(
    created.constraint_id,
    &RemoteOutcome::Failed { detail: "timeout".to_owned() },
  )
  .await
  .unwrap();

  let mut updated = created.clone();
  updated.version = 2;
  s.update(&updated).await.unwrap();

  assert!(
    s.remote_outcome(created.constraint_id)
      .await
      .unwrap()
      .is_none()
  );
}

/// Overwrite and enrich through the trait bound, the way the
/// orchestrator calls the store: borrowed inputs, not owned ones.
async fn overwrite_and_mark_failed<S: ConstraintStore>(
  store: &S,
  constraint: &Constraint,
) -> Result<(), S::Error> {
  store.update(constraint).await?;
  store
    .attach_remote_outcome(
      constraint.constraint_id,
      &RemoteOutcome::Failed { detail: "late".to_owned() },
    )
    .await
}

#[tokio::test]
async fn borrowed_inputs_pass_through_a_generic_caller() {
  let s = store().await;
  let created = s
    .create(new_constraint(ConstraintCategory::Stc, T0, T0 + 600))
    .await
    .unwrap();

  let mut updated = created.clone();
  updated.version = 2;
  overwrite_and_mark_failed(&s, &updated).await.unwrap();

  let fetched = s.get(created.constraint_id).await.unwrap().unwrap();
  assert_eq!(fetched.version, 2);
  assert!(matches!(
    s.remote_outcome(created.constraint_id).await.unwrap(),
    Some(RemoteOutcome::Failed { .. })
  ));
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_removes_the_row() {
  let s = store().await;
  let created = s
    .create(new_constraint(ConstraintCategory::Stc, T0, T0 + 600))
    .await
    .unwrap();

  s.delete(created.constraint_id).await.unwrap();
  assert!(s.get(created.constraint_id).await.unwrap().is_none());
}

// ─── Active-set queries ──────────────────────────────────────────────────────

#[tokio::test]
async fn active_by_category_filters_on_category_and_end_time() {
  let s = store().await;
  let live = s
    .create(new_constraint(ConstraintCategory::Stc, T0, T0 + 600))
    .await
    .unwrap();
  // Ended before the query floor.
  s.create(new_constraint(ConstraintCategory::Stc, T0 - 7200, T0 - 3600))
    .await
    .unwrap();
  // Different category, same window.
  s.create(new_constraint(ConstraintCategory::Geozone, T0, T0 + 600))
    .await
    .unwrap();

  let active = s
    .active_by_category(ConstraintCategory::Stc, T0, None)
    .await
    .unwrap();
  assert_eq!(active.len(), 1);
  assert_eq!(active[0].constraint_id, live.constraint_id);
}

#[tokio::test]
async fn active_by_category_honours_exclusion() {
  let s = store().await;
  let a = s
    .create(new_constraint(ConstraintCategory::Stc, T0, T0 + 600))
    .await
    .unwrap();
  let b = s
    .create(new_constraint(ConstraintCategory::Stc, T0, T0 + 600))
    .await
    .unwrap();

  let active = s
    .active_by_category(ConstraintCategory::Stc, T0, Some(a.constraint_id))
    .await
    .unwrap();
  assert_eq!(active.len(), 1);
  assert_eq!(active[0].constraint_id, b.constraint_id);
}

#[tokio::test]
async fn active_by_category_includes_boundary_end_time() {
  let s = store().await;
  s.create(new_constraint(ConstraintCategory::Stc, T0 - 600, T0))
    .await
    .unwrap();

  // time_end == floor counts as still relevant.
  let active = s
    .active_by_category(ConstraintCategory::Stc, T0, None)
    .await
    .unwrap();
  assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn active_by_state_filters_on_end_time() {
  let s = store().await;
  s.create(new_constraint(ConstraintCategory::Stc, T0, T0 + 600))
    .await
    .unwrap();
  s.create(new_constraint(ConstraintCategory::Geozone, T0, T0 + 900))
    .await
    .unwrap();
  s.create(new_constraint(ConstraintCategory::Stc, T0 - 7200, T0 - 3600))
    .await
    .unwrap();

  let active = s
    .active_by_state(ConstraintState::Accepted, T0)
    .await
    .unwrap();
  assert_eq!(active.len(), 2);
}

// ─── Remote outcome enrichment ───────────────────────────────────────────────

#[tokio::test]
async fn remote_outcome_round_trips() {
  let s = store().await;
  let created = s
    .create(new_constraint(ConstraintCategory::Stc, T0, T0 + 600))
    .await
    .unwrap();

  assert!(
    s.remote_outcome(created.constraint_id)
      .await
      .unwrap()
      .is_none()
  );

  let outcome = RemoteOutcome::Synced {
    response: RemoteChangeResponse {
      constraint_reference: None,
      subscribers:          vec![],
    },
  };
  s.attach_remote_outcome(created.constraint_id, &outcome)
    .await
    .unwrap();

  let stored = s
    .remote_outcome(created.constraint_id)
    .await
    .unwrap()
    .unwrap();
  assert!(matches!(stored, RemoteOutcome::Synced { .. }));
}

// ─── Summaries ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_summaries_projects_every_row() {
  let s = store().await;
  s.create(new_constraint(ConstraintCategory::Stc, T0, T0 + 600))
    .await
    .unwrap();
  s.create(new_constraint(ConstraintCategory::Geozone, T0, T0 + 900))
    .await
    .unwrap();

  let summaries = s.list_summaries().await.unwrap();
  assert_eq!(summaries.len(), 2);
  assert!(summaries.iter().any(|x| x.time_end == T0 + 900));
}
