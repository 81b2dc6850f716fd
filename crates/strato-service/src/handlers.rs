//! Route handlers. Each handler runs the scope gate, the schema gate,
//! and then hands off to the orchestrator or store.

use axum::{
  Json,
  extract::{Path, State},
  http::{HeaderMap, StatusCode},
  response::{IntoResponse, Response},
};
use serde::Serialize;
use uuid::Uuid;

use strato_core::{
  constraint::{Constraint, ConstraintCategory, ConstraintState},
  remote::{
    AreaOfInterest, ConstraintDetails, ConstraintReference, Notification,
    RemoteConstraint, RemoteOutcome, RemoteQueryResponse, RemoteSync,
    SubscriberNotifier, to_remote_extent,
  },
  store::ConstraintStore,
};

use crate::{
  AppState,
  auth::{CONSUMPTION_SCOPES, MANAGEMENT_SCOPES, NOTIFICATION_SCOPES, authorize},
  error::{Error, Result},
  lifecycle::{ChangeOutcome, DeleteOutcome},
  payload::{CheckedSubmission, Submission, check},
};

// ─── Response bodies ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ChangeBody {
  pub constraint:           Constraint,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub constraint_reference: Option<ConstraintReference>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub warnings:             Vec<String>,
}

impl ChangeBody {
  fn from_outcome(outcome: ChangeOutcome) -> Self {
    Self {
      constraint:           outcome.constraint,
      constraint_reference: outcome
        .remote
        .and_then(|r| r.constraint_reference),
      warnings:             outcome.warnings,
    }
  }
}

#[derive(Serialize)]
pub struct DeleteBody {
  pub constraint_id: Uuid,
  pub message:       String,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub warnings:      Vec<String>,
}

impl DeleteBody {
  fn from_outcome(outcome: DeleteOutcome) -> Self {
    Self {
      constraint_id: outcome.constraint_id,
      message:       "constraint deleted".to_owned(),
      warnings:      outcome.warnings,
    }
  }
}

// ─── Create / update / delete ────────────────────────────────────────────────

async fn run_create<S, R, N>(
  state: AppState<S, R, N>,
  headers: HeaderMap,
  submission: Submission,
  category: ConstraintCategory,
) -> Result<Response>
where
  S: ConstraintStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  R: RemoteSync,
  N: SubscriberNotifier,
{
  authorize(&headers, MANAGEMENT_SCOPES)?;
  let checked = check(submission, false)?;

  let outcome = state
    .orchestrator
    .create(category, checked.extent, checked.uss_base_url)
    .await?;
  Ok(
    (StatusCode::CREATED, Json(ChangeBody::from_outcome(outcome)))
      .into_response(),
  )
}

async fn run_update<S, R, N>(
  state: AppState<S, R, N>,
  headers: HeaderMap,
  submission: Submission,
  category: ConstraintCategory,
) -> Result<Response>
where
  S: ConstraintStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  R: RemoteSync,
  N: SubscriberNotifier,
{
  authorize(&headers, MANAGEMENT_SCOPES)?;
  let CheckedSubmission {
    constraint_id,
    extent,
    old_version,
    uss_base_url,
  } = check(submission, true)?;
  // Strict mode guarantees both are present.
  let (Some(id), Some(old_version)) = (constraint_id, old_version) else {
    return Err(Error::Payload(vec![
      "constraint_id and old_version are required".to_owned(),
    ]));
  };

  let outcome = state
    .orchestrator
    .update(id, old_version, category, extent, uss_base_url)
    .await?;
  Ok(Json(ChangeBody::from_outcome(outcome)).into_response())
}

pub async fn create_stc<S, R, N>(
  State(state): State<AppState<S, R, N>>,
  headers: HeaderMap,
  Json(submission): Json<Submission>,
) -> Result<Response>
where
  S: ConstraintStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  R: RemoteSync,
  N: SubscriberNotifier,
{
  run_create(state, headers, submission, ConstraintCategory::Stc).await
}

pub async fn update_stc<S, R, N>(
  State(state): State<AppState<S, R, N>>,
  headers: HeaderMap,
  Json(submission): Json<Submission>,
) -> Result<Response>
where
  S: ConstraintStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  R: RemoteSync,
  N: SubscriberNotifier,
{
  run_update(state, headers, submission, ConstraintCategory::Stc).await
}

pub async fn create_geozone<S, R, N>(
  State(state): State<AppState<S, R, N>>,
  headers: HeaderMap,
  Json(submission): Json<Submission>,
) -> Result<Response>
where
  S: ConstraintStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  R: RemoteSync,
  N: SubscriberNotifier,
{
  run_create(state, headers, submission, ConstraintCategory::Geozone).await
}

pub async fn update_geozone<S, R, N>(
  State(state): State<AppState<S, R, N>>,
  headers: HeaderMap,
  Json(submission): Json<Submission>,
) -> Result<Response>
where
  S: ConstraintStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  R: RemoteSync,
  N: SubscriberNotifier,
{
  run_update(state, headers, submission, ConstraintCategory::Geozone).await
}

pub async fn remove<S, R, N>(
  State(state): State<AppState<S, R, N>>,
  headers: HeaderMap,
  Path(id): Path<Uuid>,
) -> Result<Response>
where
  S: ConstraintStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  R: RemoteSync,
  N: SubscriberNotifier,
{
  authorize(&headers, MANAGEMENT_SCOPES)?;
  let outcome = state.orchestrator.delete(id).await?;
  Ok(Json(DeleteBody::from_outcome(outcome)).into_response())
}

// ─── Local queries ───────────────────────────────────────────────────────────

fn store_err<E>(e: E) -> Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  Error::Store(Box::new(e))
}

pub async fn query_by_id<S, R, N>(
  State(state): State<AppState<S, R, N>>,
  headers: HeaderMap,
  Path(id): Path<Uuid>,
) -> Result<Response>
where
  S: ConstraintStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  R: RemoteSync,
  N: SubscriberNotifier,
{
  authorize(&headers, MANAGEMENT_SCOPES)?;
  let constraint = state
    .orchestrator
    .store
    .get(id)
    .await
    .map_err(store_err)?
    .ok_or(Error::NotFound(id))?;
  Ok(Json(constraint).into_response())
}

/// Reduced projection of every stored constraint, active or not.
pub async fn query_global<S, R, N>(
  State(state): State<AppState<S, R, N>>,
  headers: HeaderMap,
) -> Result<Response>
where
  S: ConstraintStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  R: RemoteSync,
  N: SubscriberNotifier,
{
  authorize(&headers, MANAGEMENT_SCOPES)?;
  let summaries = state
    .orchestrator
    .store
    .list_summaries()
    .await
    .map_err(store_err)?;
  Ok(Json(summaries).into_response())
}

pub async fn query_active<S, R, N>(
  State(state): State<AppState<S, R, N>>,
  headers: HeaderMap,
  Path(min_time_end): Path<i64>,
) -> Result<Response>
where
  S: ConstraintStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  R: RemoteSync,
  N: SubscriberNotifier,
{
  authorize(&headers, MANAGEMENT_SCOPES)?;
  let active = state
    .orchestrator
    .store
    .active_by_state(ConstraintState::Accepted, min_time_end)
    .await
    .map_err(store_err)?;
  Ok(Json(active).into_response())
}

pub async fn query_by_category<S, R, N>(
  State(state): State<AppState<S, R, N>>,
  headers: HeaderMap,
  Path(category): Path<String>,
) -> Result<Response>
where
  S: ConstraintStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  R: RemoteSync,
  N: SubscriberNotifier,
{
  authorize(&headers, MANAGEMENT_SCOPES)?;
  let category = ConstraintCategory::parse(&category)
    .map_err(|_| Error::Payload(vec![format!("unknown category {category}")]))?;
  let active = state
    .orchestrator
    .store
    .active_by_category(category, chrono::Utc::now().timestamp(), None)
    .await
    .map_err(store_err)?;
  Ok(Json(active).into_response())
}

/// Area query pass-through to the DSS. Not on any mutation's critical
/// path; a remote failure maps straight to a gateway error.
pub async fn query_area<S, R, N>(
  State(state): State<AppState<S, R, N>>,
  headers: HeaderMap,
  Json(area): Json<AreaOfInterest>,
) -> Result<Json<RemoteQueryResponse>>
where
  S: ConstraintStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  R: RemoteSync,
  N: SubscriberNotifier,
{
  authorize(&headers, MANAGEMENT_SCOPES)?;
  let response = state
    .orchestrator
    .remote
    .query_area(&area)
    .await
    .map_err(|e| Error::RemoteQuery(e.to_string()))?;
  Ok(Json(response))
}

// ─── ASTM surface ────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct AstmConstraintBody {
  pub constraint: RemoteConstraint,
}

/// Reassemble the reference/details view of a stored constraint.
///
/// The reference comes from the persisted DSS response when one exists;
/// otherwise it is synthesised from the local row so the read path works
/// even when the mirror write failed.
pub async fn astm_get<S, R, N>(
  State(state): State<AppState<S, R, N>>,
  headers: HeaderMap,
  Path(id): Path<Uuid>,
) -> Result<Response>
where
  S: ConstraintStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  R: RemoteSync,
  N: SubscriberNotifier,
{
  authorize(&headers, CONSUMPTION_SCOPES)?;
  let store = &state.orchestrator.store;
  let constraint = store
    .get(id)
    .await
    .map_err(store_err)?
    .ok_or(Error::NotFound(id))?;

  let stored_reference = match store.remote_outcome(id).await {
    Ok(Some(RemoteOutcome::Synced { response })) => {
      response.constraint_reference
    }
    Ok(_) => None,
    Err(e) => {
      tracing::warn!(constraint_id = %id, error = %e, "remote outcome unreadable");
      None
    }
  };
  let reference = stored_reference.unwrap_or_else(|| ConstraintReference {
    id,
    owner: state.config.owner.clone(),
    version: constraint.version.saturating_sub(1),
    ovn: None,
    time_start: constraint.extent.time_start.clone(),
    time_end: constraint.extent.time_end.clone(),
    uss_base_url: constraint.uss_base_url.clone(),
  });

  let body = AstmConstraintBody {
    constraint: RemoteConstraint {
      reference,
      details: ConstraintDetails {
        volumes: vec![to_remote_extent(&constraint.extent)],
        kind:    constraint.category,
        state:   constraint.state,
      },
    },
  };
  Ok(Json(body).into_response())
}

/// Inbound notification receiver: peers POST constraint changes here.
/// Acknowledge and log; nothing is persisted from a peer notification.
pub async fn receive_notification<S, R, N>(
  State(_state): State<AppState<S, R, N>>,
  headers: HeaderMap,
  Json(notification): Json<Notification>,
) -> Result<Response>
where
  S: ConstraintStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  R: RemoteSync,
  N: SubscriberNotifier,
{
  authorize(&headers, NOTIFICATION_SCOPES)?;
  tracing::info!(
    constraint_id = %notification.constraint_id,
    has_body = notification.constraint.is_some(),
    subscriptions = notification.subscriptions.len(),
    "received peer constraint notification"
  );
  Ok(StatusCode::NO_CONTENT.into_response())
}
