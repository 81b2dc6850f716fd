//! HTTP surface of the constraint information function.
//!
//! Exposes an axum [`Router`] over any [`ConstraintStore`] backend, any
//! [`RemoteSync`] gateway, and any [`SubscriberNotifier`] — the
//! orchestrator in `lifecycle` ties the three together.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod payload;

pub use error::Error;
pub use lifecycle::Orchestrator;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{delete, get, post},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use strato_core::{
  horizon::HorizonPolicy,
  remote::{RemoteSync, SubscriberNotifier},
  store::ConstraintStore,
};
use strato_dss::{DssConfig, notify::NotifierConfig};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `config.toml` plus the
/// `STRATO_` environment overlay.
#[derive(Clone, Deserialize)]
pub struct ServiceConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// Identifier this USS presents as `owner` when synthesising a
  /// constraint reference for rows without a persisted DSS response.
  pub owner:      String,
  #[serde(default)]
  pub horizon:    HorizonPolicy,
  pub dss:        DssConfig,
  pub notifier:   NotifierConfig,
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, R, N> {
  pub orchestrator: Arc<Orchestrator<S, R, N>>,
  pub config:       Arc<ServiceConfig>,
}

impl<S, R, N> Clone for AppState<S, R, N> {
  fn clone(&self) -> Self {
    Self {
      orchestrator: Arc::clone(&self.orchestrator),
      config:       Arc::clone(&self.config),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the service router.
///
/// `/constraints/*` is the management surface for the owning operator;
/// `/uss/v1/constraints*` is the ASTM-facing peer surface.
pub fn router<S, R, N>(state: AppState<S, R, N>) -> Router
where
  S: ConstraintStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  R: RemoteSync + 'static,
  N: SubscriberNotifier + 'static,
{
  Router::new()
    .route("/constraints/create/stc", post(handlers::create_stc::<S, R, N>))
    .route("/constraints/update/stc", post(handlers::update_stc::<S, R, N>))
    .route(
      "/constraints/create/gz",
      post(handlers::create_geozone::<S, R, N>),
    )
    .route(
      "/constraints/update/gz",
      post(handlers::update_geozone::<S, R, N>),
    )
    .route("/constraints/remove/{id}", delete(handlers::remove::<S, R, N>))
    .route("/constraints/query/{id}", get(handlers::query_by_id::<S, R, N>))
    .route(
      "/constraints/query/global",
      get(handlers::query_global::<S, R, N>),
    )
    .route(
      "/constraints/query/active/{time}",
      get(handlers::query_active::<S, R, N>),
    )
    .route(
      "/constraints/query/type/{category}",
      get(handlers::query_by_category::<S, R, N>),
    )
    .route("/constraints/query/area", post(handlers::query_area::<S, R, N>))
    .route("/uss/v1/constraints/{id}", get(handlers::astm_get::<S, R, N>))
    .route(
      "/uss/v1/constraints",
      post(handlers::receive_notification::<S, R, N>),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::Engine as _;
  use base64::engine::general_purpose::URL_SAFE_NO_PAD;
  use chrono::Utc;
  use serde_json::{Value, json};
  use strato_core::remote::{
    AreaOfInterest, ConstraintReference, FanoutReport, RemoteChangeResponse,
    RemoteConstraint, RemoteQueryResponse, RemoteSubmission, Subscriber,
  };
  use strato_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use super::*;

  #[derive(Clone)]
  struct FakeRemote;

  impl RemoteSync for FakeRemote {
    type Error = std::io::Error;

    async fn put_constraint(
      &self,
      submission: &RemoteSubmission,
    ) -> Result<RemoteChangeResponse, Self::Error> {
      let extent = &submission.extents[0];
      Ok(RemoteChangeResponse {
        constraint_reference: Some(ConstraintReference {
          id:           submission.constraint_id,
          owner:        "dss.example.net".to_owned(),
          version:      submission.old_version + 1,
          ovn:          Some("opaque-version-1".to_owned()),
          time_start:   extent.time_start.clone(),
          time_end:     extent.time_end.clone(),
          uss_base_url: submission.uss_base_url.clone(),
        }),
        subscribers:          vec![],
      })
    }

    async fn delete_constraint(
      &self,
      _: Uuid,
    ) -> Result<RemoteChangeResponse, Self::Error> {
      Ok(RemoteChangeResponse {
        constraint_reference: None,
        subscribers:          vec![],
      })
    }

    async fn query_area(
      &self,
      _: &AreaOfInterest,
    ) -> Result<RemoteQueryResponse, Self::Error> {
      Ok(RemoteQueryResponse { constraint_references: vec![] })
    }
  }

  #[derive(Clone)]
  struct NullNotifier;

  impl SubscriberNotifier for NullNotifier {
    async fn notify_all(
      &self,
      _: Uuid,
      _: Option<&RemoteConstraint>,
      subscribers: &[Subscriber],
    ) -> FanoutReport {
      FanoutReport {
        attempted: subscribers.len(),
        delivered: subscribers.len(),
        failures:  vec![],
      }
    }
  }

  type TestState = AppState<SqliteStore, FakeRemote, NullNotifier>;

  async fn make_state() -> TestState {
    let store = SqliteStore::open_in_memory().await.unwrap();
    AppState {
      orchestrator: Arc::new(Orchestrator {
        store,
        remote: FakeRemote,
        notifier: NullNotifier,
        policy: HorizonPolicy::default(),
      }),
      config:       Arc::new(ServiceConfig {
        host:       "127.0.0.1".to_owned(),
        port:       8080,
        store_path: PathBuf::from(":memory:"),
        owner:      "strato.example.net".to_owned(),
        horizon:    HorizonPolicy::default(),
        dss:        DssConfig {
          base_url:      "https://dss.example.net/dss/v1".to_owned(),
          auth_base_url: "https://auth.example.net".to_owned(),
          client_id:     "id".to_owned(),
          client_secret: "secret".to_owned(),
          timeout_secs:  15,
        },
        notifier:   NotifierConfig {
          auth_base_url: "https://auth.example.net".to_owned(),
          client_id:     "id".to_owned(),
          client_secret: "secret".to_owned(),
          timeout_secs:  15,
          compat_hosts:  vec![],
        },
      }),
    }
  }

  fn bearer(scope: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload =
      URL_SAFE_NO_PAD.encode(json!({ "scope": scope }).to_string());
    format!("Bearer {header}.{payload}.sig")
  }

  fn manage() -> String { bearer("utm.constraint_management") }

  async fn send(
    state: TestState,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Value,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
      builder = builder.header(header::AUTHORIZATION, auth);
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();
    let resp = router(state).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  fn submission(start: i64, end: i64, lng_offset: f64) -> Value {
    let ring = [
      [103.8550 + lng_offset, 1.2887],
      [103.8535 + lng_offset, 1.2829],
      [103.8553 + lng_offset, 1.2805],
      [103.8550 + lng_offset, 1.2887],
    ];
    json!({
      "extents": [{
        "volume": {
          "outline_polygon": { "type": "Polygon", "coordinates": [ring] },
          "altitude_lower": { "reference": "W84", "units": "M", "value": 0.0 },
          "altitude_upper": { "reference": "W84", "units": "M", "value": 100.0 },
        },
        "time_start": {
          "format": "RFC3339",
          "value": chrono::DateTime::from_timestamp(start, 0).unwrap(),
        },
        "time_end": {
          "format": "RFC3339",
          "value": chrono::DateTime::from_timestamp(end, 0).unwrap(),
        },
      }],
      "uss_base_url": "https://uss.example.net",
    })
  }

  #[tokio::test]
  async fn missing_token_is_rejected_with_401() {
    let state = make_state().await;
    let t0 = Utc::now().timestamp() + 3600;
    let (status, body) = send(
      state,
      "POST",
      "/constraints/create/stc",
      None,
      submission(t0, t0 + 600, 0.0),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["state"], "Rejected");
  }

  #[tokio::test]
  async fn create_then_conflicting_create_is_409() {
    let state = make_state().await;
    let auth = manage();
    let t0 = Utc::now().timestamp() + 3600;

    let (status, body) = send(
      state.clone(),
      "POST",
      "/constraints/create/stc",
      Some(&auth),
      submission(t0, t0 + 600, 0.0),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["constraint"]["version"], 1);
    assert_eq!(body["constraint_reference"]["owner"], "dss.example.net");

    let (status, body) = send(
      state,
      "POST",
      "/constraints/create/stc",
      Some(&auth),
      submission(t0, t0 + 600, 0.0),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["overlap"], "spatial-temporal-overlap");
    assert_eq!(body["state"], "Rejected");
  }

  #[tokio::test]
  async fn update_increments_version_then_stale_update_fails() {
    let state = make_state().await;
    let auth = manage();
    let t0 = Utc::now().timestamp() + 3600;

    let (_, created) = send(
      state.clone(),
      "POST",
      "/constraints/create/stc",
      Some(&auth),
      submission(t0, t0 + 600, 0.0),
    )
    .await;
    let id = created["constraint"]["constraint_id"].as_str().unwrap().to_owned();

    let mut update = submission(t0, t0 + 600, 1.0);
    update["constraint_id"] = json!(id);
    update["old_version"] = json!(1);
    let (status, body) = send(
      state.clone(),
      "POST",
      "/constraints/update/stc",
      Some(&auth),
      update.clone(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["constraint"]["version"], 2);

    let (status, body) =
      send(state, "POST", "/constraints/update/stc", Some(&auth), update)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("version"));
  }

  #[tokio::test]
  async fn update_without_id_fails_the_schema_gate() {
    let state = make_state().await;
    let auth = manage();
    let t0 = Utc::now().timestamp() + 3600;

    let (status, body) = send(
      state,
      "POST",
      "/constraints/update/stc",
      Some(&auth),
      submission(t0, t0 + 600, 0.0),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["count"], 2);
    assert_eq!(body["log"].as_array().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn short_duration_stc_is_rejected_but_geozone_passes() {
    let state = make_state().await;
    let auth = manage();
    let t0 = Utc::now().timestamp() + 3600;

    let (status, _) = send(
      state.clone(),
      "POST",
      "/constraints/create/stc",
      Some(&auth),
      submission(t0, t0 + 60, 0.0),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
      state,
      "POST",
      "/constraints/create/gz",
      Some(&auth),
      submission(t0, t0 + 60, 0.0),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["constraint"]["category"], "Geozone");
  }

  #[tokio::test]
  async fn delete_then_query_is_404() {
    let state = make_state().await;
    let auth = manage();
    let t0 = Utc::now().timestamp() + 3600;

    let (_, created) = send(
      state.clone(),
      "POST",
      "/constraints/create/stc",
      Some(&auth),
      submission(t0, t0 + 600, 0.0),
    )
    .await;
    let id = created["constraint"]["constraint_id"].as_str().unwrap().to_owned();

    let (status, _) = send(
      state.clone(),
      "DELETE",
      &format!("/constraints/remove/{id}"),
      Some(&auth),
      Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
      state,
      "GET",
      &format!("/constraints/query/{id}"),
      Some(&auth),
      Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn astm_view_requires_consumption_scope() {
    let state = make_state().await;
    let auth = manage();
    let t0 = Utc::now().timestamp() + 3600;

    let (_, created) = send(
      state.clone(),
      "POST",
      "/constraints/create/stc",
      Some(&auth),
      submission(t0, t0 + 600, 0.0),
    )
    .await;
    let id = created["constraint"]["constraint_id"].as_str().unwrap().to_owned();

    // Management scope is not enough for the peer-facing read.
    let (status, _) = send(
      state.clone(),
      "GET",
      &format!("/uss/v1/constraints/{id}"),
      Some(&auth),
      Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let consume = bearer("utm.constraint_consumption");
    let (status, body) = send(
      state,
      "GET",
      &format!("/uss/v1/constraints/{id}"),
      Some(&consume),
      Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["constraint"]["reference"]["owner"], "dss.example.net");
    assert_eq!(body["constraint"]["details"]["type"], "STC");
  }

  #[tokio::test]
  async fn peer_notification_is_acknowledged() {
    let state = make_state().await;
    // Peers deliver notifications with the same scope our own fan-out
    // authenticates with, so it must be enough on the receiving side.
    let auth = bearer("utm.constraint_consumption");
    let (status, _) = send(
      state,
      "POST",
      "/uss/v1/constraints",
      Some(&auth),
      json!({
        "constraint_id": Uuid::new_v4(),
        "subscriptions": [],
      }),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
  }

  #[tokio::test]
  async fn active_queries_filter_by_time_and_category() {
    let state = make_state().await;
    let auth = manage();
    let t0 = Utc::now().timestamp() + 3600;

    send(
      state.clone(),
      "POST",
      "/constraints/create/stc",
      Some(&auth),
      submission(t0, t0 + 600, 0.0),
    )
    .await;
    send(
      state.clone(),
      "POST",
      "/constraints/create/gz",
      Some(&auth),
      submission(t0, t0 + 600, 1.0),
    )
    .await;

    let (status, body) = send(
      state.clone(),
      "GET",
      &format!("/constraints/query/active/{t0}"),
      Some(&auth),
      Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(
      state.clone(),
      "GET",
      "/constraints/query/type/STC",
      Some(&auth),
      Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(
      state,
      "GET",
      "/constraints/query/global",
      Some(&auth),
      Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
  }
}
