//! The service error taxonomy and its axum `IntoResponse` mapping.
//!
//! Every rejection body carries `state: "Rejected"` next to a
//! human-readable message; schema failures additionally carry the full
//! validation log and its count. Store failures map to a generic 500 —
//! underlying storage detail never reaches the client.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use strato_core::{conflict::OverlapKind, horizon::HorizonError};

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  /// Schema-gate failure: one message per violated rule.
  #[error("payload failed schema validation ({} problems)", .0.len())]
  Payload(Vec<String>),

  #[error(transparent)]
  Horizon(#[from] HorizonError),

  #[error(
    "submitted version {submitted} does not match stored version {stored}"
  )]
  VersionConflict { submitted: u32, stored: u32 },

  #[error("proposed constraint conflicts with an active constraint")]
  Conflict(OverlapKind),

  #[error("no constraint found with id {0}")]
  NotFound(Uuid),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("remote query failed: {0}")]
  RemoteQuery(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

fn reject(status: StatusCode, message: String) -> Response {
  (status, Json(json!({ "message": message, "state": "Rejected" })))
    .into_response()
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized(reason) => {
        reject(StatusCode::UNAUTHORIZED, reason)
      }
      Error::Forbidden(reason) => reject(StatusCode::FORBIDDEN, reason),
      Error::Payload(log) => (
        StatusCode::BAD_REQUEST,
        Json(json!({
          "message": "payload failed schema validation",
          "log":     log,
          "count":   log.len(),
          "state":   "Rejected",
        })),
      )
        .into_response(),
      Error::Horizon(e) => reject(StatusCode::BAD_REQUEST, e.to_string()),
      Error::VersionConflict { .. } => {
        reject(StatusCode::BAD_REQUEST, self.to_string())
      }
      Error::Conflict(kind) => (
        StatusCode::CONFLICT,
        Json(json!({
          "message": "proposed constraint conflicts with an active constraint",
          "overlap": kind,
          "state":   "Rejected",
        })),
      )
        .into_response(),
      Error::NotFound(_) => reject(StatusCode::NOT_FOUND, self.to_string()),
      Error::Store(e) => {
        tracing::error!(error = %e, "constraint store operation failed");
        reject(
          StatusCode::INTERNAL_SERVER_ERROR,
          "constraint operation failed".to_owned(),
        )
      }
      Error::RemoteQuery(detail) => {
        reject(StatusCode::BAD_GATEWAY, detail)
      }
    }
  }
}

impl From<strato_core::Error> for Error {
  fn from(e: strato_core::Error) -> Self {
    match e {
      strato_core::Error::ConstraintNotFound(id) => Error::NotFound(id),
      strato_core::Error::VersionMismatch { submitted, stored } => {
        Error::VersionConflict { submitted, stored }
      }
      other => Error::Store(Box::new(other)),
    }
  }
}
