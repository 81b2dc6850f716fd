//! Bearer-token scope gate.
//!
//! The gate inspects the token's payload claims only; signature
//! verification belongs to the issuing infrastructure in front of this
//! service. A request passes when its token carries at least one of the
//! scopes the route requires.

use axum::http::{HeaderMap, header};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::error::Error;

/// Scopes allowed to mutate constraints.
pub const MANAGEMENT_SCOPES: &[&str] =
  &["utm.constraint_management", "utm.strategic_coordination"];
/// Scopes allowed to read the ASTM constraint view. Spans the interUSS
/// 0.3.5 and 0.3.8 vocabularies; 0.3.8 uses `utm.constraint_ingestion`.
pub const CONSUMPTION_SCOPES: &[&str] = &[
  "utm.strategic_coordination",
  "utm.constraint_consumption",
  "utm.constraint_ingestion",
];
/// Scopes peers may present when pushing constraint notifications. Our
/// own fan-out emitter authenticates with `utm.constraint_consumption`,
/// so two instances of this service can notify each other.
pub const NOTIFICATION_SCOPES: &[&str] = &[
  "utm.strategic_coordination",
  "utm.constraint_consumption",
  "utm.constraint_management",
];

#[derive(Debug, Deserialize)]
struct TokenClaims {
  #[serde(default)]
  scope: String,
  #[serde(default)]
  sub:   Option<String>,
}

/// The claims extracted from an accepted token.
#[derive(Debug, Clone)]
pub struct Authorized {
  pub scopes:  Vec<String>,
  pub subject: Option<String>,
}

fn decode_claims(token: &str) -> Option<TokenClaims> {
  // header.payload.signature — only the payload matters here.
  let payload = token.split('.').nth(1)?;
  let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
  serde_json::from_slice(&bytes).ok()
}

/// Check the `Authorization` header against a required-scope set.
///
/// Missing or malformed credentials are `Unauthorized`; a well-formed
/// token without any required scope is `Forbidden`.
pub fn authorize(
  headers: &HeaderMap,
  required: &[&str],
) -> Result<Authorized, Error> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or_else(|| {
      Error::Unauthorized("missing Authorization header".to_owned())
    })?;

  let token = header_val.strip_prefix("Bearer ").ok_or_else(|| {
    Error::Unauthorized("Authorization header is not a bearer token".to_owned())
  })?;

  let claims = decode_claims(token).ok_or_else(|| {
    Error::Unauthorized("bearer token payload cannot be decoded".to_owned())
  })?;

  // The scope claim joins multiple scopes with spaces or `+`.
  let scopes: Vec<String> = claims
    .scope
    .split([' ', '+'])
    .filter(|s| !s.is_empty())
    .map(str::to_owned)
    .collect();

  if !scopes.iter().any(|s| required.contains(&s.as_str())) {
    return Err(Error::Forbidden(format!(
      "token scope does not include any of: {}",
      required.join(", ")
    )));
  }

  Ok(Authorized { scopes, subject: claims.sub })
}
