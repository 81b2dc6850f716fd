//! HTTP client layer for the external DSS and for subscriber USS systems.
//!
//! [`DssGateway`] implements [`strato_core::remote::RemoteSync`];
//! [`HttpNotifier`] implements
//! [`strato_core::remote::SubscriberNotifier`]. Both re-authenticate with
//! client credentials per operation and bound every request with a
//! timeout. Neither retries: a transport or auth failure comes back as a
//! structured error and the orchestrator decides how to degrade.

pub mod error;
pub mod notify;

pub use error::{Error, Result};
pub use notify::HttpNotifier;

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use uuid::Uuid;

use strato_core::remote::{
  AreaOfInterest, RemoteChangeResponse, RemoteQueryResponse, RemoteSubmission,
  RemoteSync,
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Connection settings for the DSS and the auth server that fronts it.
#[derive(Debug, Clone, Deserialize)]
pub struct DssConfig {
  /// e.g. `https://dss.example.net/dss/v1`
  pub base_url:      String,
  /// e.g. `https://auth.example.net`
  pub auth_base_url: String,
  pub client_id:     String,
  pub client_secret: String,
  /// Per-request bound; an expired call is treated as failed.
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:  u64,
}

fn default_timeout_secs() -> u64 { 15 }

/// Scope used for DSS constraint-reference mutations.
pub const SCOPE_CONSTRAINT_MANAGEMENT: &str = "utm.constraint_management";
/// Scope used when pushing notifications to subscriber USSs.
pub const SCOPE_CONSTRAINT_CONSUMPTION: &str = "utm.constraint_consumption";

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token: String,
}

/// Fetch a client-credentials bearer token scoped to `scope`.
///
/// Tokens are short-lived and deliberately not cached across calls —
/// every operation authenticates afresh, so a stale token can never be a
/// correctness problem.
pub(crate) async fn authenticate(
  client: &Client,
  auth_base_url: &str,
  client_id: &str,
  client_secret: &str,
  scope: &str,
) -> Result<String> {
  let url = format!(
    "{}/oauth2/token?grant_type=client_credentials&scope={scope}\
     &client_id={client_id}&client_secret={client_secret}\
     &audience={client_id}",
    auth_base_url.trim_end_matches('/'),
  );

  let resp = client
    .post(&url)
    .header("Content-Type", "application/x-www-form-urlencoded")
    .send()
    .await?;

  let status = resp.status();
  if !status.is_success() {
    let body = resp.text().await.unwrap_or_default();
    return Err(Error::Auth { status: status.as_u16(), body });
  }

  let token: TokenResponse = resp.json().await?;
  Ok(token.access_token)
}

pub(crate) async fn read_error(resp: reqwest::Response) -> Error {
  let status = resp.status().as_u16();
  let body = resp.text().await.unwrap_or_default();
  Error::Remote { status, body }
}

// ─── Gateway ─────────────────────────────────────────────────────────────────

/// Async HTTP client for the DSS constraint-reference API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct DssGateway {
  client: Client,
  config: DssConfig,
}

impl DssGateway {
  pub fn new(config: DssConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{path}", self.config.base_url.trim_end_matches('/'))
  }
}

impl RemoteSync for DssGateway {
  type Error = Error;

  /// `PUT /constraint_references/{id}` — idempotent upsert.
  async fn put_constraint(
    &self,
    submission: &RemoteSubmission,
  ) -> Result<RemoteChangeResponse> {
    let token = authenticate(
      &self.client,
      &self.config.auth_base_url,
      &self.config.client_id,
      &self.config.client_secret,
      SCOPE_CONSTRAINT_MANAGEMENT,
    )
    .await?;

    let url =
      self.url(&format!("/constraint_references/{}", submission.constraint_id));
    let resp = self
      .client
      .put(&url)
      .bearer_auth(token)
      .json(submission)
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(read_error(resp).await);
    }
    Ok(resp.json().await?)
  }

  /// `DELETE /constraint_references/{id}`.
  async fn delete_constraint(&self, id: Uuid) -> Result<RemoteChangeResponse> {
    let token = authenticate(
      &self.client,
      &self.config.auth_base_url,
      &self.config.client_id,
      &self.config.client_secret,
      SCOPE_CONSTRAINT_MANAGEMENT,
    )
    .await?;

    let url = self.url(&format!("/constraint_references/{id}"));
    let resp = self.client.delete(&url).bearer_auth(token).send().await?;

    if !resp.status().is_success() {
      return Err(read_error(resp).await);
    }
    Ok(resp.json().await?)
  }

  /// `POST /constraint_references/query` — area query pass-through.
  async fn query_area(
    &self,
    area: &AreaOfInterest,
  ) -> Result<RemoteQueryResponse> {
    let token = authenticate(
      &self.client,
      &self.config.auth_base_url,
      &self.config.client_id,
      &self.config.client_secret,
      SCOPE_CONSTRAINT_MANAGEMENT,
    )
    .await?;

    let url = self.url("/constraint_references/query");
    let resp = self
      .client
      .post(&url)
      .bearer_auth(token)
      .json(area)
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(read_error(resp).await);
    }
    Ok(resp.json().await?)
  }
}
