//! Best-effort notification fan-out to subscriber USS systems.
//!
//! Every subscriber the DSS names gets exactly one `POST
//! {uss_base_url}/uss/v1/constraints` with the reference/details payload
//! (or a tombstone payload with no `constraint` key on delete). Each
//! delivery authenticates separately, so one recipient's auth problem
//! never blocks the rest. Failures are logged and reported — never
//! retried.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tokio::task::JoinSet;
use uuid::Uuid;

use strato_core::remote::{
  DeliveryFailure, FanoutReport, Notification, RemoteConstraint, Subscriber,
  SubscriberNotifier,
};

use crate::{Result, SCOPE_CONSTRAINT_CONSUMPTION, authenticate, read_error};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Settings for outbound subscriber notifications. Credentials are
/// separate from the DSS gateway's — the audience differs.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
  pub auth_base_url: String,
  pub client_id:     String,
  pub client_secret: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:  u64,
  /// Hosts that reject rings with an explicit closing vertex; deliveries
  /// to them get the closing vertex stripped first.
  #[serde(default)]
  pub compat_hosts:  Vec<String>,
}

fn default_timeout_secs() -> u64 { 15 }

// ─── Notifier ────────────────────────────────────────────────────────────────

/// HTTP implementation of [`SubscriberNotifier`]. Cheap to clone.
#[derive(Clone)]
pub struct HttpNotifier {
  client: Client,
  config: NotifierConfig,
}

impl HttpNotifier {
  pub fn new(config: NotifierConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, config })
  }

  fn wants_open_ring(&self, uss_base_url: &str) -> bool {
    self
      .config
      .compat_hosts
      .iter()
      .any(|host| uss_base_url.contains(host.as_str()))
  }

  async fn deliver(
    client: Client,
    config: NotifierConfig,
    url: String,
    notification: Notification,
  ) -> Result<()> {
    let token = authenticate(
      &client,
      &config.auth_base_url,
      &config.client_id,
      &config.client_secret,
      SCOPE_CONSTRAINT_CONSUMPTION,
    )
    .await?;

    let resp = client
      .post(&url)
      .bearer_auth(token)
      .json(&notification)
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(read_error(resp).await);
    }
    Ok(())
  }
}

/// Drop the explicit closing vertex from every ring in the payload.
///
/// Some recipients validate `outline_polygon.vertices` as an open ring
/// and reject a repeated first vertex. Only applied when the first and
/// last vertices actually coincide.
fn strip_closing_vertices(constraint: &mut RemoteConstraint) {
  for extent in &mut constraint.details.volumes {
    let vertices = &mut extent.volume.outline_polygon.vertices;
    if vertices.len() > 3 && vertices.first() == vertices.last() {
      vertices.pop();
    }
  }
}

impl SubscriberNotifier for HttpNotifier {
  async fn notify_all(
    &self,
    constraint_id: Uuid,
    constraint: Option<&RemoteConstraint>,
    subscribers: &[Subscriber],
  ) -> FanoutReport {
    let mut tasks: JoinSet<std::result::Result<(), DeliveryFailure>> =
      JoinSet::new();

    for subscriber in subscribers {
      let url = format!(
        "{}/uss/v1/constraints",
        subscriber.uss_base_url.trim_end_matches('/')
      );

      let body = constraint.map(|c| {
        let mut c = c.clone();
        if self.wants_open_ring(&subscriber.uss_base_url) {
          strip_closing_vertices(&mut c);
        }
        c
      });
      let notification = Notification {
        constraint_id,
        constraint: body,
        subscriptions: subscriber.subscriptions.clone(),
      };

      let client = self.client.clone();
      let config = self.config.clone();
      let base_url = subscriber.uss_base_url.clone();
      tasks.spawn(async move {
        Self::deliver(client, config, url, notification)
          .await
          .map_err(|err| DeliveryFailure {
            uss_base_url: base_url,
            detail:       err.to_string(),
          })
      });
    }

    let mut report = FanoutReport {
      attempted: subscribers.len(),
      ..FanoutReport::default()
    };
    while let Some(joined) = tasks.join_next().await {
      match joined {
        Ok(Ok(())) => report.delivered += 1,
        Ok(Err(failure)) => {
          tracing::warn!(
            constraint_id = %constraint_id,
            uss_base_url = %failure.uss_base_url,
            detail = %failure.detail,
            "notification delivery failed"
          );
          report.failures.push(failure);
        }
        Err(join_err) => {
          tracing::warn!(
            constraint_id = %constraint_id,
            error = %join_err,
            "notification task panicked"
          );
          report.failures.push(DeliveryFailure {
            uss_base_url: String::new(),
            detail:       join_err.to_string(),
          });
        }
      }
    }
    report
  }
}
