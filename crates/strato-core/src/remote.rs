//! Remote (DSS-side) wire format, the pure translator between it and the
//! internal representation, and the trait seams for the gateway and the
//! notification fan-out.
//!
//! Two polygon conventions exist: the internal paired-coordinate-list form
//! and the remote explicit lat/lng vertex form. The translator also
//! carries the version offset-by-one invariant — the remote system is
//! always written one step after the local one, from the pre-increment
//! view, so `remote_version = local_version - 1` at the moment of the
//! remote write.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constraint::{
  Altitude, Constraint, ConstraintCategory, ConstraintState, Extent,
  OutlinePolygon, TimePoint, Volume,
};

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteVertex {
  pub lat: f64,
  pub lng: f64,
}

/// The remote polygon convention: explicit vertex objects, no ring
/// nesting and no `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePolygon {
  pub vertices: Vec<RemoteVertex>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteVolume {
  pub outline_polygon: RemotePolygon,
  pub altitude_lower:  Altitude,
  pub altitude_upper:  Altitude,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteExtent {
  pub volume:     RemoteVolume,
  pub time_start: TimePoint,
  pub time_end:   TimePoint,
}

/// The body of `PUT /constraint_references/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSubmission {
  pub constraint_id: Uuid,
  pub extents:       Vec<RemoteExtent>,
  /// One behind the local version — see the module docs.
  pub old_version:   u32,
  pub state:         ConstraintState,
  pub uss_base_url:  String,
}

/// The reference metadata the remote side assigns: its owner token, the
/// opacity token ("ovn") proving up-to-date knowledge for future
/// mutations, and the remote version counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintReference {
  pub id:           Uuid,
  pub owner:        String,
  pub version:      u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ovn:          Option<String>,
  pub time_start:   TimePoint,
  pub time_end:     TimePoint,
  pub uss_base_url: String,
}

/// One `{subscriptionId, notificationIndex}` token from the remote side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionToken {
  pub subscription_id:    Uuid,
  pub notification_index: u32,
}

/// A subscriber the remote side says must be notified: its callback base
/// URL plus the subscription tokens to echo back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
  pub uss_base_url:  String,
  pub subscriptions: Vec<SubscriptionToken>,
}

/// Response of the remote PUT and DELETE mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteChangeResponse {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub constraint_reference: Option<ConstraintReference>,
  #[serde(default)]
  pub subscribers:          Vec<Subscriber>,
}

/// Response of the remote area query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteQueryResponse {
  #[serde(default)]
  pub constraint_references: Vec<ConstraintReference>,
}

/// Body of `POST /constraint_references/query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaOfInterest {
  pub area_of_interest: RemoteExtent,
}

// ─── Reference/details split ─────────────────────────────────────────────────

/// The detail half of the split representation sent to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintDetails {
  pub volumes: Vec<RemoteExtent>,
  #[serde(rename = "type")]
  pub kind:    ConstraintCategory,
  pub state:   ConstraintState,
}

/// The full reference/details representation of a constraint, as carried
/// inside subscriber notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConstraint {
  pub reference: ConstraintReference,
  pub details:   ConstraintDetails,
}

/// Payload POSTed to each subscriber. `constraint` is omitted for delete
/// notifications — its absence is what tells the recipient the entity is
/// gone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
  pub constraint_id: Uuid,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub constraint:    Option<RemoteConstraint>,
  pub subscriptions: Vec<SubscriptionToken>,
}

// ─── Sync outcome (persisted) ────────────────────────────────────────────────

/// What happened on the remote write, retained alongside the local row for
/// later reconciliation. Never part of the admission decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RemoteOutcome {
  Synced { response: RemoteChangeResponse },
  Failed { detail: String },
}

// ─── Translator ──────────────────────────────────────────────────────────────

/// Paired-coordinate ring to explicit vertex objects.
pub fn to_remote_polygon(p: &OutlinePolygon) -> RemotePolygon {
  RemotePolygon {
    vertices: p
      .ring()
      .iter()
      .map(|&[lng, lat]| RemoteVertex { lat, lng })
      .collect(),
  }
}

/// Explicit vertex objects back to a paired-coordinate ring.
pub fn to_local_polygon(p: &RemotePolygon) -> OutlinePolygon {
  OutlinePolygon::new(p.vertices.iter().map(|v| [v.lng, v.lat]).collect())
}

pub fn to_remote_volume(v: &Volume) -> RemoteVolume {
  RemoteVolume {
    outline_polygon: to_remote_polygon(&v.outline_polygon),
    altitude_lower:  v.altitude_lower.clone(),
    altitude_upper:  v.altitude_upper.clone(),
  }
}

pub fn to_remote_extent(e: &Extent) -> RemoteExtent {
  RemoteExtent {
    volume:     to_remote_volume(&e.volume),
    time_start: e.time_start.clone(),
    time_end:   e.time_end.clone(),
  }
}

/// Build the remote PUT body from a freshly-written local record.
///
/// The submitted version is the local one minus one: the local write has
/// already happened, so the remote mutation must present the
/// pre-increment view.
pub fn to_remote_submission(c: &Constraint) -> RemoteSubmission {
  RemoteSubmission {
    constraint_id: c.constraint_id,
    extents:       vec![to_remote_extent(&c.extent)],
    old_version:   c.version.saturating_sub(1),
    state:         c.state,
    uss_base_url:  c.uss_base_url.clone(),
  }
}

/// Assemble the reference/details split carried in notifications, pairing
/// the local record with the reference the remote side returned.
pub fn to_remote_constraint(
  c: &Constraint,
  reference: ConstraintReference,
) -> RemoteConstraint {
  RemoteConstraint {
    reference,
    details: ConstraintDetails {
      volumes: vec![to_remote_extent(&c.extent)],
      kind:    c.category,
      state:   c.state,
    },
  }
}

// ─── Trait seams ─────────────────────────────────────────────────────────────

/// The external DSS, seen through its request/response contract. Callers
/// re-authenticate per operation; any transport or auth failure comes back
/// as a structured error with no retry — the orchestrator decides how to
/// degrade.
pub trait RemoteSync: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Idempotent upsert keyed by the submission's constraint id.
  fn put_constraint(
    &self,
    submission: &RemoteSubmission,
  ) -> impl Future<Output = Result<RemoteChangeResponse, Self::Error>> + Send;

  fn delete_constraint(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<RemoteChangeResponse, Self::Error>> + Send + '_;

  /// Area query pass-through; not on the critical path of any mutation.
  fn query_area(
    &self,
    area: &AreaOfInterest,
  ) -> impl Future<Output = Result<RemoteQueryResponse, Self::Error>> + Send;
}

/// Per-subscriber delivery record from one fan-out pass.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryFailure {
  pub uss_base_url: String,
  pub detail:       String,
}

/// Result of one fan-out pass. Delivery is best-effort: failures are
/// recorded here, never retried, and never unwind anything.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FanoutReport {
  pub attempted: usize,
  pub delivered: usize,
  pub failures:  Vec<DeliveryFailure>,
}

impl FanoutReport {
  pub fn all_delivered(&self) -> bool { self.failures.is_empty() }
}

/// Best-effort notification fan-out to third-party USS systems.
pub trait SubscriberNotifier: Send + Sync {
  /// Notify every subscriber once. `constraint` is `None` for delete
  /// notifications. Must not fail as a whole — per-recipient errors land
  /// in the report.
  fn notify_all(
    &self,
    constraint_id: Uuid,
    constraint: Option<&RemoteConstraint>,
    subscribers: &[Subscriber],
  ) -> impl Future<Output = FanoutReport> + Send;
}
