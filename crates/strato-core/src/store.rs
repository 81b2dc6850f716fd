//! The `ConstraintStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g.
//! `strato-store-sqlite`). Higher layers (the service, the conflict
//! validator) depend on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  constraint::{Constraint, ConstraintCategory, ConstraintState, NewConstraint},
  remote::RemoteOutcome,
};

// ─── Summary row ─────────────────────────────────────────────────────────────

/// The reduced projection returned by [`ConstraintStore::list_summaries`];
/// enough to render a global listing without shipping full extents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintSummary {
  pub constraint_id: Uuid,
  pub uss_base_url:  String,
  pub time_created:  DateTime<Utc>,
  pub time_start:    i64,
  pub time_end:      i64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a constraint store backend.
///
/// All reads and writes are point operations against a single logical
/// table; there are no multi-row transactions. Any I/O failure surfaces as
/// the backend's error with no partial row mutation.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ConstraintStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Retrieve a constraint by id. Returns `None` if not found.
  fn get(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Constraint>, Self::Error>> + Send + '_;

  /// Persist a new constraint. The store assigns the id, sets the version
  /// to 1 regardless of any client-supplied value, and stamps both
  /// timestamps.
  fn create(
    &self,
    input: NewConstraint,
  ) -> impl Future<Output = Result<Constraint, Self::Error>> + Send + '_;

  /// Full overwrite keyed by `constraint.constraint_id`. The caller has
  /// already incremented the version; the store writes what it is given.
  fn update(
    &self,
    constraint: &Constraint,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send;

  /// Hard delete by id. No tombstone. Deleting an absent id is a no-op at
  /// this layer; existence checks belong to the caller.
  fn delete(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All constraints in `state` whose `time_end` is at or past
  /// `min_time_end`. No ordering guarantee.
  fn active_by_state(
    &self,
    state: ConstraintState,
    min_time_end: i64,
  ) -> impl Future<Output = Result<Vec<Constraint>, Self::Error>> + Send + '_;

  /// All constraints of `category` whose `time_end` is at or past
  /// `min_time_end`, optionally excluding one id (the update path excludes
  /// the record being replaced). No ordering guarantee.
  fn active_by_category(
    &self,
    category: ConstraintCategory,
    min_time_end: i64,
    exclude: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Constraint>, Self::Error>> + Send + '_;

  /// Attach the remote-sync outcome to an already-written row. This is the
  /// post-write enrichment step; it never creates the row.
  fn attach_remote_outcome(
    &self,
    id: Uuid,
    outcome: &RemoteOutcome,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send;

  /// The remote-sync outcome previously attached to a row, if any.
  fn remote_outcome(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<RemoteOutcome>, Self::Error>> + Send + '_;

  /// Reduced projection of every stored constraint.
  fn list_summaries(
    &self,
  ) -> impl Future<Output = Result<Vec<ConstraintSummary>, Self::Error>> + Send + '_;
}
