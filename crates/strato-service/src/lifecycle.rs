//! The constraint lifecycle orchestrator.
//!
//! Create, update, and delete all follow the same shape: validate,
//! write locally, mirror to the DSS, fan out notifications. The local
//! write is the point of no return — a store failure fails the request,
//! while remote-sync and notification failures are reported as warnings
//! on an otherwise successful response. The system favours local
//! durability over cross-system consistency.

use chrono::Utc;
use uuid::Uuid;

use strato_core::{
  conflict,
  constraint::{
    Constraint, ConstraintCategory, ConstraintState, Extent, NewConstraint,
    check_version,
  },
  horizon::{HorizonPolicy, validate_generic, validate_short_term},
  remote::{
    RemoteChangeResponse, RemoteOutcome, RemoteSync, SubscriberNotifier,
    to_remote_constraint, to_remote_submission,
  },
  store::ConstraintStore,
};

use crate::error::{Error, Result};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result of an accepted create or update: the persisted record, the DSS
/// response when the mirror write succeeded, and any partial-failure
/// warnings accumulated along the way.
#[derive(Debug)]
pub struct ChangeOutcome {
  pub constraint: Constraint,
  pub remote:     Option<RemoteChangeResponse>,
  pub warnings:   Vec<String>,
}

/// Result of an accepted delete.
#[derive(Debug)]
pub struct DeleteOutcome {
  pub constraint_id: Uuid,
  pub warnings:      Vec<String>,
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

pub struct Orchestrator<S, R, N> {
  pub store:    S,
  pub remote:   R,
  pub notifier: N,
  pub policy:   HorizonPolicy,
}

impl<S, R, N> Orchestrator<S, R, N>
where
  S: ConstraintStore,
  S::Error: std::error::Error + Send + Sync + 'static,
  R: RemoteSync,
  N: SubscriberNotifier,
{
  fn store_err(e: S::Error) -> Error { Error::Store(Box::new(e)) }

  async fn validate(
    &self,
    category: ConstraintCategory,
    extent: &Extent,
    exclude: Option<Uuid>,
  ) -> Result<()> {
    validate_generic(extent.start_unix(), extent.end_unix())?;

    if category.astm_horizon_checked() {
      validate_short_term(
        extent.start_unix(),
        extent.end_unix(),
        Utc::now().timestamp(),
        &self.policy,
      )?;
    }

    if category.conflict_checked() {
      let verdict = conflict::evaluate(&self.store, extent, exclude)
        .await
        .map_err(Self::store_err)?;
      if !verdict.admitted {
        return Err(Error::Conflict(verdict.overlap));
      }
      tracing::debug!(overlap = ?verdict.overlap, "conflict check admitted");
    }
    Ok(())
  }

  /// Mirror an accepted local write to the DSS and notify subscribers.
  ///
  /// Never fails: every problem lands in the returned warnings, and the
  /// raw outcome is attached to the local row for later reconciliation.
  async fn sync_and_notify(
    &self,
    constraint: &Constraint,
  ) -> (Option<RemoteChangeResponse>, Vec<String>) {
    let mut warnings = Vec::new();
    let submission = to_remote_submission(constraint);

    let response = match self.remote.put_constraint(&submission).await {
      Ok(response) => response,
      Err(e) => {
        tracing::warn!(
          constraint_id = %constraint.constraint_id,
          error = %e,
          "remote sync failed; local record stands"
        );
        warnings.push(format!("remote sync failed: {e}"));
        self
          .attach_outcome(
            constraint.constraint_id,
            &RemoteOutcome::Failed { detail: e.to_string() },
          )
          .await;
        return (None, warnings);
      }
    };

    self
      .attach_outcome(
        constraint.constraint_id,
        &RemoteOutcome::Synced { response: response.clone() },
      )
      .await;

    let body = response
      .constraint_reference
      .clone()
      .map(|reference| to_remote_constraint(constraint, reference));
    let report = self
      .notifier
      .notify_all(
        constraint.constraint_id,
        body.as_ref(),
        &response.subscribers,
      )
      .await;
    if !report.all_delivered() {
      warnings.push(format!(
        "notification delivery incomplete: {}/{} delivered",
        report.delivered, report.attempted
      ));
    }

    (Some(response), warnings)
  }

  /// Best-effort secondary write; failure is logged, never surfaced.
  async fn attach_outcome(&self, id: Uuid, outcome: &RemoteOutcome) {
    if let Err(e) = self.store.attach_remote_outcome(id, outcome).await {
      tracing::warn!(
        constraint_id = %id,
        error = %e,
        "failed to persist remote outcome"
      );
    }
  }

  // ─── Operations ────────────────────────────────────────────────────────────

  pub async fn create(
    &self,
    category: ConstraintCategory,
    extent: Extent,
    uss_base_url: String,
  ) -> Result<ChangeOutcome> {
    self.validate(category, &extent, None).await?;

    let constraint = self
      .store
      .create(NewConstraint {
        category,
        state: ConstraintState::Accepted,
        extent,
        uss_base_url,
      })
      .await
      .map_err(Self::store_err)?;
    tracing::info!(
      constraint_id = %constraint.constraint_id,
      category = category.as_str(),
      "constraint created"
    );

    let (remote, warnings) = self.sync_and_notify(&constraint).await;
    Ok(ChangeOutcome { constraint, remote, warnings })
  }

  pub async fn update(
    &self,
    id: Uuid,
    expected_version: u32,
    category: ConstraintCategory,
    extent: Extent,
    uss_base_url: String,
  ) -> Result<ChangeOutcome> {
    let existing = self
      .store
      .get(id)
      .await
      .map_err(Self::store_err)?
      .ok_or(Error::NotFound(id))?;
    check_version(expected_version, existing.version)?;

    // The record being replaced never conflicts with its own prior self.
    self.validate(category, &extent, Some(id)).await?;

    let constraint = Constraint {
      constraint_id: id,
      category,
      version: existing.version + 1,
      state: ConstraintState::Accepted,
      extent,
      uss_base_url,
      time_created: existing.time_created,
      time_updated: Utc::now(),
    };
    self
      .store
      .update(&constraint)
      .await
      .map_err(Self::store_err)?;
    tracing::info!(
      constraint_id = %id,
      version = constraint.version,
      "constraint updated"
    );

    let (remote, warnings) = self.sync_and_notify(&constraint).await;
    Ok(ChangeOutcome { constraint, remote, warnings })
  }

  /// Delete is never conflict-checked. Remote failures embed a warning;
  /// the local delete stands either way.
  pub async fn delete(&self, id: Uuid) -> Result<DeleteOutcome> {
    self
      .store
      .get(id)
      .await
      .map_err(Self::store_err)?
      .ok_or(Error::NotFound(id))?;

    self.store.delete(id).await.map_err(Self::store_err)?;
    tracing::info!(constraint_id = %id, "constraint deleted");

    let mut warnings = Vec::new();
    match self.remote.delete_constraint(id).await {
      Ok(response) => {
        // Delete-shaped payload: id and subscriptions only, no body.
        let report = self
          .notifier
          .notify_all(id, None, &response.subscribers)
          .await;
        if !report.all_delivered() {
          warnings.push(format!(
            "notification delivery incomplete: {}/{} delivered",
            report.delivered, report.attempted
          ));
        }
      }
      Err(e) => {
        tracing::warn!(
          constraint_id = %id,
          error = %e,
          "remote delete failed; local delete stands"
        );
        warnings.push(format!("remote delete failed: {e}"));
      }
    }

    Ok(DeleteOutcome { constraint_id: id, warnings })
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
