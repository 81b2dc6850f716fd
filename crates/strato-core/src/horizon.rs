//! Time-horizon validation.
//!
//! The generic rule applies to every category; the ASTM short-term rules
//! apply to STC submissions only. Conditions are checked sequentially and
//! the first failure wins, in the order the policy text lists them.

use serde::Deserialize;
use thiserror::Error;

// ─── Policy ──────────────────────────────────────────────────────────────────

const DAY_SECS: i64 = 86_400;

/// Tunable bounds for the short-term rules. The defaults are the ASTM
/// figures: submit at most 56 days ahead, duration within [5 min, 24 h].
#[derive(Debug, Clone, Deserialize)]
pub struct HorizonPolicy {
  /// Latest allowed start, as seconds past submission time.
  pub max_lead_secs:     i64,
  pub min_duration_secs: i64,
  pub max_duration_secs: i64,
  /// Earliest allowed start, as seconds past submission time. The rule
  /// exists in the policy text but is currently disabled in operations,
  /// so it defaults to `None` rather than being removed outright.
  pub min_lead_secs:     Option<i64>,
}

impl Default for HorizonPolicy {
  fn default() -> Self {
    Self {
      max_lead_secs:     56 * DAY_SECS,
      min_duration_secs: 300,
      max_duration_secs: DAY_SECS,
      min_lead_secs:     None,
    }
  }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HorizonError {
  #[error(
    "proposed constraint time horizon is invalid, time_start must be \
     defined prior to time_end"
  )]
  StartAfterEnd,

  #[error(
    "proposed constraint must be made available at least {0} seconds \
     prior to its effective time"
  )]
  InsufficientLeadTime(i64),

  #[error(
    "proposed constraint can only be made available up to 56 days before \
     its effective time"
  )]
  TooFarAhead,

  #[error("proposed constraint must adhere to the minimum duration of 5 minutes")]
  TooShort,

  #[error("proposed constraint must adhere to the maximum duration of 24 hours")]
  TooLong,
}

// ─── Validators ──────────────────────────────────────────────────────────────

/// The category-independent rule: start must not come after end.
pub fn validate_generic(start: i64, end: i64) -> Result<(), HorizonError> {
  if start <= end {
    Ok(())
  } else {
    Err(HorizonError::StartAfterEnd)
  }
}

/// The ASTM short-term rules, evaluated against `now` (unix seconds).
///
/// Order matters: lead-time (when enabled), then the 56-day ceiling, then
/// minimum duration, then maximum duration. First failure wins.
pub fn validate_short_term(
  start: i64,
  end: i64,
  now: i64,
  policy: &HorizonPolicy,
) -> Result<(), HorizonError> {
  let duration = end - start;

  if let Some(min_lead) = policy.min_lead_secs
    && start < now + min_lead
  {
    return Err(HorizonError::InsufficientLeadTime(min_lead));
  }
  if start > now + policy.max_lead_secs {
    return Err(HorizonError::TooFarAhead);
  }
  if duration < policy.min_duration_secs {
    return Err(HorizonError::TooShort);
  }
  if duration > policy.max_duration_secs {
    return Err(HorizonError::TooLong);
  }
  Ok(())
}
