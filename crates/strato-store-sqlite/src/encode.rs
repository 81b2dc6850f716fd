//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, the extent as compact JSON,
//! UUIDs as hyphenated lowercase strings. The unix-seconds time columns
//! are plain integers.

use chrono::{DateTime, Utc};
use strato_core::{
  constraint::{Constraint, ConstraintCategory, ConstraintState, Extent},
  store::ConstraintSummary,
};
use uuid::Uuid;

use crate::{Error, Result};

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `constraints` row.
pub struct RawConstraint {
  pub constraint_id: String,
  pub category:      String,
  pub version:       u32,
  pub state:         String,
  pub extent_json:   String,
  pub uss_base_url:  String,
  pub time_created:  String,
  pub time_updated:  String,
}

impl RawConstraint {
  pub fn into_constraint(self) -> Result<Constraint> {
    let extent: Extent = serde_json::from_str(&self.extent_json)?;
    Ok(Constraint {
      constraint_id: decode_uuid(&self.constraint_id)?,
      category: ConstraintCategory::parse(&self.category)?,
      version: self.version,
      state: ConstraintState::parse(&self.state)?,
      extent,
      uss_base_url: self.uss_base_url,
      time_created: decode_dt(&self.time_created)?,
      time_updated: decode_dt(&self.time_updated)?,
    })
  }
}

/// Raw strings for the reduced listing projection.
pub struct RawSummary {
  pub constraint_id: String,
  pub uss_base_url:  String,
  pub time_created:  String,
  pub time_start:    i64,
  pub time_end:      i64,
}

impl RawSummary {
  pub fn into_summary(self) -> Result<ConstraintSummary> {
    Ok(ConstraintSummary {
      constraint_id: decode_uuid(&self.constraint_id)?,
      uss_base_url:  self.uss_base_url,
      time_created:  decode_dt(&self.time_created)?,
      time_start:    self.time_start,
      time_end:      self.time_end,
    })
  }
}
