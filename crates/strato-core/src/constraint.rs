//! Constraint — the central entity of the constraint information function.
//!
//! A constraint is a no-fly volume with a time window. It is created by a
//! validated submission, mutated only through versioned updates, and hard
//! deleted on request. All meaningful geometry lives in its [`Extent`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Category and state ──────────────────────────────────────────────────────

/// The category of a constraint, which determines the validation and
/// conflict rules applied on admission.
///
/// Only [`Stc`](ConstraintCategory::Stc) entries participate in conflict
/// checking, and only against other STCs. Geozone and long-term entries
/// bypass the conflict pool entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintCategory {
  /// Short-term constraint, subject to ASTM time-horizon rules.
  #[serde(rename = "STC")]
  Stc,
  /// Long-term constraint.
  #[serde(rename = "LTC")]
  Ltc,
  /// UAS volume reservation.
  #[serde(rename = "UVR")]
  Uvr,
  /// Static geographical zone.
  Geozone,
}

impl ConstraintCategory {
  /// Whether admission requires the spatio-temporal conflict check.
  pub fn conflict_checked(self) -> bool { matches!(self, Self::Stc) }

  /// Whether admission requires the ASTM short-term time-horizon rules.
  pub fn astm_horizon_checked(self) -> bool { matches!(self, Self::Stc) }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Stc => "STC",
      Self::Ltc => "LTC",
      Self::Uvr => "UVR",
      Self::Geozone => "Geozone",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "STC" => Ok(Self::Stc),
      "LTC" => Ok(Self::Ltc),
      "UVR" => Ok(Self::Uvr),
      "Geozone" => Ok(Self::Geozone),
      other => Err(Error::UnknownCategory(other.to_owned())),
    }
  }
}

/// Lifecycle state. Every constraint admitted through the pipeline is
/// `Accepted`; rejections are returned as errors and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintState {
  Accepted,
  Rejected,
}

impl ConstraintState {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Accepted => "Accepted",
      Self::Rejected => "Rejected",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "Accepted" => Ok(Self::Accepted),
      "Rejected" => Ok(Self::Rejected),
      other => Err(Error::UnknownState(other.to_owned())),
    }
  }
}

// ─── Extent ──────────────────────────────────────────────────────────────────

/// A timestamp on the wire: an RFC 3339 "Zulu" value plus its format tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
  pub format: String,
  pub value:  DateTime<Utc>,
}

impl TimePoint {
  pub fn new(value: DateTime<Utc>) -> Self {
    Self { format: "RFC3339".to_owned(), value }
  }

  /// Unix-epoch seconds, the precision used for all range comparisons.
  pub fn unix(&self) -> i64 { self.value.timestamp() }
}

/// An altitude bound: reference frame, units, and numeric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Altitude {
  pub reference: String,
  pub units:     String,
  pub value:     f64,
}

/// A closed polygon footprint in paired-coordinate encoding: one or more
/// linear rings of `[lng, lat]` pairs, the first ring being the outline.
/// Simple polygons only — a single ring, no holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlinePolygon {
  #[serde(rename = "type")]
  pub kind:        String,
  pub coordinates: Vec<Vec<[f64; 2]>>,
}

impl OutlinePolygon {
  pub fn new(ring: Vec<[f64; 2]>) -> Self {
    Self { kind: "Polygon".to_owned(), coordinates: vec![ring] }
  }

  /// The outline ring. Empty slice if the wire payload carried no rings.
  pub fn ring(&self) -> &[[f64; 2]] {
    self.coordinates.first().map(Vec::as_slice).unwrap_or(&[])
  }
}

/// A three-dimensional volume: polygon footprint plus an altitude band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
  pub outline_polygon: OutlinePolygon,
  pub altitude_lower:  Altitude,
  pub altitude_upper:  Altitude,
}

/// The single spatio-temporal volume of a constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extent {
  pub volume:     Volume,
  pub time_start: TimePoint,
  pub time_end:   TimePoint,
}

impl Extent {
  pub fn start_unix(&self) -> i64 { self.time_start.unix() }

  pub fn end_unix(&self) -> i64 { self.time_end.unix() }
}

// ─── Constraint ──────────────────────────────────────────────────────────────

/// A persisted constraint. The id is server-assigned and immutable; the
/// version starts at 1 on creation and increases by exactly 1 per accepted
/// update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
  pub constraint_id: Uuid,
  pub category:      ConstraintCategory,
  pub version:       u32,
  pub state:         ConstraintState,
  pub extent:        Extent,
  /// Callback base URL of the owning USS; destination for future
  /// notifications about this entity.
  pub uss_base_url:  String,
  pub time_created:  DateTime<Utc>,
  pub time_updated:  DateTime<Utc>,
}

/// Input to [`crate::store::ConstraintStore::create`]. The id, version,
/// and timestamps are always assigned by the store; any client-supplied
/// version is ignored.
#[derive(Debug, Clone)]
pub struct NewConstraint {
  pub category:     ConstraintCategory,
  pub state:        ConstraintState,
  pub extent:       Extent,
  pub uss_base_url: String,
}

/// Compare a submitted version against the stored one.
///
/// An update must supply the version it believes is current; mismatch is
/// rejected with [`Error::VersionMismatch`] so the caller can re-fetch.
pub fn check_version(submitted: u32, stored: u32) -> Result<()> {
  if submitted == stored {
    Ok(())
  } else {
    Err(Error::VersionMismatch { submitted, stored })
  }
}
