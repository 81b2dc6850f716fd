//! The conflict validator — the admission decision core.
//!
//! Given a candidate extent, it pulls the comparison pool of active
//! short-term constraints from the store and decides whether the candidate
//! may be admitted. Only combined space+time overlap is a conflict;
//! overlap in time alone is tolerated.
//!
//! The query-then-decide sequence is not transactionally isolated from
//! concurrent writers: two simultaneous submissions for overlapping
//! volumes can both observe an empty pool and both be admitted. Known
//! race, not a guarantee.

use serde::Serialize;
use uuid::Uuid;

use crate::{
  constraint::{Constraint, ConstraintCategory, Extent},
  geom::{footprints_overlap, ranges_overlap},
  store::ConstraintStore,
};

// ─── Verdict ─────────────────────────────────────────────────────────────────

/// How the candidate relates to the comparison pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapKind {
  NoOverlap,
  /// Overlap in time with at least one member, but disjoint footprints.
  TemporalOverlap,
  /// Overlap in both time and footprint with at least one member.
  SpatialTemporalOverlap,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ConflictVerdict {
  pub admitted: bool,
  pub overlap:  OverlapKind,
}

impl ConflictVerdict {
  fn admit(overlap: OverlapKind) -> Self { Self { admitted: true, overlap } }

  fn reject(overlap: OverlapKind) -> Self {
    Self { admitted: false, overlap }
  }
}

// ─── Evaluation ──────────────────────────────────────────────────────────────

fn temporally_overlaps(member: &Constraint, candidate: &Extent) -> bool {
  // Operand order matters: the tolerance (zero here) widens the candidate
  // window, never the stored member's.
  ranges_overlap(
    member.extent.start_unix(),
    member.extent.end_unix(),
    candidate.start_unix(),
    candidate.end_unix(),
    0,
  )
}

/// Decide whether `candidate` may be admitted.
///
/// The pool is every active STC whose `time_end` has not passed the
/// candidate's `time_start`, minus `exclude` (the update path excludes the
/// record being replaced so it never conflicts with its own prior self).
///
/// An empty pool admits immediately with [`OverlapKind::NoOverlap`] — no
/// spatial check is even attempted. Otherwise the scan is existential: the
/// first member overlapping in both time and footprint rejects the
/// candidate; nothing enumerates the full conflicting set.
pub async fn evaluate<S: ConstraintStore>(
  store: &S,
  candidate: &Extent,
  exclude: Option<Uuid>,
) -> Result<ConflictVerdict, S::Error> {
  let pool = store
    .active_by_category(ConstraintCategory::Stc, candidate.start_unix(), exclude)
    .await?;

  if pool.is_empty() {
    return Ok(ConflictVerdict::admit(OverlapKind::NoOverlap));
  }

  let temporal: Vec<&Constraint> = pool
    .iter()
    .filter(|member| temporally_overlaps(member, candidate))
    .collect();

  if temporal.is_empty() {
    return Ok(ConflictVerdict::admit(OverlapKind::NoOverlap));
  }

  let collides = temporal.iter().any(|member| {
    footprints_overlap(
      &member.extent.volume.outline_polygon,
      &candidate.volume.outline_polygon,
    )
  });

  if collides {
    Ok(ConflictVerdict::reject(OverlapKind::SpatialTemporalOverlap))
  } else {
    Ok(ConflictVerdict::admit(OverlapKind::TemporalOverlap))
  }
}
