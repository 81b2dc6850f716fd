//! Pure spatio-temporal primitives: time-range overlap and polygon
//! intersection. No state, no I/O.

use chrono::{DateTime, Utc};
use geo::Intersects;
use geo_types::{Coord, LineString, Polygon};

use crate::constraint::OutlinePolygon;

// ─── Time ────────────────────────────────────────────────────────────────────

/// Parse an RFC 3339 "Zulu" timestamp into unix-epoch seconds.
pub fn zulu_to_unix(zulu: &str) -> Option<i64> {
  DateTime::parse_from_rfc3339(zulu)
    .ok()
    .map(|dt| dt.timestamp())
}

/// Format unix-epoch seconds as an RFC 3339 "Zulu" timestamp.
pub fn unix_to_zulu(unix: i64) -> Option<String> {
  DateTime::<Utc>::from_timestamp(unix, 0)
    .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
}

/// Whether the ranges `[a_start, a_end]` and `[b_start, b_end]` overlap,
/// with `tolerance_secs` widening the second operand's window only.
///
/// Boundary-inclusive: an endpoint landing exactly on a boundary counts.
/// The tolerance is asymmetric — it expands B and never A. Callers that
/// need a symmetric buffer must widen both operands themselves.
pub fn ranges_overlap(
  a_start: i64,
  a_end: i64,
  b_start: i64,
  b_end: i64,
  tolerance_secs: i64,
) -> bool {
  let b_start = b_start - tolerance_secs;
  let b_end = b_end + tolerance_secs;
  if a_start <= b_start && b_start <= a_end {
    return true; // b starts inside a, inclusive
  }
  if a_start <= b_end && b_end <= a_end {
    return true; // b ends inside a, inclusive
  }
  // a sits fully inside the widened b
  b_start < a_start && a_end < b_end
}

// ─── Space ───────────────────────────────────────────────────────────────────

fn to_geo_polygon(p: &OutlinePolygon) -> Polygon<f64> {
  let ring: LineString<f64> = p
    .ring()
    .iter()
    .map(|&[lng, lat]| Coord { x: lng, y: lat })
    .collect();
  Polygon::new(ring, vec![])
}

/// Whether two simple polygons intersect in area or share a border.
/// Only the boolean verdict is needed, never the intersection shape.
pub fn footprints_overlap(a: &OutlinePolygon, b: &OutlinePolygon) -> bool {
  to_geo_polygon(a).intersects(&to_geo_polygon(b))
}
