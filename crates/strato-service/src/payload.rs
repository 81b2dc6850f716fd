//! Schema gate for inbound submissions.
//!
//! Deserialisation gets the payload into a loosely-optional shape; the
//! gate then collects every structural violation into a message log
//! rather than stopping at the first. Strict mode (the update path)
//! additionally requires the constraint id and the expected version.

use serde::Deserialize;
use uuid::Uuid;

use strato_core::constraint::Extent;

use crate::error::Error;

/// Raw create/update submission body. Everything optional so the gate,
/// not serde, reports what is missing.
#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
  #[serde(default)]
  pub constraint_id: Option<Uuid>,
  #[serde(default)]
  pub extents:       Vec<Extent>,
  #[serde(default)]
  pub old_version:   Option<u32>,
  #[serde(default)]
  pub uss_base_url:  Option<String>,
}

/// A submission the gate has passed: exactly one extent, an owner URL,
/// and (in strict mode) identity and version.
#[derive(Debug, Clone)]
pub struct CheckedSubmission {
  pub constraint_id: Option<Uuid>,
  pub extent:        Extent,
  pub old_version:   Option<u32>,
  pub uss_base_url:  String,
}

fn check_polygon(extent: &Extent, log: &mut Vec<String>) {
  let ring = extent.volume.outline_polygon.ring();
  if ring.len() < 4 {
    log.push(
      "outline_polygon must contain at least 3 distinct vertices plus a \
       closing vertex"
        .to_owned(),
    );
    return;
  }
  if ring.first() != ring.last() {
    log.push(
      "outline_polygon ring must be closed (first and last vertex equal)"
        .to_owned(),
    );
  }
  if ring
    .iter()
    .any(|&[lng, lat]| !(-180.0..=180.0).contains(&lng)
      || !(-90.0..=90.0).contains(&lat))
  {
    log.push("outline_polygon vertex out of lng/lat range".to_owned());
  }
}

/// Run the gate. `strict` is the update path: the id and expected
/// version must be present.
pub fn check(
  submission: Submission,
  strict: bool,
) -> Result<CheckedSubmission, Error> {
  let mut log = Vec::new();

  if strict && submission.constraint_id.is_none() {
    log.push("constraint_id is required".to_owned());
  }
  if strict && submission.old_version.is_none() {
    log.push("old_version is required".to_owned());
  }

  let uss_base_url = match submission.uss_base_url {
    Some(url) if !url.trim().is_empty() => Some(url),
    _ => {
      log.push("uss_base_url is required".to_owned());
      None
    }
  };

  if submission.extents.len() != 1 {
    log.push(format!(
      "exactly one extent is required, got {}",
      submission.extents.len()
    ));
  }
  for extent in &submission.extents {
    check_polygon(extent, &mut log);
  }

  let extent = submission.extents.into_iter().next();
  match (extent, uss_base_url, log.is_empty()) {
    (Some(extent), Some(uss_base_url), true) => Ok(CheckedSubmission {
      constraint_id: submission.constraint_id,
      extent,
      old_version: submission.old_version,
      uss_base_url,
    }),
    _ => Err(Error::Payload(log)),
  }
}
