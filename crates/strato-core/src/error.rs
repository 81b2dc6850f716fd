//! Error types for `strato-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("constraint not found: {0}")]
  ConstraintNotFound(Uuid),

  #[error(
    "constraint version {submitted} does not match the current version \
     {stored}, please resubmit"
  )]
  VersionMismatch { submitted: u32, stored: u32 },

  #[error("unknown constraint category: {0:?}")]
  UnknownCategory(String),

  #[error("unknown constraint state: {0:?}")]
  UnknownState(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
