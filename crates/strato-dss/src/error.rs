//! Error type for `strato-dss`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("auth rejected with status {status}: {body}")]
  Auth { status: u16, body: String },

  #[error("remote rejected with status {status}: {body}")]
  Remote { status: u16, body: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
