//! Core types and trait definitions for the Strato constraint function.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod conflict;
pub mod constraint;
pub mod error;
pub mod geom;
pub mod horizon;
pub mod remote;
pub mod store;

pub use error::{Error, Result};
