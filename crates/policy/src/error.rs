//! Policy error types.

use crate::Denial;
use thiserror::Error;

/// Policy errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A check was denied and the caller asked for an error instead of a decision.
    #[error("permission denied: {0}")]
    Denied(Denial),

    /// A name or fixture value does not describe a valid policy input.
    #[error("invalid policy input: {0}")]
    Invalid(String),

    /// Failed to parse a directory fixture.
    #[error("failed to parse directory: {0}")]
    Parse(String),

    /// An I/O error occurred while reading a fixture.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
