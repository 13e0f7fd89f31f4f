//! Crate-level error type.

use thiserror::Error;

use crate::bgzf::BlockError;

/// Result type alias for bamstream operations.
pub type Result<T> = std::result::Result<T, BamStreamError>;

/// Aggregated error for callers that drive both layers through one type.
///
/// The container layer reports [`BlockError`] (with its
/// incomplete-vs-structural split); the record layer reports structured
/// decode errors through `io::Error`. Both convert into this.
#[derive(Debug, Error)]
pub enum BamStreamError {
    /// I/O error from the underlying transport or record framing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed, incomplete, or corrupt container block.
    #[error("block error: {0}")]
    Block(#[from] BlockError),
}
