//! Typed error definitions for the transfer engine.
//! Provides a small set of well-known failure modes for better logs and tests.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Source path not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Destination is not usable: {path}: {reason}")]
    DestinationUnusable { path: PathBuf, reason: String },

    #[error("Transfer interrupted by user")]
    Interrupted,
}
