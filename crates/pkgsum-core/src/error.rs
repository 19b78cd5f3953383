//! Error taxonomy for inventory and checksum operations.
//!
//! Packages can be uninstalled while we are looking at them, so `NotFound`
//! is an expected outcome, not a bug. Only a whole-inventory enumeration
//! failure is fatal to an operation; everything else degrades to a record
//! without a checksum.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Package or its installer file vanished (e.g. uninstalled mid-flight).
    #[error("package not found: {0}")]
    NotFound(String),

    /// Reading an installer file failed. The caller may retry later; we never
    /// retry automatically.
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The platform inventory query failed as a whole. Fatal to `load_all`,
    /// surfaced to consumers as a retryable failure state.
    #[error("inventory enumeration failed: {0}")]
    Enumeration(String),

    /// A blocking worker task panicked or was cancelled before finishing.
    #[error("background task failed: {0}")]
    Task(String),
}
