//! Typed errors surfaced by the packaging builders.

use std::path::PathBuf;
use thiserror::Error;

/// Packaging failures are build-definition errors; nothing is retried.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// A declared input root does not exist.
    #[error("input root does not exist: {0}")]
    MissingInput(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}
