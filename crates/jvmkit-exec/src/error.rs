//! Typed errors surfaced by the process runner.

use thiserror::Error;

use crate::runner::OutputChunk;

/// Errors from spawning and supervising child processes.
///
/// A non-zero child exit is reported as [`ExecError::Shellout`]; nothing is
/// retried, and the error is handed to the immediate caller unmodified.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("empty command line")]
    EmptyCommand,

    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Child exited with a non-zero code. In captured mode `output` holds the
    /// recorded chunk log for post-mortem inspection; the bytes were already
    /// mirrored to the caller's sink in real time.
    #[error("process exited with code {exit_code}")]
    Shellout {
        exit_code: i32,
        output: Vec<OutputChunk>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
