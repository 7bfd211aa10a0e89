//! Error types for the sync engine.
//!
//! `EngineError` covers everything that stops a run: problems reading the
//! source tree, problems locating or launching the device bridge, and a push
//! that the bridge reported as failed. A file that is merely filtered out is
//! not an error; it is recorded as `FileOutcome::Skipped`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a sync run.
///
/// None of these are retried. The CLI maps them to a process exit code via
/// [`EngineError::exit_code`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// Source directory does not exist
    #[error("Source directory not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    /// Source exists but is not a directory
    #[error("Source is not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    /// Source directory is not accessible (permissions)
    #[error("Source directory access denied: {}", path.display())]
    SourceAccessDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to list a directory inside the source tree
    #[error("Failed to enumerate directory: {}", path.display())]
    EnumerationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read the size of a file inside the source tree
    #[error("Failed to read file size: {}", path.display())]
    MetadataFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No adb executable could be located
    #[error("adb executable not found ({reason}); pass --adb or set ADB")]
    BridgeNotFound { reason: String },

    /// The adb executable could not be started
    #[error("Failed to launch {}", program.display())]
    BridgeLaunchFailed {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    /// adb ran but exited with a non-zero status
    #[error("Push failed for {} ({})", source_path.display(), describe_status(*status))]
    PushFailed {
        source_path: PathBuf,
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

fn describe_status(status: Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl EngineError {
    /// Process exit code for this error.
    ///
    /// A failed push exits with 1; every other failure exits with 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::PushFailed { .. } => 1,
            _ => 2,
        }
    }
}
