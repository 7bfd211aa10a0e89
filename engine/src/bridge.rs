//! Device bridge invocation.
//!
//! The engine never talks to the device itself. Each file becomes one
//! `adb push --sync <source> <destination>` command, executed by a
//! [`Transferrer`]. `AdbTransferrer` runs the real executable; tests
//! substitute their own implementation.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;
use crate::error::EngineError;

/// Environment variable consulted for the adb executable.
pub const ADB_ENV: &str = "ADB";

/// One constructed push invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushCommand {
    /// The adb executable
    pub program: PathBuf,

    /// Local file to push
    pub source: PathBuf,

    /// Absolute path on the device
    pub destination: String,
}

impl PushCommand {
    pub fn new(program: &Path, source: PathBuf, destination: String) -> Self {
        PushCommand {
            program: program.to_path_buf(),
            source,
            destination,
        }
    }

    /// Arguments passed after the program name.
    pub fn args(&self) -> Vec<String> {
        vec![
            "push".to_string(),
            "--sync".to_string(),
            self.source.to_string_lossy().into_owned(),
            self.destination.clone(),
        ]
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("push")
            .arg("--sync")
            .arg(&self.source)
            .arg(&self.destination);
        command
    }
}

impl fmt::Display for PushCommand {
    /// Renders the argv as a quoted list, one invocation per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}", self.program.to_string_lossy())?;
        for arg in self.args() {
            write!(f, ", {:?}", arg)?;
        }
        write!(f, "]")
    }
}

/// Captured result of one executed push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushOutput {
    /// Exit code; `None` if the process was killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl PushOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Executes push commands against a device.
pub trait Transferrer {
    /// Run `command` to completion and capture its output.
    ///
    /// A non-zero exit is reported through `PushOutput::status`, not as an
    /// error; errors are reserved for failing to run the command at all.
    fn execute(&mut self, command: &PushCommand) -> Result<PushOutput, EngineError>;
}

/// Runs commands with the real adb executable, blocking until each exits.
#[derive(Debug, Default)]
pub struct AdbTransferrer;

impl AdbTransferrer {
    pub fn new() -> Self {
        AdbTransferrer
    }
}

impl Transferrer for AdbTransferrer {
    fn execute(&mut self, command: &PushCommand) -> Result<PushOutput, EngineError> {
        let output = command
            .to_command()
            .output()
            .map_err(|e| EngineError::BridgeLaunchFailed {
                program: command.program.clone(),
                source: e,
            })?;

        debug!(
            status = ?output.status.code(),
            destination = %command.destination,
            "adb push finished"
        );

        Ok(PushOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Locate the adb executable.
///
/// An explicit path wins, then the `ADB` environment variable, then `adb`
/// on `PATH`.
pub fn resolve_adb(explicit: Option<&Path>) -> Result<PathBuf, EngineError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Some(path) = env::var_os(ADB_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    which::which("adb").map_err(|e| EngineError::BridgeNotFound {
        reason: e.to_string(),
    })
}
