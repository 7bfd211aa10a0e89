//! Core data model for sync runs.
//!
//! This module defines the main data structures:
//! - FileRecord / TransferPlan: the enumerated source tree
//! - ProgressState: cumulative byte accounting for one run
//! - SyncOptions: the explicit configuration of one run
//! - FileOutcome / SyncReport: what happened to each file and to the run

use chrono::{DateTime, Local};
use std::path::PathBuf;
use uuid::Uuid;

/// Storage prefix on the device that every destination is placed under.
pub const DEFAULT_DEVICE_ROOT: &str = "/sdcard";

/// A single regular file discovered in the source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path relative to the source root, `/`-separated, no leading separator
    pub relative_path: String,

    /// Full path on the local filesystem
    pub source_path: PathBuf,

    /// File size in bytes at enumeration time
    pub size_bytes: u64,
}

impl FileRecord {
    /// Returns true if the relative path ends with `suffix`, ignoring case.
    pub fn has_suffix(&self, suffix: &str) -> bool {
        self.relative_path
            .to_lowercase()
            .ends_with(&suffix.to_lowercase())
    }
}

/// The ordered list of files to sync, plus their total size.
///
/// `total_bytes` is always the sum of every record's `size_bytes`.
#[derive(Debug, Clone)]
pub struct TransferPlan {
    /// Root source directory
    pub source_root: PathBuf,

    /// Files in discovery order
    pub files: Vec<FileRecord>,

    /// Sum of all file sizes
    pub total_bytes: u64,
}

impl TransferPlan {
    /// Build a plan from enumerated records, computing the total.
    pub fn new(source_root: PathBuf, files: Vec<FileRecord>) -> Self {
        let total_bytes = files.iter().map(|f| f.size_bytes).sum();
        TransferPlan {
            source_root,
            files,
            total_bytes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Cumulative progress of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    pub bytes_completed: u64,
    pub total_bytes: u64,
}

impl ProgressState {
    pub fn new(total_bytes: u64) -> Self {
        ProgressState {
            bytes_completed: 0,
            total_bytes,
        }
    }

    /// Account for one processed file.
    pub fn advance(&mut self, size_bytes: u64) {
        self.bytes_completed = self.bytes_completed.saturating_add(size_bytes);
    }

    /// Completed fraction in `[0, 1]`. An empty run counts as complete.
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_completed as f64 / self.total_bytes as f64).min(1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.bytes_completed >= self.total_bytes
    }
}

/// Options controlling one sync run.
///
/// Built once by the caller and passed explicitly to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Execute pushes for real; otherwise a dry run
    pub run: bool,

    /// Files whose relative path ends with this suffix (case-insensitive) are not pushed
    pub skip_extension: Option<String>,

    /// Report constructed commands and bridge output
    pub verbose: bool,

    /// Device storage prefix the destination is placed under
    pub device_root: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            run: false,
            skip_extension: None,
            verbose: false,
            device_root: DEFAULT_DEVICE_ROOT.to_string(),
        }
    }
}

impl SyncOptions {
    /// Returns true if `record` is excluded by the configured suffix.
    pub fn is_skipped(&self, record: &FileRecord) -> bool {
        match &self.skip_extension {
            Some(ext) if !ext.is_empty() => record.has_suffix(ext),
            _ => false,
        }
    }
}

/// What happened to a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Pushed to the device by the bridge
    Pushed,
    /// Command constructed but not executed (dry run)
    DryRun,
    /// Filtered out by the skip suffix; still counted toward progress
    Skipped,
}

impl std::fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOutcome::Pushed => write!(f, "pushed"),
            FileOutcome::DryRun => write!(f, "dry-run"),
            FileOutcome::Skipped => write!(f, "skipped"),
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Unique identifier for this run
    pub run_id: Uuid,

    /// When the driver started processing files
    pub started_at: DateTime<Local>,

    /// When the last file was processed
    pub finished_at: DateTime<Local>,

    pub pushed: usize,
    pub dry_run: usize,
    pub skipped: usize,

    /// Final progress; complete unless the run was aborted
    pub progress: ProgressState,
}

impl SyncReport {
    pub fn files_processed(&self) -> usize {
        self.pushed + self.dry_run + self.skipped
    }
}
