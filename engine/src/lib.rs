//! # DroidSync Engine - Android Directory Sync Library
//!
//! Mirrors a local directory tree onto an Android device by pushing each
//! file through `adb push --sync`. The engine plans the sync, drives the
//! per-file pushes, and reports progress through callbacks so any front end
//! can display it.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use engine::{plan_sync, run_sync, resolve_adb, AdbTransferrer, SyncOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Enumerate the source tree
//! let plan = plan_sync("/home/me/music/mp3")?;
//! println!("Will sync {} files ({} bytes)", plan.files.len(), plan.total_bytes);
//!
//! // Push for real into /sdcard/Music/mp3
//! let options = SyncOptions { run: true, ..SyncOptions::default() };
//! let adb = resolve_adb(None)?;
//! let report = run_sync(&plan, "/Music/mp3", &adb, &options, &mut AdbTransferrer::new(), None)?;
//! println!("pushed {} files", report.pushed);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: Core data structures (TransferPlan, FileRecord, SyncOptions, ...)
//! - **error**: Error types and exit codes
//! - **fs_ops**: Source enumeration and device path mapping
//! - **bridge**: adb command construction and execution
//! - **job**: Plan and run orchestration
//! - **progress**: Progress callback trait and bar rendering

pub mod model;
pub mod error;
pub mod fs_ops;
pub mod bridge;
pub mod job;
pub mod progress;

// Re-export main types and functions
pub use model::{
    FileOutcome, FileRecord, ProgressState, SyncOptions, SyncReport, TransferPlan,
    DEFAULT_DEVICE_ROOT,
};
pub use error::EngineError;
pub use bridge::{resolve_adb, AdbTransferrer, PushCommand, PushOutput, Transferrer};
pub use job::{plan_sync, run_sync};
pub use progress::{render_bar, BarMode, BarWriter, ProgressCallback};
