//! Sync orchestration.
//!
//! This module provides the two phases of a run:
//! - Planning: validating the source root and enumerating it
//! - Running: pushing each planned file in order and tracking progress
//!
//! Planning always completes before running starts.

use std::path::Path;
use chrono::Local;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;
use crate::bridge::{PushCommand, Transferrer};
use crate::error::EngineError;
use crate::fs_ops;
use crate::model::{FileOutcome, ProgressState, SyncOptions, SyncReport, TransferPlan};
use crate::progress::ProgressCallback;

/// Plan a sync by enumerating the source tree.
///
/// # Errors
/// Returns EngineError if the source root is missing, not a directory,
/// inaccessible, or if enumeration fails anywhere below it.
pub fn plan_sync<P: AsRef<Path>>(source: P) -> Result<TransferPlan, EngineError> {
    let source = source.as_ref();

    match std::fs::metadata(source) {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(EngineError::NotADirectory {
                    path: source.to_path_buf(),
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(EngineError::SourceNotFound {
                path: source.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(EngineError::SourceAccessDenied {
                path: source.to_path_buf(),
                source: e,
            });
        }
    }

    let plan = fs_ops::enumerate_tree(source)?;
    debug!(
        files = plan.files.len(),
        total_bytes = plan.total_bytes,
        source = %plan.source_root.display(),
        "planned sync"
    );
    Ok(plan)
}

/// Run a planned sync.
///
/// Files are processed in plan order. Each one is either skipped (matching
/// `options.skip_extension`), constructed but not run (dry run), or pushed
/// through `transferrer`. In all three cases its size is then added to the
/// progress total, so a completed run always ends with
/// `bytes_completed == total_bytes`.
///
/// # Arguments
/// * `plan` - Enumerated source tree
/// * `destination` - Destination on the device, relative to `options.device_root`
/// * `adb` - Program placed in each constructed command
/// * `options` - Run configuration
/// * `transferrer` - Executes commands when `options.run` is set
/// * `progress_callback` - Optional callback for progress updates
///
/// # Errors
/// The first push that exits non-zero aborts the run with
/// `EngineError::PushFailed`; no later file is attempted.
pub fn run_sync(
    plan: &TransferPlan,
    destination: &str,
    adb: &Path,
    options: &SyncOptions,
    transferrer: &mut dyn Transferrer,
    progress_callback: Option<&dyn ProgressCallback>,
) -> Result<SyncReport, EngineError> {
    let run_id = Uuid::new_v4();
    let _span = info_span!("sync", %run_id).entered();

    let device_dir = fs_ops::device_destination(&options.device_root, destination);
    let started_at = Local::now();
    info!(
        files = plan.files.len(),
        total_bytes = plan.total_bytes,
        destination = %device_dir,
        run = options.run,
        "sync started"
    );

    if let Some(callback) = progress_callback {
        callback.on_sync_started(plan);
    }

    let mut progress = ProgressState::new(plan.total_bytes);
    let (mut pushed, mut dry_run, mut skipped) = (0, 0, 0);

    for (file_index, file) in plan.files.iter().enumerate() {
        let outcome = if options.is_skipped(file) {
            debug!(path = %file.relative_path, "skipping by extension");
            FileOutcome::Skipped
        } else {
            let command = PushCommand::new(
                adb,
                file.source_path.clone(),
                fs_ops::join_device_path(&device_dir, &file.relative_path),
            );

            if let Some(callback) = progress_callback {
                callback.on_command(file_index, &command);
            }

            if options.run {
                let output = transferrer.execute(&command)?;
                if !output.success() {
                    warn!(
                        path = %file.relative_path,
                        status = ?output.status,
                        "push failed, aborting sync"
                    );
                    return Err(EngineError::PushFailed {
                        source_path: file.source_path.clone(),
                        status: output.status,
                        stdout: output.stdout,
                        stderr: output.stderr,
                    });
                }
                if let Some(callback) = progress_callback {
                    callback.on_push_output(file_index, &output);
                }
                FileOutcome::Pushed
            } else {
                FileOutcome::DryRun
            }
        };

        match outcome {
            FileOutcome::Pushed => pushed += 1,
            FileOutcome::DryRun => dry_run += 1,
            FileOutcome::Skipped => skipped += 1,
        }

        progress.advance(file.size_bytes);

        if let Some(callback) = progress_callback {
            callback.on_file_completed(file_index, file, outcome, &progress);
        }
    }

    let report = SyncReport {
        run_id,
        started_at,
        finished_at: Local::now(),
        pushed,
        dry_run,
        skipped,
        progress,
    };

    info!(pushed, dry_run, skipped, "sync completed");

    if let Some(callback) = progress_callback {
        callback.on_sync_completed(&report);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::PushOutput;
    use crate::model::FileRecord;
    use std::cell::RefCell;
    use std::fs;
    use std::path::PathBuf;

    /// Records every executed command; fails on the Nth execution if asked.
    struct FakeTransferrer {
        executed: Vec<PushCommand>,
        fail_on: Option<usize>,
    }

    impl FakeTransferrer {
        fn new() -> Self {
            FakeTransferrer {
                executed: Vec::new(),
                fail_on: None,
            }
        }

        fn failing_on(n: usize) -> Self {
            FakeTransferrer {
                executed: Vec::new(),
                fail_on: Some(n),
            }
        }
    }

    impl Transferrer for FakeTransferrer {
        fn execute(&mut self, command: &PushCommand) -> Result<PushOutput, EngineError> {
            self.executed.push(command.clone());
            if self.fail_on == Some(self.executed.len()) {
                return Ok(PushOutput {
                    status: Some(1),
                    stdout: "adb: error".to_string(),
                    stderr: "error: no devices/emulators found".to_string(),
                });
            }
            Ok(PushOutput {
                status: Some(0),
                stdout: "1 file pushed".to_string(),
                stderr: String::new(),
            })
        }
    }

    // Test helper: Mock progress callback to track invocations
    struct TestProgressCallback {
        calls: RefCell<Vec<String>>,
        completed: RefCell<Vec<u64>>,
    }

    impl TestProgressCallback {
        fn new() -> Self {
            TestProgressCallback {
                calls: RefCell::new(Vec::new()),
                completed: RefCell::new(Vec::new()),
            }
        }

        fn get_calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl ProgressCallback for TestProgressCallback {
        fn on_sync_started(&self, plan: &TransferPlan) {
            self.calls.borrow_mut().push(format!("on_sync_started({})", plan.files.len()));
        }

        fn on_command(&self, file_index: usize, command: &PushCommand) {
            self.calls
                .borrow_mut()
                .push(format!("on_command({}, {})", file_index, command.destination));
        }

        fn on_push_output(&self, file_index: usize, _output: &PushOutput) {
            self.calls.borrow_mut().push(format!("on_push_output({})", file_index));
        }

        fn on_file_completed(
            &self,
            file_index: usize,
            _file: &FileRecord,
            outcome: FileOutcome,
            progress: &ProgressState,
        ) {
            self.calls
                .borrow_mut()
                .push(format!("on_file_completed({}, {})", file_index, outcome));
            self.completed.borrow_mut().push(progress.bytes_completed);
        }

        fn on_sync_completed(&self, _report: &SyncReport) {
            self.calls.borrow_mut().push("on_sync_completed".to_string());
        }
    }

    fn record(path: &str, size: u64) -> FileRecord {
        FileRecord {
            relative_path: path.to_string(),
            source_path: PathBuf::from("/music").join(path),
            size_bytes: size,
        }
    }

    fn sample_plan() -> TransferPlan {
        TransferPlan::new(
            PathBuf::from("/music"),
            vec![record("a.mp3", 1000), record("sub/b.wav", 500)],
        )
    }

    fn options(run: bool, skip: Option<&str>) -> SyncOptions {
        SyncOptions {
            run,
            skip_extension: skip.map(str::to_string),
            ..SyncOptions::default()
        }
    }

    #[test]
    fn test_plan_sync_with_missing_source() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let result = plan_sync(temp_dir.path().join("nonexistent"));
        assert!(matches!(result, Err(EngineError::SourceNotFound { .. })));
    }

    #[test]
    fn test_plan_sync_with_file_as_source() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("file.txt");
        fs::File::create(&src).expect("Failed to create file");

        let result = plan_sync(&src);
        assert!(matches!(result, Err(EngineError::NotADirectory { .. })));
    }

    #[test]
    fn test_end_to_end_dry_run_skipping_wav() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path();
        fs::write(src.join("a.mp3"), vec![0u8; 1000]).expect("Failed to write a.mp3");
        fs::create_dir(src.join("sub")).expect("Failed to create sub");
        fs::write(src.join("sub").join("b.wav"), vec![0u8; 500]).expect("Failed to write b.wav");

        let plan = plan_sync(src).expect("Failed to plan");
        assert_eq!(plan.total_bytes, 1500);
        assert_eq!(plan.source_root, src);

        let callback = TestProgressCallback::new();
        let mut transferrer = FakeTransferrer::new();
        let report = run_sync(
            &plan,
            "/Music",
            Path::new("adb"),
            &options(false, Some(".wav")),
            &mut transferrer,
            Some(&callback),
        )
        .expect("Failed to run sync");

        assert!(transferrer.executed.is_empty());
        assert_eq!(report.progress.bytes_completed, 1500);
        assert_eq!(report.dry_run, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.pushed, 0);

        let commands: Vec<_> = callback
            .get_calls()
            .into_iter()
            .filter(|c| c.starts_with("on_command"))
            .collect();
        assert_eq!(commands, vec!["on_command(0, /sdcard/Music/a.mp3)"]);
    }

    #[test]
    fn test_run_pushes_every_file() {
        let plan = sample_plan();
        let mut transferrer = FakeTransferrer::new();

        let report = run_sync(
            &plan,
            "Music",
            Path::new("/opt/adb"),
            &options(true, None),
            &mut transferrer,
            None,
        )
        .expect("Failed to run sync");

        assert_eq!(report.pushed, 2);
        assert_eq!(transferrer.executed.len(), 2);
        assert_eq!(transferrer.executed[0].program, PathBuf::from("/opt/adb"));
        assert_eq!(transferrer.executed[0].source, PathBuf::from("/music/a.mp3"));
        assert_eq!(transferrer.executed[1].destination, "/sdcard/Music/sub/b.wav");
        assert!(report.progress.is_complete());
    }

    #[test]
    fn test_skipped_files_never_reach_transferrer() {
        let plan = TransferPlan::new(
            PathBuf::from("/music"),
            vec![record("a.WAV", 10), record("b.mp3", 20), record("c.wav", 30)],
        );
        let mut transferrer = FakeTransferrer::new();

        let report = run_sync(
            &plan,
            "/Music",
            Path::new("adb"),
            &options(true, Some(".wav")),
            &mut transferrer,
            None,
        )
        .expect("Failed to run sync");

        assert_eq!(transferrer.executed.len(), 1);
        assert!(transferrer.executed[0].destination.ends_with("b.mp3"));
        assert_eq!(report.skipped, 2);
        assert_eq!(report.progress.bytes_completed, 60);
        assert_eq!(report.progress.total_bytes, 60);
    }

    #[test]
    fn test_failure_on_nth_file_aborts() {
        let plan = TransferPlan::new(
            PathBuf::from("/music"),
            (0..5).map(|i| record(&format!("f{}.mp3", i), 100)).collect(),
        );
        let mut transferrer = FakeTransferrer::failing_on(3);
        let callback = TestProgressCallback::new();

        let result = run_sync(
            &plan,
            "/Music",
            Path::new("adb"),
            &options(true, None),
            &mut transferrer,
            Some(&callback),
        );

        assert_eq!(transferrer.executed.len(), 3);
        match result {
            Err(EngineError::PushFailed { source_path, status, stdout, stderr }) => {
                assert_eq!(source_path, PathBuf::from("/music/f2.mp3"));
                assert_eq!(status, Some(1));
                assert_eq!(stdout, "adb: error");
                assert!(stderr.contains("no devices"));
            }
            other => panic!("expected PushFailed, got {:?}", other),
        }
        assert_eq!(*callback.completed.borrow(), vec![100, 200]);
        assert!(!callback.get_calls().contains(&"on_sync_completed".to_string()));
    }

    #[test]
    fn test_run_invokes_callbacks_in_order() {
        let plan = sample_plan();
        let callback = TestProgressCallback::new();
        let mut transferrer = FakeTransferrer::new();

        run_sync(
            &plan,
            "/Music",
            Path::new("adb"),
            &options(true, Some(".wav")),
            &mut transferrer,
            Some(&callback),
        )
        .expect("Failed to run sync");

        assert_eq!(
            callback.get_calls(),
            vec![
                "on_sync_started(2)",
                "on_command(0, /sdcard/Music/a.mp3)",
                "on_push_output(0)",
                "on_file_completed(0, pushed)",
                "on_file_completed(1, skipped)",
                "on_sync_completed",
            ]
        );
        assert_eq!(*callback.completed.borrow(), vec![1000, 1500]);
    }

    #[test]
    fn test_dry_run_never_executes() {
        let plan = TransferPlan::new(
            PathBuf::from("/music"),
            (0..50).map(|i| record(&format!("{}.mp3", i), 1)).collect(),
        );
        let mut transferrer = FakeTransferrer::failing_on(1);

        let report = run_sync(
            &plan,
            "/Music",
            Path::new("adb"),
            &options(false, None),
            &mut transferrer,
            None,
        )
        .expect("dry run should succeed");

        assert!(transferrer.executed.is_empty());
        assert_eq!(report.dry_run, 50);
        assert_eq!(report.files_processed(), 50);
    }

    #[test]
    fn test_empty_plan_completes() {
        let plan = TransferPlan::new(PathBuf::from("/music"), Vec::new());
        let mut transferrer = FakeTransferrer::new();

        let report = run_sync(
            &plan,
            "/Music",
            Path::new("adb"),
            &options(true, None),
            &mut transferrer,
            None,
        )
        .expect("Failed to run sync");

        assert_eq!(report.files_processed(), 0);
        assert!(report.progress.is_complete());
        assert!(report.finished_at >= report.started_at);
    }

    #[test]
    fn test_custom_device_root() {
        let plan = sample_plan();
        let mut transferrer = FakeTransferrer::new();
        let opts = SyncOptions {
            run: true,
            device_root: "/storage/emulated/0".to_string(),
            ..SyncOptions::default()
        };

        run_sync(&plan, "/Music", Path::new("adb"), &opts, &mut transferrer, None)
            .expect("Failed to run sync");

        assert_eq!(transferrer.executed[0].destination, "/storage/emulated/0/Music/a.mp3");
    }
}
