//! sync-android - Command-line interface for the sync engine.
//!
//! Mirrors a local directory onto an Android device with `adb push --sync`,
//! printing a progress bar to stdout. Dry run unless `--run` is given.

use clap::Parser;
use std::cell::RefCell;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;
use engine::{
    bridge::{resolve_adb, AdbTransferrer, PushCommand, PushOutput},
    job::{plan_sync, run_sync},
    model::{FileOutcome, FileRecord, ProgressState, SyncOptions, SyncReport, DEFAULT_DEVICE_ROOT},
    progress::{BarMode, BarWriter, ProgressCallback},
    EngineError,
};

/// sync-android - Sync directory trees onto an Android device
#[derive(Parser, Debug)]
#[command(name = "sync-android")]
#[command(version)]
#[command(about = "Sync files onto android")]
struct Args {
    /// Source directory
    #[arg(value_name = "SRC")]
    src: PathBuf,

    /// Destination directory (placed under the device root)
    #[arg(value_name = "DEST")]
    dest: String,

    /// Run the push commands (default: dry run)
    #[arg(long)]
    run: bool,

    /// Skip wav files
    #[arg(long, conflicts_with = "skip_ext")]
    skip_wav: bool,

    /// Skip files with this extension (case-insensitive)
    #[arg(long, value_name = "EXT")]
    skip_ext: Option<String>,

    /// Run in verbose mode
    #[arg(long)]
    verbose: bool,

    /// Path to the adb executable (default: adb on PATH)
    #[arg(long, value_name = "PATH", env = "ADB")]
    adb: Option<PathBuf>,

    /// Storage root on the device
    #[arg(long, value_name = "PATH", default_value = DEFAULT_DEVICE_ROOT)]
    device_root: String,
}

impl Args {
    fn skip_extension(&self) -> Option<String> {
        if self.skip_wav {
            return Some(".wav".to_string());
        }
        self.skip_ext
            .as_deref()
            .filter(|ext| !ext.is_empty())
            .map(|ext| {
                if ext.starts_with('.') {
                    ext.to_lowercase()
                } else {
                    format!(".{}", ext.to_lowercase())
                }
            })
    }

    fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            run: self.run,
            skip_extension: self.skip_extension(),
            verbose: self.verbose,
            device_root: self.device_root.clone(),
        }
    }
}

/// CLI implementation of ProgressCallback: progress bar and verbose output
struct CliProgress<W: Write> {
    verbose: bool,
    start_time: Instant,
    writer: RefCell<BarWriter<W>>,
}

impl<W: Write> CliProgress<W> {
    fn new(out: W, options: &SyncOptions) -> Self {
        let mode = if options.verbose { BarMode::Lines } else { BarMode::InPlace };
        CliProgress {
            verbose: options.verbose,
            start_time: Instant::now(),
            writer: RefCell::new(BarWriter::new(out, mode)),
        }
    }

    fn print_line(&self, text: &str) {
        if let Err(e) = self.writer.borrow_mut().line(text) {
            debug!(error = %e, "failed to write output line");
        }
    }

    fn print_output(&self, output: &str) {
        let trimmed = output.trim();
        if !trimmed.is_empty() {
            self.print_line(trimmed);
        }
    }

    fn format_duration(elapsed: std::time::Duration) -> String {
        let secs = elapsed.as_secs();
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        let secs = secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, mins, secs)
        } else if mins > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}s", secs)
        }
    }

    /// Terminate an in-place bar before anything else is printed.
    fn finish(&self) {
        if let Err(e) = self.writer.borrow_mut().finish() {
            debug!(error = %e, "failed to finish progress bar");
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.writer.into_inner().into_inner()
    }
}

impl<W: Write> ProgressCallback for CliProgress<W> {
    fn on_command(&self, _file_index: usize, command: &PushCommand) {
        if self.verbose {
            self.print_line(&command.to_string());
        }
    }

    fn on_push_output(&self, _file_index: usize, output: &PushOutput) {
        if self.verbose {
            self.print_output(&output.stdout);
            self.print_output(&output.stderr);
        }
    }

    fn on_file_completed(
        &self,
        _file_index: usize,
        _file: &FileRecord,
        outcome: FileOutcome,
        progress: &ProgressState,
    ) {
        if self.verbose && outcome == FileOutcome::DryRun {
            self.print_line("--- not run without --run");
        }
        if let Err(e) = self.writer.borrow_mut().update(progress) {
            debug!(error = %e, "failed to write progress bar");
        }
    }

    fn on_sync_completed(&self, report: &SyncReport) {
        self.finish();
        if self.verbose {
            eprintln!(
                "Sync complete: {} pushed, {} dry-run, {} skipped",
                report.pushed, report.dry_run, report.skipped
            );
            eprintln!("Started: {}", report.started_at.format("%Y-%m-%d %H:%M:%S"));
            eprintln!("Elapsed: {}", Self::format_duration(self.start_time.elapsed()));
        }
    }
}

/// Initialize stderr logging; `RUST_LOG` overrides the default `warn` level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Parse arguments, run the sync, and exit with its status
fn main() {
    let args = Args::parse();
    init_logging();

    let exit_code = match run_cli(&args) {
        Ok(_) => 0,
        Err(EngineError::PushFailed { stdout, stderr, .. }) => {
            println!("{}", stdout.trim());
            println!("{}", stderr.trim());
            1
        }
        Err(e) => {
            error!(error = %e, "sync failed");
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };

    std::process::exit(exit_code);
}

/// Main CLI logic - separated for testability
fn run_cli(args: &Args) -> Result<SyncReport, EngineError> {
    let options = args.sync_options();
    let plan = plan_sync(&args.src)?;

    // A dry run never executes adb, so an unresolved path is only displayed
    let adb = match resolve_adb(args.adb.as_deref()) {
        Ok(path) => path,
        Err(e) if !options.run => {
            debug!(error = %e, "adb not resolved; using bare name for dry run");
            PathBuf::from("adb")
        }
        Err(e) => return Err(e),
    };

    let progress = CliProgress::new(io::stdout(), &options);
    let result = run_sync(
        &plan,
        &args.dest,
        &adb,
        &options,
        &mut AdbTransferrer::new(),
        Some(&progress),
    );
    progress.finish();
    result
}
