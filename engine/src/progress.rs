//! Progress reporting.
//!
//! `ProgressCallback` decouples the driver from whatever displays progress.
//! `render_bar` and `BarWriter` provide the standard text bar used by the CLI.

use std::io::{self, Write};
use crate::bridge::{PushCommand, PushOutput};
use crate::model::{FileOutcome, FileRecord, ProgressState, SyncReport, TransferPlan};

/// Width of the bar in cells.
pub const BAR_WIDTH: usize = 40;

const FILLED: char = '#';
const EMPTY: char = '-';
const MB: f64 = 1024.0 * 1024.0;

/// Trait for receiving progress updates from a sync run.
///
/// All methods are called synchronously from the driver loop, in order.
/// Default implementations ignore the event.
pub trait ProgressCallback {
    /// Called once before the first file is processed.
    fn on_sync_started(&self, _plan: &TransferPlan) {}

    /// Called when a push command has been constructed, before it runs.
    fn on_command(&self, _file_index: usize, _command: &PushCommand) {}

    /// Called after a push exited successfully.
    fn on_push_output(&self, _file_index: usize, _output: &PushOutput) {}

    /// Called after a file is done (pushed, dry-run, or skipped) and its size
    /// has been added to `progress`.
    fn on_file_completed(
        &self,
        _file_index: usize,
        _file: &FileRecord,
        _outcome: FileOutcome,
        _progress: &ProgressState,
    ) {
    }

    /// Called once after every file has been processed.
    fn on_sync_completed(&self, _report: &SyncReport) {}
}

/// Render the progress line for `progress`.
///
/// ```
/// use engine::model::ProgressState;
/// use engine::progress::render_bar;
///
/// let mut state = ProgressState::new(1000);
/// state.advance(250);
/// assert_eq!(
///     render_bar(&state),
///     "[##########------------------------------] 25.0% (0.0 MB / 0.0 MB)"
/// );
/// ```
pub fn render_bar(progress: &ProgressState) -> String {
    let filled = filled_cells(progress);
    let mut bar = String::with_capacity(BAR_WIDTH);
    bar.extend(std::iter::repeat(FILLED).take(filled));
    bar.extend(std::iter::repeat(EMPTY).take(BAR_WIDTH - filled));

    format!(
        "[{}] {:.1}% ({:.1} MB / {:.1} MB)",
        bar,
        progress.fraction() * 100.0,
        progress.bytes_completed as f64 / MB,
        progress.total_bytes as f64 / MB,
    )
}

fn filled_cells(progress: &ProgressState) -> usize {
    if progress.total_bytes == 0 {
        return BAR_WIDTH;
    }
    let done = progress.bytes_completed.min(progress.total_bytes) as u128;
    (done * BAR_WIDTH as u128 / progress.total_bytes as u128) as usize
}

/// How successive bar updates are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarMode {
    /// Overwrite the current line (carriage return, no newline)
    InPlace,
    /// One line per update
    Lines,
}

/// Writes bar lines to a terminal-like sink.
pub struct BarWriter<W: Write> {
    out: W,
    mode: BarMode,
    dirty: bool,
}

impl<W: Write> BarWriter<W> {
    pub fn new(out: W, mode: BarMode) -> Self {
        BarWriter {
            out,
            mode,
            dirty: false,
        }
    }

    /// Write one bar update.
    pub fn update(&mut self, progress: &ProgressState) -> io::Result<()> {
        let line = render_bar(progress);
        match self.mode {
            BarMode::InPlace => {
                write!(self.out, "{}\r", line)?;
                self.dirty = true;
            }
            BarMode::Lines => writeln!(self.out, "{}", line)?,
        }
        self.out.flush()
    }

    /// Write a full line of other output without clobbering an in-place bar.
    pub fn line(&mut self, text: &str) -> io::Result<()> {
        self.finish()?;
        writeln!(self.out, "{}", text)
    }

    /// Move past an in-place bar so following output starts on a fresh line.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.dirty {
            writeln!(self.out)?;
            self.dirty = false;
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
