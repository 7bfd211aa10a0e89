//! Filesystem operations module.
//!
//! This module provides:
//! - Enumerating the source tree into a `TransferPlan`
//! - Mapping relative paths onto device destination paths

use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;
use crate::model::{FileRecord, TransferPlan};
use crate::error::EngineError;

/// Enumerate the source directory tree and return every file found.
///
/// Files of one directory are recorded together in the order the directory
/// listing yields them, before any of that directory's subdirectories are
/// descended. Nothing is sorted. Symlinks are followed for size queries, but
/// symlinked directories are not descended.
///
/// # Arguments
/// * `source` - Source directory to enumerate
///
/// # Errors
/// Returns EngineError if any directory cannot be listed or any file size
/// cannot be read. Errors are not recovered.
pub fn enumerate_tree(source: &Path) -> Result<TransferPlan, EngineError> {
    let mut files = Vec::new();

    fn recurse(
        path: &Path,
        rel_dir: &str,
        files: &mut Vec<FileRecord>,
    ) -> Result<(), EngineError> {
        let entries = fs::read_dir(path).map_err(|e| EngineError::EnumerationFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut subdirs: Vec<(PathBuf, String)> = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| EngineError::EnumerationFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

            let entry_path = entry.path();
            let file_name = entry.file_name();
            let rel_path = join_relative(rel_dir, &file_name.to_string_lossy());

            let file_type = entry.file_type().map_err(|e| EngineError::MetadataFailed {
                path: entry_path.clone(),
                source: e,
            })?;

            if file_type.is_dir() {
                subdirs.push((entry_path, rel_path));
                continue;
            }

            // Follows symlinks, so a link reports its target's size
            let metadata = fs::metadata(&entry_path).map_err(|e| EngineError::MetadataFailed {
                path: entry_path.clone(),
                source: e,
            })?;

            if metadata.is_dir() {
                trace!(path = %entry_path.display(), "not following directory symlink");
                continue;
            }

            files.push(FileRecord {
                relative_path: rel_path,
                source_path: entry_path,
                size_bytes: metadata.len(),
            });
        }

        for (subdir, rel_path) in subdirs {
            recurse(&subdir, &rel_path, files)?;
        }

        Ok(())
    }

    recurse(source, "", &mut files)?;
    Ok(TransferPlan::new(source.to_path_buf(), files))
}

fn join_relative(rel_dir: &str, name: &str) -> String {
    if rel_dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", rel_dir, name)
    }
}

/// Join two device paths with POSIX semantics.
///
/// An absolute `tail` replaces `base`; otherwise exactly one `/` separates them.
pub fn join_device_path(base: &str, tail: &str) -> String {
    if tail.starts_with('/') || base.is_empty() {
        return tail.to_string();
    }
    if base.ends_with('/') {
        format!("{}{}", base, tail)
    } else {
        format!("{}/{}", base, tail)
    }
}

/// Place a user-supplied destination under the device storage root.
///
/// Leading slashes are stripped from `destination` first, so `/Music` and
/// `Music` both land at `<device_root>/Music`.
pub fn device_destination(device_root: &str, destination: &str) -> String {
    join_device_path(device_root, destination.trim_start_matches('/'))
}
