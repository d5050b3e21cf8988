//! Startup cleanup of the watched root
//!
//! Removes stale regular files left directly under the watched directory by a
//! previous run. Subdirectories and everything below them are left alone.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Outcome of a cleanup pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// Files that were deleted
    pub removed: Vec<PathBuf>,
    /// Directories that were left untouched
    pub skipped_dirs: Vec<PathBuf>,
    /// Entries that could not be inspected or removed
    pub failed: Vec<PathBuf>,
}

/// Delete regular files directly under `dir`
///
/// Per-entry failures are logged and recorded in the report; they never stop
/// the pass.
pub fn clear_stale_files(dir: &Path) -> CleanupReport {
    let mut report = CleanupReport::default();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read entry in {}: {}", dir.display(), e);
                if let Some(path) = e.path() {
                    report.failed.push(path.to_path_buf());
                }
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            debug!("Keeping directory {}", entry.path().display());
            report.skipped_dirs.push(entry.into_path());
            continue;
        }
        if !file_type.is_file() {
            // Symlinks and special files are not ours to delete
            continue;
        }

        match std::fs::remove_file(entry.path()) {
            Ok(()) => {
                debug!("Removed stale file {}", entry.path().display());
                report.removed.push(entry.into_path());
            }
            Err(e) => {
                warn!("Failed to remove {}: {}", entry.path().display(), e);
                report.failed.push(entry.into_path());
            }
        }
    }

    info!(
        "Cleaned {}: removed {} file(s), kept {} director(ies)",
        dir.display(),
        report.removed.len(),
        report.skipped_dirs.len()
    );

    report
}
