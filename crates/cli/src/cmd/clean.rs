//! Remove stale files from the watched directory

use anyhow::{Context, Result};
use hotswap_core::default_watch_dir;
use hotswap_watcher::clear_stale_files;
use owo_colors::OwoColorize;
use std::path::PathBuf;

pub async fn run(watch_dir: Option<PathBuf>) -> Result<()> {
    let dir = match watch_dir {
        Some(dir) => dir,
        None => {
            let cwd = std::env::current_dir().context("Failed to get current directory")?;
            default_watch_dir(&cwd)?
        }
    };

    if !dir.is_dir() {
        anyhow::bail!("Watch directory does not exist: {}", dir.display());
    }

    let report = clear_stale_files(&dir);

    println!(
        "{} Removed {} file(s) from {}",
        "✓".green(),
        report.removed.len(),
        dir.display()
    );
    if !report.skipped_dirs.is_empty() {
        println!("  Kept {} director(ies)", report.skipped_dirs.len());
    }
    if !report.failed.is_empty() {
        println!(
            "  {} {} file(s) could not be removed",
            "!".yellow(),
            report.failed.len()
        );
    }

    Ok(())
}
