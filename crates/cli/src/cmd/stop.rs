//! Stop a running hotswap supervisor

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;
use std::time::Duration;

use crate::locks;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Interrupt the supervisor recorded in the lock file and wait for it to exit
///
/// The supervisor stops its container before releasing the lock, so once the
/// lock file is gone the container is gone too.
pub async fn run(lock_path: &Path, timeout_secs: u64) -> Result<()> {
    let owner = match locks::read_owner(lock_path)? {
        Some(owner) => owner,
        None => {
            println!("Supervisor not running");
            return Ok(());
        }
    };

    if !locks::is_process_alive(owner.pid) {
        tracing::warn!("Removing stale lock file left by pid {}", owner.pid);
        remove_stale_lock(lock_path);
        println!("Supervisor not running");
        return Ok(());
    }

    send_interrupt(owner.pid)?;
    println!("Stopping supervisor (pid {})...", owner.pid);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(timeout_secs);
    while lock_path.exists() && locks::is_process_alive(owner.pid) {
        if tokio::time::Instant::now() >= deadline {
            anyhow::bail!(
                "Supervisor (pid {}) did not exit within {}s",
                owner.pid,
                timeout_secs
            );
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    println!("{} Supervisor stopped (pid {})", "✓".green(), owner.pid);
    Ok(())
}

/// Returns `true` if the file was removed
fn remove_stale_lock(lock_path: &Path) -> bool {
    match std::fs::remove_file(lock_path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                "Failed to remove stale lock file {}: {}",
                lock_path.display(),
                e
            );
            false
        }
    }
}

#[cfg(unix)]
fn send_interrupt(pid: u32) -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), Signal::SIGINT)
        .with_context(|| format!("Failed to signal supervisor (pid {})", pid))
}
