//! Start the hotswap supervisor

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::args::WatchArgs;
use crate::locks;

/// How long a detached supervisor gets to take the lock
const STARTUP_WAIT: Duration = Duration::from_secs(3);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run the supervisor in this process until interrupted
pub async fn run_foreground(watch: WatchArgs, lock_path: &Path) -> Result<()> {
    let config = watch.into_config()?;
    crate::daemon::run(config, lock_path).await
}

/// Spawn a detached supervisor and wait until it holds the lock
pub async fn run_background(
    watch: &WatchArgs,
    lock_path: &Path,
    log_file: Option<PathBuf>,
) -> Result<()> {
    // Surface configuration errors here rather than in the log file
    watch.clone().into_config()?;

    if let Some(owner) = locks::read_owner(lock_path).ok().flatten() {
        if locks::is_process_alive(owner.pid) {
            anyhow::bail!("Supervisor already running (pid {})", owner.pid);
        }
    }

    let log_file = match log_file {
        Some(path) => path,
        None => default_log_path(lock_path),
    };
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent).context("Failed to create log directory")?;
    }

    let exe = std::env::current_exe().context("Failed to get current executable path")?;

    let log_writer = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

    let mut command = Command::new(&exe);
    command
        .arg("start")
        .arg("--foreground")
        .arg("--log-file")
        .arg(&log_file)
        .arg("--lock-file")
        .arg(lock_path)
        .args(watch.to_args())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(log_writer);

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Detach from the terminal's process group so ^C there does not reach it
        command.process_group(0);
    }

    let mut child = command
        .spawn()
        .context("Failed to spawn supervisor process")?;
    let pid = child.id();

    let deadline = tokio::time::Instant::now() + STARTUP_WAIT;
    loop {
        if let Some(status) = child.try_wait()? {
            anyhow::bail!(
                "Supervisor exited during startup ({}), check logs at {}",
                status,
                log_file.display()
            );
        }

        if let Ok(Some(owner)) = locks::read_owner(lock_path) {
            if owner.pid == pid {
                break;
            }
        }

        if tokio::time::Instant::now() >= deadline {
            // Still starting (image pulls can be slow); it is alive, so report it
            tracing::warn!("Supervisor has not taken the lock yet");
            break;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    println!("{} Supervisor started (pid {})", "✓".green(), pid);
    println!("  Watching: {}", watch_dir_display(watch));
    println!("  Logs:     {}", log_file.display());
    Ok(())
}

fn default_log_path(lock_path: &Path) -> PathBuf {
    lock_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(std::env::temp_dir)
        .join("hotswap.log")
}

fn watch_dir_display(watch: &WatchArgs) -> String {
    match &watch.watch_dir {
        Some(dir) => dir.display().to_string(),
        None => "./images".to_string(),
    }
}
