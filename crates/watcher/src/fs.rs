//! Recursive notify subscription
//!
//! The notify backend delivers events on its own thread. They are pushed into
//! a bounded queue and consumed by a single dispatch thread that applies the
//! change detection policy, so slow policy work never stalls event delivery
//! and engine calls never run on either thread.

use crate::detect::ChangeDetector;
use crate::WatchEvent;
use anyhow::{Context, Result};
use crossbeam_channel::{bounded, TrySendError};
use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

/// Capacity of the queue between the notify thread and the dispatch thread
pub const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Unrecoverable problem with the subscription
#[derive(Debug, Error)]
pub enum WatchFailure {
    #[error("file watcher error: {0}")]
    Notify(#[from] notify::Error),

    #[error("watched directory was removed: {}", .0.display())]
    RootRemoved(PathBuf),
}

/// Live subscription on the watched root
pub struct FsWatcher {
    root: PathBuf,
    watcher: Option<RecommendedWatcher>,
    dispatch: Option<JoinHandle<()>>,
}

impl FsWatcher {
    /// Subscribe to `root` recursively and start dispatching into `detector`
    ///
    /// Subscription failures are reported on `failures`; the owner decides
    /// whether to stop.
    pub fn start(
        root: &Path,
        detector: ChangeDetector,
        failures: UnboundedSender<WatchFailure>,
    ) -> Result<Self> {
        let root = root.to_path_buf();
        let (tx, rx) = bounded::<notify::Result<notify::Event>>(EVENT_QUEUE_CAPACITY);

        let mut watcher = notify::recommended_watcher(move |res| match tx.try_send(res) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event queue full, dropping file system event");
            }
            Err(TrySendError::Disconnected(_)) => {}
        })
        .context("Failed to create file watcher")?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", root.display()))?;

        let dispatch_root = root.clone();
        let dispatch = std::thread::Builder::new()
            .name("hotswap-dispatch".to_string())
            .spawn(move || {
                for res in rx.iter() {
                    let event = match res {
                        Ok(event) => event,
                        Err(e) => {
                            warn!("File watcher error: {}", e);
                            let _ = failures.send(WatchFailure::Notify(e));
                            continue;
                        }
                    };

                    for change in WatchEvent::from_notify(event) {
                        if change.path == dispatch_root && change.kind == crate::EventKind::Deleted
                        {
                            let _ = failures
                                .send(WatchFailure::RootRemoved(dispatch_root.clone()));
                            continue;
                        }
                        detector.handle(&change);
                    }
                }
                debug!("Dispatch loop exited");
            })
            .context("Failed to spawn dispatch thread")?;

        info!("Watching {} (recursive)", root.display());

        Ok(Self {
            root,
            watcher: Some(watcher),
            dispatch: Some(dispatch),
        })
    }

    /// Stop the subscription and wait for the dispatch thread
    ///
    /// Idempotent.
    pub fn stop(&mut self) {
        // Dropping the watcher drops the queue sender, which ends the dispatch loop
        if self.watcher.take().is_some() {
            info!("Stopped watching {}", self.root.display());
        }
        if let Some(dispatch) = self.dispatch.take() {
            if dispatch.join().is_err() {
                warn!("Dispatch thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.watcher.is_some()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for FsWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
