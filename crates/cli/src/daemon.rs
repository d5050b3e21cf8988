//! Supervisor daemon
//!
//! Wires the file watcher through the debouncer into the container
//! supervisor, then idles until an interrupt or a watch failure.

use anyhow::{Context, Result};
use futures::FutureExt;
use hotswap_core::WatchConfig;
use hotswap_engine::{ContainerEngine, ContainerSupervisor, DockerEngine};
use hotswap_watcher::{
    clear_stale_files, ChangeDetector, Debouncer, FsWatcher, ReloadTrigger, WatchFailure,
};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{error, info};

use crate::locks::DaemonLock;

/// Run the supervisor until interrupted
///
/// Startup failures (lock held, engine unreachable, container won't start)
/// are returned before anything is watched.
pub async fn run(config: WatchConfig, lock_path: &Path) -> Result<()> {
    let lock = DaemonLock::acquire(lock_path)?;
    info!("Supervisor lock acquired at {}", lock.path().display());

    let engine = DockerEngine::connect()
        .await
        .context("Failed to connect to container engine")?;

    let daemon = Daemon::start(Arc::new(engine), config).await?;
    let result = daemon.run_until(tokio::signal::ctrl_c()).await;

    lock.release()?;
    result
}

/// Build the trigger the debouncer fires: one full reload
pub fn reload_trigger<E>(supervisor: &Arc<ContainerSupervisor<E>>) -> ReloadTrigger
where
    E: ContainerEngine + 'static,
{
    let supervisor = Arc::clone(supervisor);
    Arc::new(move || {
        let supervisor = Arc::clone(&supervisor);
        async move {
            supervisor.reload().await;
        }
        .boxed()
    })
}

/// A started supervisor with a live subscription
pub struct Daemon<E> {
    supervisor: Arc<ContainerSupervisor<E>>,
    watcher: FsWatcher,
    failures: UnboundedReceiver<WatchFailure>,
}

impl<E: ContainerEngine + 'static> Daemon<E> {
    /// Start the container, clean the watched directory and subscribe to it
    pub async fn start(engine: Arc<E>, config: WatchConfig) -> Result<Self> {
        let supervisor = Arc::new(ContainerSupervisor::new(engine, config.clone()));

        supervisor
            .start()
            .await
            .context("Failed to start container")?;

        clear_stale_files(&config.watch_dir);

        let detector = ChangeDetector::new(
            Debouncer::new(Handle::current()),
            config.cooldown,
            reload_trigger(&supervisor),
        );
        let (failures_tx, failures) = mpsc::unbounded_channel();

        let watcher = match FsWatcher::start(&config.watch_dir, detector, failures_tx) {
            Ok(watcher) => watcher,
            Err(e) => {
                supervisor.shutdown().await;
                return Err(e);
            }
        };

        Ok(Self {
            supervisor,
            watcher,
            failures,
        })
    }

    /// Idle until `shutdown` resolves or the subscription fails
    ///
    /// Either way the subscription is stopped first, so no new reload can be
    /// scheduled, and then the container is stopped. A reload that is already
    /// running finishes before the container is stopped.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = std::io::Result<()>>,
    {
        let result = tokio::select! {
            signal = shutdown => {
                info!("Interrupt received");
                signal.context("Failed to listen for interrupt")
            }
            Some(failure) = self.failures.recv() => {
                error!("Stopping: {}", failure);
                Err(anyhow::Error::new(failure))
            }
        };

        self.watcher.stop();
        self.supervisor.shutdown().await;

        result
    }

    pub fn supervisor(&self) -> &Arc<ContainerSupervisor<E>> {
        &self.supervisor
    }
}
