//! Supervisor for the single managed container
//!
//! Owns the container handle exclusively. Every lifecycle operation holds the
//! same async lock for its whole duration, so a reload can never overlap
//! another reload, a stop, or the shutdown hook.

use hotswap_core::{ContainerState, WatchConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, warn};

use crate::client::{ContainerEngine, ContainerHandle, RunSpec};
use crate::error::SupervisorError;

/// Result of a reload
#[derive(Debug)]
pub enum ReloadOutcome {
    /// The new image was loaded and a fresh container is running
    Swapped {
        previous: Option<ContainerHandle>,
        current: ContainerHandle,
        images: Vec<String>,
    },
    /// The sequence stopped early; no container is running
    Aborted {
        previous: Option<ContainerHandle>,
        reason: SupervisorError,
    },
}

impl ReloadOutcome {
    pub fn is_swapped(&self) -> bool {
        matches!(self, ReloadOutcome::Swapped { .. })
    }
}

/// Exclusive owner of the managed container
pub struct ContainerSupervisor<E> {
    engine: Arc<E>,
    config: WatchConfig,
    /// Currently running container; the lock serializes lifecycle operations
    container: AsyncMutex<Option<ContainerHandle>>,
    /// Observable lifecycle state
    state: Mutex<ContainerState>,
    /// Set by `shutdown`; later lifecycle requests are refused
    closed: AtomicBool,
}

impl<E: ContainerEngine> ContainerSupervisor<E> {
    pub fn new(engine: Arc<E>, config: WatchConfig) -> Self {
        Self {
            engine,
            config,
            container: AsyncMutex::new(None),
            state: Mutex::new(ContainerState::Stopped),
            closed: AtomicBool::new(false),
        }
    }

    /// Start the container
    ///
    /// Errors are returned to the caller; at process startup they are fatal.
    pub async fn start(&self) -> Result<ContainerHandle, SupervisorError> {
        let mut slot = self.container.lock().await;
        if self.is_closed() {
            return Err(SupervisorError::ShuttingDown);
        }
        if let Some(handle) = slot.as_ref() {
            return Err(SupervisorError::AlreadyRunning(handle.clone()));
        }
        self.start_locked(&mut slot).await
    }

    /// Stop the container if one is running
    ///
    /// Best effort: engine failures are logged and the handle is cleared
    /// regardless. Returns the handle that was stopped.
    pub async fn stop(&self) -> Option<ContainerHandle> {
        let mut slot = self.container.lock().await;
        self.stop_locked(&mut slot).await
    }

    /// Load the image archive into the engine
    pub async fn load_image(&self) -> Result<Vec<String>, SupervisorError> {
        let _slot = self.container.lock().await;
        let before = self.state();
        let result = self.load_locked().await;
        self.set_state(before);
        result
    }

    /// Restart the running container in place
    ///
    /// No-op when nothing is running. If the engine fails to restart it, the
    /// container is stopped and forgotten, so the handle and the state agree.
    pub async fn restart(&self) -> Result<Option<ContainerHandle>, SupervisorError> {
        let mut slot = self.container.lock().await;
        let Some(handle) = slot.clone() else {
            debug!("No container to restart");
            return Ok(None);
        };

        info!("Restarting container {}", handle);
        self.set_state(ContainerState::Stopping);
        match self.engine.restart(&handle).await {
            Ok(()) => {
                self.set_state(ContainerState::Running);
                Ok(Some(handle))
            }
            Err(source) => {
                warn!("Restart of {} failed: {}", handle, source);
                self.stop_locked(&mut slot).await;
                Err(SupervisorError::Start {
                    image: self.config.image.clone(),
                    source,
                })
            }
        }
    }

    /// Replace the running container with one started from the new archive
    ///
    /// Stops the current container, loads the archive, and starts a new
    /// container only if the load succeeded. On any failure the supervisor is
    /// left with nothing running until the next trigger.
    pub async fn reload(&self) -> ReloadOutcome {
        let mut slot = self.container.lock().await;
        if self.is_closed() {
            debug!("Reload requested after shutdown, ignoring");
            return ReloadOutcome::Aborted {
                previous: None,
                reason: SupervisorError::ShuttingDown,
            };
        }
        info!("Reloading container from {}", self.config.archive_path().display());

        let previous = self.stop_locked(&mut slot).await;

        let images = match self.load_locked().await {
            Ok(images) => images,
            Err(reason) => {
                self.set_state(ContainerState::Stopped);
                error!("Reload aborted, container left stopped: {}", reason);
                return ReloadOutcome::Aborted { previous, reason };
            }
        };

        match self.start_locked(&mut slot).await {
            Ok(current) => {
                info!("Reload complete, now running {}", current);
                ReloadOutcome::Swapped {
                    previous,
                    current,
                    images,
                }
            }
            Err(reason) => {
                error!("Reload aborted, container left stopped: {}", reason);
                ReloadOutcome::Aborted { previous, reason }
            }
        }
    }

    /// Stop the container for process exit
    ///
    /// Waits for an in-flight reload to finish first, then stops whatever it
    /// left running. Reloads queued behind the shutdown are refused.
    pub async fn shutdown(&self) -> Option<ContainerHandle> {
        let mut slot = self.container.lock().await;
        self.closed.store(true, Ordering::SeqCst);
        info!("Shutting down");
        self.stop_locked(&mut slot).await
    }

    /// Handle of the running container
    ///
    /// Waits for an in-flight lifecycle operation.
    pub async fn current(&self) -> Option<ContainerHandle> {
        self.container.lock().await.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> ContainerState {
        *self.state.lock()
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    async fn start_locked(
        &self,
        slot: &mut Option<ContainerHandle>,
    ) -> Result<ContainerHandle, SupervisorError> {
        let spec = RunSpec::from_config(&self.config);
        info!(
            "Running container from {} ({})",
            spec.image,
            self.config.port_mapping()
        );
        self.set_state(ContainerState::Starting);

        let handle = match self.engine.run(&spec).await {
            Ok(handle) => handle,
            Err(source) => {
                self.set_state(ContainerState::Stopped);
                return Err(SupervisorError::Start {
                    image: spec.image,
                    source,
                });
            }
        };

        *slot = Some(handle.clone());
        self.set_state(ContainerState::Running);

        match self.engine.logs(&handle).await {
            Ok(output) if !output.trim().is_empty() => {
                info!("Startup output of {}:\n{}", handle, output.trim_end());
            }
            Ok(_) => debug!("No startup output from {}", handle),
            Err(e) => warn!("Failed to read logs of {}: {}", handle, e),
        }

        Ok(handle)
    }

    async fn stop_locked(&self, slot: &mut Option<ContainerHandle>) -> Option<ContainerHandle> {
        let handle = slot.take()?;

        info!("Stopping container {}", handle);
        self.set_state(ContainerState::Stopping);
        if let Err(e) = self.engine.stop(&handle).await {
            warn!("Failed to stop {}: {}", handle, e);
        }
        self.set_state(ContainerState::Stopped);

        Some(handle)
    }

    async fn load_locked(&self) -> Result<Vec<String>, SupervisorError> {
        let path = self.config.archive_path();
        info!("Loading new image from {}", path.display());
        self.set_state(ContainerState::LoadingImage);

        let archive = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SupervisorError::ArchiveMissing(path));
            }
            Err(source) => return Err(SupervisorError::ArchiveRead { path, source }),
        };

        let images = self
            .engine
            .load(archive)
            .await
            .map_err(SupervisorError::ImageLoad)?;
        info!("Loaded {:?}", images);

        Ok(images)
    }

    fn set_state(&self, next: ContainerState) {
        let mut state = self.state.lock();
        if *state != next {
            debug!("Container state {} -> {}", *state, next);
            *state = next;
        }
    }
}
