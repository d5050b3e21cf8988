//! Container engine capability
//!
//! The supervisor only ever talks to the engine through this trait, so the
//! reload sequence can be exercised without a Docker daemon.

use async_trait::async_trait;
use hotswap_core::{BindMount, PortMapping, WatchConfig};
use std::fmt;
use tokio::fs::File;

use crate::error::EngineError;

/// Prefix of every container name created by hotswap
pub const CONTAINER_NAME_PREFIX: &str = "hotswap";

/// Handle to a container created by the engine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerHandle {
    /// Engine-assigned id
    pub id: String,
    /// Name given at creation
    pub name: String,
}

impl ContainerHandle {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// First 12 characters of the id, as the Docker CLI shows it
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(12)
            .map_or(self.id.len(), |(idx, _)| idx);
        &self.id[..end]
    }
}

impl fmt::Display for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.short_id())
    }
}

/// Everything needed to run the managed container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub image: String,
    pub ports: Vec<PortMapping>,
    pub env: Vec<String>,
    pub mounts: Vec<BindMount>,
}

impl RunSpec {
    pub fn from_config(config: &WatchConfig) -> Self {
        Self {
            image: config.image.clone(),
            ports: vec![config.port_mapping()],
            env: config.container_env(),
            mounts: vec![config.bind_mount()],
        }
    }
}

/// Generate a unique container name
pub fn new_container_name() -> String {
    format!(
        "{}-{}",
        CONTAINER_NAME_PREFIX,
        ulid::Ulid::new().to_string().to_lowercase()
    )
}

/// Operations the supervisor needs from a container engine
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Create and start a detached container
    async fn run(&self, spec: &RunSpec) -> Result<ContainerHandle, EngineError>;

    /// Stop a running container
    async fn stop(&self, handle: &ContainerHandle) -> Result<(), EngineError>;

    /// Load an image archive, returning the image references it contained
    ///
    /// The archive is streamed from the open file; implementations must not
    /// buffer it whole.
    async fn load(&self, archive: File) -> Result<Vec<String>, EngineError>;

    /// Restart a container in place
    async fn restart(&self, handle: &ContainerHandle) -> Result<(), EngineError>;

    /// Output the container has produced so far
    async fn logs(&self, handle: &ContainerHandle) -> Result<String, EngineError>;
}
