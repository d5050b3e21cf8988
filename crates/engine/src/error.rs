//! Error types for engine and supervisor operations

use std::path::PathBuf;
use thiserror::Error;

use crate::client::ContainerHandle;

/// Errors reported by a container engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("container engine unreachable: {0}")]
    Unreachable(String),

    #[error("image archive rejected: {0}")]
    ImageLoad(String),

    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container engine error: {0}")]
    Api(#[from] bollard::errors::Error),
}

/// Errors reported by the supervisor
///
/// Only `Start` at process startup is meant to be fatal; everything else is
/// scoped to a single reload.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to start container from {image}: {source}")]
    Start {
        image: String,
        #[source]
        source: EngineError,
    },

    #[error("supervisor is shutting down")]
    ShuttingDown,

    #[error("a container is already running: {0}")]
    AlreadyRunning(ContainerHandle),

    #[error("image archive not found: {}", .0.display())]
    ArchiveMissing(PathBuf),

    #[error("failed to read image archive {}: {source}", path.display())]
    ArchiveRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image load failed: {0}")]
    ImageLoad(#[source] EngineError),
}
