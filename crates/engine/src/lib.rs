//! Container lifecycle for hotswap
//!
//! This crate provides:
//! - The `ContainerEngine` capability the supervisor drives
//! - A bollard-backed implementation talking to the local Docker daemon
//! - `ContainerSupervisor`, the exclusive owner of the managed container

pub mod client;
pub mod docker;
pub mod error;
pub mod supervisor;

// Re-exports
pub use client::{ContainerEngine, ContainerHandle, RunSpec};
pub use docker::DockerEngine;
pub use error::{EngineError, SupervisorError};
pub use supervisor::{ContainerSupervisor, ReloadOutcome};
