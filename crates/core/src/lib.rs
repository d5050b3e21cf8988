//! Shared types for hotswap
//!
//! This crate provides:
//! - Startup configuration (`WatchConfig`) and the values derived from it
//! - The bind mount and port mapping handed to the container engine
//! - The lifecycle state of the managed container

pub mod config;
pub mod state;

// Re-exports
pub use config::{
    default_watch_dir, resolve_watch_dir, BindMount, ConfigError, PortMapping, WatchConfig, DEFAULT_COOLDOWN,
    DEFAULT_EXTERNAL_PORT, DEFAULT_IMAGE_FILENAME, DEFAULT_WATCH_DIR, SHARED_FOLDER_ENV,
};
pub use state::ContainerState;
