//! Startup configuration
//!
//! The configuration is resolved once before the supervisor starts and never
//! changes afterwards. Anything missing or malformed here is a fatal startup
//! error, not a runtime fault.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default host-facing port
pub const DEFAULT_EXTERNAL_PORT: u16 = 80;

/// Default name of the image archive inside the watched directory
pub const DEFAULT_IMAGE_FILENAME: &str = "dockerimage.tar";

/// Default watched directory, relative to the working directory
pub const DEFAULT_WATCH_DIR: &str = "images";

/// Default quiet period before a burst of writes turns into a reload
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(3);

/// Environment variable passed to the container with the mount target
pub const SHARED_FOLDER_ENV: &str = "SHARED_FOLDER_DOCKER";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid port for {name}: {value}")]
    InvalidPort { name: &'static str, value: String },

    #[error("container image name must not be empty")]
    EmptyImage,

    #[error("shared folder target must be an absolute container path, got '{0}'")]
    InvalidMountTarget(String),

    #[error("image archive filename must be a plain file name, got '{0}'")]
    InvalidArchiveName(String),

    #[error("watched directory does not exist: {}", .0.display())]
    WatchDirMissing(PathBuf),

    #[error("watched directory must be an absolute path, got {}", .0.display())]
    RelativeWatchDir(PathBuf),

    #[error("failed to prepare {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Immutable supervisor configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    /// Directory watched recursively; also the host side of the bind mount
    pub watch_dir: PathBuf,
    /// Port published by the container (rendered as `<port>/tcp`)
    pub external_port: u16,
    /// Host port the published port is bound to
    pub internal_port: u16,
    /// Image reference the container is started from
    pub image: String,
    /// Mount target of the watched directory inside the container
    pub shared_folder: String,
    /// File name of the image archive inside `watch_dir`
    pub image_filename: String,
    /// Debounce window for reload triggers
    pub cooldown: Duration,
}

impl WatchConfig {
    /// Create a configuration with defaults for every optional setting
    pub fn new(
        watch_dir: impl Into<PathBuf>,
        internal_port: u16,
        image: impl Into<String>,
        shared_folder: impl Into<String>,
    ) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            external_port: DEFAULT_EXTERNAL_PORT,
            internal_port,
            image: image.into(),
            shared_folder: shared_folder.into(),
            image_filename: DEFAULT_IMAGE_FILENAME.to_string(),
            cooldown: DEFAULT_COOLDOWN,
        }
    }

    /// Check every invariant that must hold before the supervisor starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.external_port == 0 {
            return Err(ConfigError::InvalidPort {
                name: "external port",
                value: self.external_port.to_string(),
            });
        }
        if self.internal_port == 0 {
            return Err(ConfigError::InvalidPort {
                name: "internal port",
                value: self.internal_port.to_string(),
            });
        }
        if self.image.trim().is_empty() {
            return Err(ConfigError::EmptyImage);
        }
        if !self.shared_folder.starts_with('/') {
            return Err(ConfigError::InvalidMountTarget(self.shared_folder.clone()));
        }

        // Exactly one normal component: no separators, no `..`
        let mut components = Path::new(&self.image_filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return Err(ConfigError::InvalidArchiveName(self.image_filename.clone())),
        }

        // Also the bind mount source, which the engine only accepts absolute
        if !self.watch_dir.is_absolute() {
            return Err(ConfigError::RelativeWatchDir(self.watch_dir.clone()));
        }
        if !self.watch_dir.is_dir() {
            return Err(ConfigError::WatchDirMissing(self.watch_dir.clone()));
        }

        Ok(())
    }

    /// Full path of the image archive
    ///
    /// Joined as path segments, so `watch_dir` may or may not end with a
    /// separator.
    pub fn archive_path(&self) -> PathBuf {
        self.watch_dir.join(&self.image_filename)
    }

    /// Bind mount exposing the watched directory inside the container
    pub fn bind_mount(&self) -> BindMount {
        BindMount {
            source: self.watch_dir.clone(),
            target: self.shared_folder.clone(),
        }
    }

    /// Port mapping for the container
    pub fn port_mapping(&self) -> PortMapping {
        PortMapping {
            container_port: self.external_port,
            host_port: self.internal_port,
        }
    }

    /// Environment passed to the container
    pub fn container_env(&self) -> Vec<String> {
        vec![format!("{}={}", SHARED_FOLDER_ENV, self.shared_folder)]
    }
}

/// Resolve a configured watched directory to an absolute path
///
/// Relative paths are taken from the working directory. Fails if the
/// directory does not exist.
pub fn resolve_watch_dir(dir: &Path) -> Result<PathBuf, ConfigError> {
    match std::fs::canonicalize(dir) {
        Ok(resolved) => Ok(resolved),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ConfigError::WatchDirMissing(dir.to_path_buf()))
        }
        Err(source) => Err(ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        }),
    }
}

/// Resolve the default watched directory, creating it if absent
pub fn default_watch_dir(base: &Path) -> Result<PathBuf, ConfigError> {
    let dir = base.join(DEFAULT_WATCH_DIR);
    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::Io {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}

/// Host directory bound into the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    pub source: PathBuf,
    pub target: String,
}

/// A single TCP port publication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    pub container_port: u16,
    pub host_port: u16,
}

impl PortMapping {
    /// Engine key for the published port, e.g. `80/tcp`
    pub fn key(&self) -> String {
        format!("{}/tcp", self.container_port)
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.key(), self.host_port)
    }
}
