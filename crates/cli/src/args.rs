//! Command line and environment configuration

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hotswap_core::{
    default_watch_dir, resolve_watch_dir, WatchConfig, DEFAULT_EXTERNAL_PORT,
    DEFAULT_IMAGE_FILENAME,
};
use std::path::PathBuf;
use std::time::Duration;

/// hotswap - replace a running container whenever a new image archive lands
#[derive(Parser, Debug)]
#[command(name = "hotswap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Lock file guarding the single supervisor instance
    #[arg(long, global = true, env = "HOTSWAP_LOCK_FILE")]
    pub lock_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the supervisor
    Start {
        #[command(flatten)]
        watch: WatchArgs,

        /// Run in foreground instead of detaching
        #[arg(long)]
        foreground: bool,

        /// Write logs to this file instead of stderr
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Stop a running supervisor and its container
    Stop {
        /// Seconds to wait for the supervisor to exit
        #[arg(long, default_value = "60")]
        timeout_secs: u64,
    },
    /// Remove stale files from the watched directory
    Clean {
        /// Directory to clean (default: ./images)
        #[arg(long, env = "WATCH_DIR")]
        watch_dir: Option<PathBuf>,
    },
}

/// Supervisor settings, each overridable from the environment
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct WatchArgs {
    /// Directory watched for the image archive (default: ./images, created if absent)
    #[arg(long, env = "WATCH_DIR")]
    pub watch_dir: Option<PathBuf>,

    /// Port published by the container
    #[arg(long, env = "PORT_EXTERNAL", default_value_t = DEFAULT_EXTERNAL_PORT)]
    pub external_port: u16,

    /// Host port the published port is bound to
    #[arg(long, env = "PORT_INTERNAL")]
    pub internal_port: u16,

    /// Image the container is started from
    #[arg(long, env = "CONTAINER_NAME")]
    pub image: String,

    /// Mount target of the watched directory inside the container
    #[arg(long, env = "SHARED_FOLDER_DOCKER")]
    pub shared_folder: String,

    /// File name of the image archive inside the watched directory
    #[arg(long, env = "DOCKERIMAGE_FILENAME", default_value = DEFAULT_IMAGE_FILENAME)]
    pub image_filename: String,

    /// Seconds without changes before a reload fires
    #[arg(long, env = "RELOAD_COOLDOWN_SECS", default_value = "3")]
    pub cooldown_secs: u64,
}

impl WatchArgs {
    /// Resolve into a validated configuration
    ///
    /// The default watched directory is created under the working directory
    /// when no directory was given. A given directory must exist and is made
    /// absolute, since it becomes the container's bind mount source.
    pub fn into_config(self) -> Result<WatchConfig> {
        let watch_dir = match self.watch_dir {
            Some(dir) => resolve_watch_dir(&dir).context("Invalid configuration")?,
            None => {
                let cwd = std::env::current_dir().context("Failed to get current directory")?;
                default_watch_dir(&cwd)?
            }
        };

        let config = WatchConfig {
            watch_dir,
            external_port: self.external_port,
            internal_port: self.internal_port,
            image: self.image,
            shared_folder: self.shared_folder,
            image_filename: self.image_filename,
            cooldown: Duration::from_secs(self.cooldown_secs),
        };
        config.validate().context("Invalid configuration")?;

        Ok(config)
    }

    /// Render back into command line flags, for re-spawning the process
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(dir) = &self.watch_dir {
            args.push("--watch-dir".to_string());
            args.push(dir.to_string_lossy().into_owned());
        }
        args.extend([
            "--external-port".to_string(),
            self.external_port.to_string(),
            "--internal-port".to_string(),
            self.internal_port.to_string(),
            "--image".to_string(),
            self.image.clone(),
            "--shared-folder".to_string(),
            self.shared_folder.clone(),
            "--image-filename".to_string(),
            self.image_filename.clone(),
            "--cooldown-secs".to_string(),
            self.cooldown_secs.to_string(),
        ]);
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("hotswap").chain(args.iter().copied()))
    }

    fn watch_args(dir: &std::path::Path) -> WatchArgs {
        WatchArgs {
            watch_dir: Some(dir.to_path_buf()),
            external_port: 80,
            internal_port: 8080,
            image: "app:latest".to_string(),
            shared_folder: "/shared".to_string(),
            image_filename: "dockerimage.tar".to_string(),
            cooldown_secs: 3,
        }
    }

    #[test]
    fn test_start_flags() {
        let cli = parse(&[
            "start",
            "--foreground",
            "--watch-dir",
            "/data/img/",
            "--internal-port",
            "8080",
            "--image",
            "app:latest",
            "--shared-folder",
            "/shared",
        ])
        .unwrap();

        match cli.command {
            Commands::Start {
                watch, foreground, ..
            } => {
                assert!(foreground);
                assert_eq!(watch.watch_dir, Some(PathBuf::from("/data/img/")));
                assert_eq!(watch.external_port, 80);
                assert_eq!(watch.internal_port, 8080);
                assert_eq!(watch.image_filename, "dockerimage.tar");
                assert_eq!(watch.cooldown_secs, 3);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_rejects_non_numeric_port() {
        let result = parse(&[
            "start",
            "--internal-port",
            "http",
            "--image",
            "app:latest",
            "--shared-folder",
            "/shared",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_stop_defaults() {
        let cli = parse(&["stop", "--lock-file", "/tmp/x.lock"]).unwrap();
        assert_eq!(cli.lock_file, Some(PathBuf::from("/tmp/x.lock")));
        assert!(matches!(cli.command, Commands::Stop { timeout_secs: 60 }));
    }

    #[test]
    fn test_into_config() {
        let temp_dir = TempDir::new().unwrap();

        let config = watch_args(temp_dir.path()).into_config().unwrap();
        let resolved = std::fs::canonicalize(temp_dir.path()).unwrap();
        assert_eq!(config.watch_dir, resolved);
        assert_eq!(config.cooldown, Duration::from_secs(3));
        assert_eq!(config.archive_path(), resolved.join("dockerimage.tar"));
    }

    #[test]
    fn test_relative_watch_dir_becomes_absolute_mount_source() {
        // Created under the working directory so it can be named relatively
        let temp_dir = TempDir::new_in(".").unwrap();
        let relative = PathBuf::from(temp_dir.path().file_name().unwrap());
        assert!(relative.is_relative());

        let config = watch_args(&relative).into_config().unwrap();
        let mount = config.bind_mount();
        assert!(mount.source.is_absolute());
        assert_eq!(mount.source, std::fs::canonicalize(temp_dir.path()).unwrap());
    }

    #[test]
    fn test_into_config_rejects_invalid_values() {
        let temp_dir = TempDir::new().unwrap();

        let mut args = watch_args(temp_dir.path());
        args.shared_folder = "relative".to_string();
        assert!(args.into_config().is_err());

        let args = watch_args(&temp_dir.path().join("missing"));
        assert!(args.into_config().is_err());
    }

    #[test]
    fn test_to_args_round_trips_through_clap() {
        let temp_dir = TempDir::new().unwrap();
        let original = watch_args(temp_dir.path());

        let mut argv = vec!["start".to_string(), "--foreground".to_string()];
        argv.extend(original.to_args());
        let cli = Cli::try_parse_from(std::iter::once("hotswap".to_string()).chain(argv)).unwrap();

        match cli.command {
            Commands::Start { watch, .. } => assert_eq!(watch, original),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
