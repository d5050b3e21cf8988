//! Docker engine backed by bollard

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, LogsOptions, RemoveContainerOptions,
    RestartContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::ImportImageOptions;
use bollard::models::{HostConfig, Mount, MountTypeEnum, PortBinding};
use bollard::Docker;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::client::{new_container_name, ContainerEngine, ContainerHandle, RunSpec};
use crate::error::EngineError;

/// Seconds the engine waits for a graceful stop before killing
pub const DEFAULT_STOP_TIMEOUT_SECS: i64 = 10;

/// Connection to the local Docker daemon
pub struct DockerEngine {
    docker: Docker,
    stop_timeout: i64,
}

impl DockerEngine {
    /// Connect using the local defaults (`DOCKER_HOST` or the default socket)
    ///
    /// Pings the daemon so an unreachable engine fails at startup.
    pub async fn connect() -> Result<Self, EngineError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| EngineError::Unreachable(e.to_string()))?;

        let version = docker
            .version()
            .await
            .map_err(|e| EngineError::Unreachable(e.to_string()))?;
        info!(
            "Connected to container engine {}",
            version.version.as_deref().unwrap_or("(unknown version)")
        );

        Ok(Self {
            docker,
            stop_timeout: DEFAULT_STOP_TIMEOUT_SECS,
        })
    }

    pub fn with_stop_timeout(mut self, secs: i64) -> Self {
        self.stop_timeout = secs;
        self
    }

    fn container_config(spec: &RunSpec) -> Config<String> {
        let mut exposed_ports = HashMap::new();
        let mut port_bindings = HashMap::new();
        for mapping in &spec.ports {
            exposed_ports.insert(mapping.key(), HashMap::new());
            port_bindings.insert(
                mapping.key(),
                Some(vec![PortBinding {
                    host_ip: None,
                    host_port: Some(mapping.host_port.to_string()),
                }]),
            );
        }

        let mounts = spec
            .mounts
            .iter()
            .map(|mount| Mount {
                target: Some(mount.target.clone()),
                source: Some(mount.source.to_string_lossy().into_owned()),
                typ: Some(MountTypeEnum::BIND),
                ..Default::default()
            })
            .collect();

        Config {
            image: Some(spec.image.clone()),
            env: Some(spec.env.clone()),
            exposed_ports: Some(exposed_ports),
            host_config: Some(HostConfig {
                port_bindings: Some(port_bindings),
                mounts: Some(mounts),
                // Stopped containers are removed by the engine
                auto_remove: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn run(&self, spec: &RunSpec) -> Result<ContainerHandle, EngineError> {
        let name = new_container_name();
        let options = CreateContainerOptions {
            name: name.clone(),
            platform: None,
        };

        let created = self
            .docker
            .create_container(Some(options), Self::container_config(spec))
            .await
            .map_err(map_error)?;
        for warning in &created.warnings {
            warn!("Engine warning for {}: {}", name, warning);
        }

        if let Err(e) = self
            .docker
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await
        {
            // auto_remove only applies once a container has run
            let remove = RemoveContainerOptions {
                force: true,
                ..Default::default()
            };
            if let Err(cleanup) = self.docker.remove_container(&created.id, Some(remove)).await {
                debug!("Failed to remove unstarted container {}: {}", name, cleanup);
            }
            return Err(map_error(e));
        }

        Ok(ContainerHandle::new(created.id, name))
    }

    async fn stop(&self, handle: &ContainerHandle) -> Result<(), EngineError> {
        let options = StopContainerOptions {
            t: self.stop_timeout,
        };

        match self.docker.stop_container(&handle.id, Some(options)).await {
            Ok(()) => Ok(()),
            // Already stopped
            Err(BollardError::DockerResponseServerError {
                status_code: 304, ..
            }) => Ok(()),
            Err(e) => Err(map_error(e)),
        }
    }

    async fn load(&self, archive: File) -> Result<Vec<String>, EngineError> {
        // The engine only accepts a stream of chunks, so a read error ends the
        // upload early and is reported once the engine has answered
        let read_error = Arc::new(Mutex::new(None::<std::io::Error>));
        let chunks = {
            let read_error = Arc::clone(&read_error);
            ReaderStream::new(archive).scan((), move |_, chunk| {
                let next = match chunk {
                    Ok(bytes) => Some(bytes),
                    Err(e) => {
                        *read_error.lock() = Some(e);
                        None
                    }
                };
                futures::future::ready(next)
            })
        };

        let stream =
            self.docker
                .import_image_stream(ImportImageOptions { quiet: false }, chunks, None);
        futures::pin_mut!(stream);

        let mut images = Vec::new();
        while let Some(item) = stream.next().await {
            let progress = item.map_err(|e| match e {
                BollardError::DockerResponseServerError { message, .. } => {
                    EngineError::ImageLoad(message)
                }
                other => map_error(other),
            })?;

            if let Some(error) = progress.error {
                return Err(EngineError::ImageLoad(error));
            }
            if let Some(line) = progress.stream.as_deref() {
                debug!("{}", line.trim_end());
                images.extend(parse_loaded_refs(line));
            }
        }

        if let Some(e) = read_error.lock().take() {
            return Err(EngineError::ImageLoad(format!("failed to read archive: {}", e)));
        }

        Ok(images)
    }

    async fn restart(&self, handle: &ContainerHandle) -> Result<(), EngineError> {
        let options = RestartContainerOptions {
            t: self.stop_timeout as isize,
        };
        self.docker
            .restart_container(&handle.id, Some(options))
            .await
            .map_err(map_error)
    }

    async fn logs(&self, handle: &ContainerHandle) -> Result<String, EngineError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: "all".to_string(),
            ..Default::default()
        };

        let stream = self.docker.logs(&handle.id, Some(options));
        futures::pin_mut!(stream);

        let mut output = String::new();
        while let Some(chunk) = stream.next().await {
            output.push_str(&chunk.map_err(map_error)?.to_string());
        }
        Ok(output)
    }
}

/// Map a bollard error onto the engine taxonomy
fn map_error(error: BollardError) -> EngineError {
    match error {
        BollardError::DockerResponseServerError {
            status_code: 404,
            message,
        } => EngineError::NotFound(message),
        other => EngineError::Api(other),
    }
}

/// Extract image references from `docker load` progress output
///
/// The engine reports either `Loaded image: <ref>` for tagged images or
/// `Loaded image ID: <digest>` for untagged ones.
pub fn parse_loaded_refs(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            line.strip_prefix("Loaded image ID:")
                .or_else(|| line.strip_prefix("Loaded image:"))
                .map(|image| image.trim().to_string())
        })
        .filter(|image| !image.is_empty())
        .collect()
}
