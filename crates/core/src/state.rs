//! Lifecycle state of the managed container

use std::fmt;

/// State of the single managed container
///
/// ```text
/// Stopped -> Starting -> Running -> Stopping -> Stopped
/// Running -> Stopping -> LoadingImage -> Starting -> Running   (reload)
/// Running -> Stopping -> LoadingImage -> Stopped               (bad archive)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
    LoadingImage,
}

impl ContainerState {
    pub fn is_running(&self) -> bool {
        matches!(self, ContainerState::Running)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContainerState::Stopped => "stopped",
            ContainerState::Starting => "starting",
            ContainerState::Running => "running",
            ContainerState::Stopping => "stopping",
            ContainerState::LoadingImage => "loading-image",
        };
        f.write_str(name)
    }
}
