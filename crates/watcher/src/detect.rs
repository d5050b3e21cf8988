//! Change detection policy
//!
//! Decides which file system events under the watched root should turn into
//! a reload, and forwards those through the debouncer. This module never
//! talks to the container engine itself.

use crate::debounce::Debouncer;
use crate::{EventKind, WatchEvent};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Action invoked when the debounce window closes
pub type ReloadTrigger = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// What the detector does with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Directory noise, dropped unconditionally
    IgnoreDirectory,
    /// Logged only; the write that follows a creation arrives as a modification
    Observe,
    /// Schedules a debounced reload
    Reload,
    /// Deletions and renames are inert
    NoOp,
}

/// Classify a single event
pub fn classify(event: &WatchEvent) -> Decision {
    if event.is_dir {
        return Decision::IgnoreDirectory;
    }

    match event.kind {
        EventKind::Created => Decision::Observe,
        EventKind::Modified => Decision::Reload,
        EventKind::Deleted | EventKind::Moved => Decision::NoOp,
    }
}

/// Applies the classification policy and drives the debounced reload
pub struct ChangeDetector {
    debouncer: Debouncer,
    cooldown: Duration,
    trigger: ReloadTrigger,
}

impl ChangeDetector {
    pub fn new(debouncer: Debouncer, cooldown: Duration, trigger: ReloadTrigger) -> Self {
        Self {
            debouncer,
            cooldown,
            trigger,
        }
    }

    /// Handle one event, scheduling a reload if the policy asks for it
    pub fn handle(&self, event: &WatchEvent) -> Decision {
        let decision = classify(event);

        match decision {
            Decision::IgnoreDirectory => {}
            Decision::Observe => {
                info!("Received created event - {}", event.path.display());
            }
            Decision::Reload => {
                debug!(
                    "Modified {}, reload in {:?} unless more changes arrive",
                    event.path.display(),
                    self.cooldown
                );
                self.debouncer.schedule(self.cooldown, (self.trigger)());
            }
            Decision::NoOp => {
                debug!("Ignoring {:?} event - {}", event.kind, event.path.display());
            }
        }

        decision
    }

    /// Drop a reload that has been scheduled but has not fired yet
    pub fn cancel_pending(&self) -> bool {
        self.debouncer.cancel()
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}
