//! Trailing-edge debouncing
//!
//! Collapses a burst of `schedule` calls into a single deferred action that
//! fires once the trigger has been quiet for the requested delay.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

/// Single-trigger debouncer
///
/// Each instance owns at most one armed timer. Scheduling again before the
/// timer fires cancels it and starts a new one, so only the last call in a
/// burst produces an action. Once a timer fires, the action runs on its own
/// task and is never interrupted by later `schedule` or `cancel` calls.
///
/// `schedule` only needs `&self` and may be called from any thread, including
/// threads that are not part of the tokio runtime.
pub struct Debouncer {
    /// Runtime the timers and actions are spawned on
    runtime: Handle,
    /// Armed, not-yet-fired timer
    pending: Mutex<Option<JoinHandle<()>>>,
    /// Number of timers that fired
    fired: Arc<AtomicU64>,
}

impl Debouncer {
    /// Create a debouncer spawning onto the given runtime
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            pending: Mutex::new(None),
            fired: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Arm the timer, replacing any pending one
    pub fn schedule<F>(&self, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock();
        if let Some(timer) = pending.take() {
            if !timer.is_finished() {
                trace!("Debounce timer re-armed");
            }
            timer.abort();
        }

        let fired = Arc::clone(&self.fired);
        let timer = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            fired.fetch_add(1, Ordering::SeqCst);
            // Detached from the timer so aborting it cannot reach the action
            tokio::spawn(action);
        });
        *pending = Some(timer);
    }

    /// Drop the pending timer without firing it
    ///
    /// Returns `true` if a timer was still armed.
    pub fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(timer) => {
                let armed = !timer.is_finished();
                timer.abort();
                armed
            }
            None => false,
        }
    }

    /// Whether a timer is armed and has not fired yet
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .map_or(false, |timer| !timer.is_finished())
    }

    /// Number of actions fired so far
    pub fn fired(&self) -> u64 {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(timer) = self.pending.get_mut().take() {
            timer.abort();
        }
    }
}
