//! Recording container engine
//!
//! Stands in for the Docker daemon: records every lifecycle call in order and
//! lets a test decide whether loads and runs succeed.

use async_trait::async_trait;
use hotswap_engine::{ContainerEngine, ContainerHandle, EngineError, RunSpec};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// A lifecycle call observed by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Run(RunSpec),
    Stop(String),
    Load(usize),
    Restart(String),
}

impl Call {
    /// Short name, for asserting on sequences
    pub fn name(&self) -> &'static str {
        match self {
            Call::Run(_) => "run",
            Call::Stop(_) => "stop",
            Call::Load(_) => "load",
            Call::Restart(_) => "restart",
        }
    }
}

pub struct MockEngine {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicUsize,
    loaded_images: Mutex<Vec<String>>,
    reject_load: Mutex<Option<String>>,
    fail_run: AtomicBool,
    fail_stop: AtomicBool,
    fail_restart: AtomicBool,
    load_delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            loaded_images: Mutex::new(vec!["app:latest".to_string()]),
            reject_load: Mutex::new(None),
            fail_run: AtomicBool::new(false),
            fail_stop: AtomicBool::new(false),
            fail_restart: AtomicBool::new(false),
            load_delay: Mutex::new(None),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Make every load fail as a malformed archive
    pub fn reject_loads(&self, message: &str) {
        *self.reject_load.lock() = Some(message.to_string());
    }

    pub fn fail_runs(&self, fail: bool) {
        self.fail_run.store(fail, Ordering::SeqCst);
    }

    pub fn fail_stops(&self, fail: bool) {
        self.fail_stop.store(fail, Ordering::SeqCst);
    }

    pub fn fail_restarts(&self, fail: bool) {
        self.fail_restart.store(fail, Ordering::SeqCst);
    }

    /// Make loads take a while, to widen race windows
    pub fn delay_loads(&self, delay: Duration) {
        *self.load_delay.lock() = Some(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls.lock().iter().map(Call::name).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Highest number of engine calls that were ever in progress at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContainerEngine for MockEngine {
    async fn run(&self, spec: &RunSpec) -> Result<ContainerHandle, EngineError> {
        self.record(Call::Run(spec.clone()));
        if self.fail_run.load(Ordering::SeqCst) {
            return Err(EngineError::NotFound(format!("No such image: {}", spec.image)));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(ContainerHandle::new(
            format!("{:064x}", id),
            format!("hotswap-test-{}", id),
        ))
    }

    async fn stop(&self, handle: &ContainerHandle) -> Result<(), EngineError> {
        self.record(Call::Stop(handle.id.clone()));
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(EngineError::Unreachable("connection refused".to_string()));
        }
        Ok(())
    }

    async fn load(&self, mut archive: File) -> Result<Vec<String>, EngineError> {
        self.enter();
        let mut data = Vec::new();
        archive
            .read_to_end(&mut data)
            .await
            .map_err(|e| EngineError::ImageLoad(e.to_string()))?;
        self.record(Call::Load(data.len()));

        let delay = *self.load_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.exit();

        if let Some(message) = self.reject_load.lock().clone() {
            return Err(EngineError::ImageLoad(message));
        }
        Ok(self.loaded_images.lock().clone())
    }

    async fn restart(&self, handle: &ContainerHandle) -> Result<(), EngineError> {
        self.record(Call::Restart(handle.id.clone()));
        if self.fail_restart.load(Ordering::SeqCst) {
            return Err(EngineError::NotFound(format!("No such container: {}", handle.id)));
        }
        Ok(())
    }

    async fn logs(&self, handle: &ContainerHandle) -> Result<String, EngineError> {
        Ok(format!("{} listening\n", handle.name))
    }
}
