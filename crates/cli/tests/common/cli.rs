//! Helpers for running the `hotswap` binary
//!
//! Every command runs with the configuration environment cleared, so a
//! developer's shell or `.env` cannot leak into assertions.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

/// Variables the binary reads its configuration from
const CONFIG_VARS: &[&str] = &[
    "WATCH_DIR",
    "PORT_EXTERNAL",
    "PORT_INTERNAL",
    "CONTAINER_NAME",
    "SHARED_FOLDER_DOCKER",
    "DOCKERIMAGE_FILENAME",
    "RELOAD_COOLDOWN_SECS",
    "HOTSWAP_LOCK_FILE",
];

/// CLI command builder
pub struct HotswapCommand {
    working_dir: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
}

impl HotswapCommand {
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            args: Vec::new(),
            env: HashMap::new(),
        }
    }

    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn env(&mut self, key: &str, value: &str) -> &mut Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn execute(&self) -> Result<CommandResult> {
        let start = Instant::now();

        let mut command = Command::new(env!("CARGO_BIN_EXE_hotswap"));
        command.args(&self.args).current_dir(&self.working_dir);
        for var in CONFIG_VARS {
            command.env_remove(var);
        }
        command.envs(&self.env).env("RUST_LOG", "warn");

        let output = command.output().context("Failed to execute command")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration: start.elapsed(),
        })
    }

    /// Execute and assert success
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }

        Ok(result)
    }

    /// Execute and expect failure
    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }

        Ok(result)
    }
}

/// Command execution result
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }
}

/// Usage:
/// ```ignore
/// hotswap!(dir, "clean", "--watch-dir", path).assert_success()?;
/// ```
#[macro_export]
macro_rules! hotswap {
    ($dir:expr, $($arg:expr),*) => {{
        let mut cmd = $crate::common::cli::HotswapCommand::new($dir);
        cmd.args(&[$($arg),*]);
        cmd
    }};
}
