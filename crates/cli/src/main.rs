//! hotswap CLI - swaps a running container whenever a new image archive lands

use anyhow::Result;
use clap::Parser;
use hotswap_cli::args::{Cli, Commands};
use hotswap_cli::{cmd, locks, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let lock_path = match cli.lock_file {
        Some(path) => path,
        None => locks::default_lock_path(),
    };

    match cli.command {
        Commands::Start {
            watch,
            foreground,
            log_file,
        } => {
            if foreground {
                let _guard = logging::init(log_file.as_deref())?;
                cmd::start::run_foreground(watch, &lock_path).await
            } else {
                logging::init(None)?;
                cmd::start::run_background(&watch, &lock_path, log_file).await
            }
        }
        Commands::Stop { timeout_secs } => {
            logging::init(None)?;
            cmd::stop::run(&lock_path, timeout_secs).await
        }
        Commands::Clean { watch_dir } => {
            logging::init(None)?;
            cmd::clean::run(watch_dir).await
        }
    }
}
