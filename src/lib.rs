pub mod batch;
pub mod cli;
pub mod config;
pub mod errors;
pub mod export;
pub mod layout;
pub mod overlay;
pub mod pairing;
pub mod upload;

use std::process::ExitCode;

use clap::Parser;

use crate::batch::StatusMessage;
use crate::cli::Cli;

/// Entry point for the `layout-highlighter` binary.
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Fall back to built-in defaults when no config file is found.
    let cfg = match config::load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) if cli.config.is_some() => {
            tracing::error!(error = %e, "failed to load requested config");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            tracing::info!(reason = %e, "using default config");
            config::AppConfig::default()
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "failed to start tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(cli::execute(cli, cfg)) {
        Ok(StatusMessage::Done) => ExitCode::SUCCESS,
        Ok(status) => {
            tracing::warn!(?status, "batch did not complete");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "batch failed");
            ExitCode::FAILURE
        }
    }
}
