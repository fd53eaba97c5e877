pub mod cli;
pub mod config;
pub mod dashboard;
pub mod interaction;
pub mod models;
pub mod report;
pub mod service;
pub mod session;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

pub fn run() -> ExitCode {
    // stderr only: stdout carries listings and JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    cli::run()
}
