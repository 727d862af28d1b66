pub mod commands;
pub mod config;
pub mod logging;
pub mod shutdown;

pub use commands::{DumpOptions, RecordSummary};
pub use config::{Cli, Command, Config, ConfigError, LogLevel};
pub use logging::{LogDirective, LoggingError, LoggingSystem, setup_logging_safe};
pub use shutdown::shutdown_signal;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tracing::info;

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config.resolve().context("Invalid configuration")?;
    setup_logging_safe(config.log_level, &config.log_directives)?;

    match cli.command {
        Command::Record => {
            info!("Starting bootlog v{}", get_version());
            info!(
                path = %config.log_path.display(),
                flush_ms = config.flush_interval_ms,
                retry_ms = config.retry_interval_ms,
                max_pending = ?config.max_pending_records,
                "Configuration loaded"
            );

            let bootlog = commands::start_engine(&config)?;
            let input = BufReader::new(tokio::io::stdin());
            let summary = commands::record(bootlog, input, shutdown_signal()).await?;
            info!(
                submitted = summary.submitted,
                written = summary.stats.records_written,
                dropped = summary.stats.queue.dropped,
                "bootlog stopped"
            );
        }
        Command::Dump { file, json, hex } => {
            let mut stdout = std::io::stdout().lock();
            commands::dump(&file, DumpOptions { json, hex }, &mut stdout).await?;
        }
    }
    Ok(())
}

pub async fn main() -> anyhow::Result<()> {
    run(Cli::parse()).await
}
