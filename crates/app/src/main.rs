use std::sync::Arc;

use clap::Parser;
use services::{Clock, ProgressService, load_bank};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod target;

use cli::Cli;
use target::{StorageTarget, TargetError};

/// Install the stderr subscriber.
///
/// `--log-level`/`EXAM_LOG` wins over `RUST_LOG`; `info` when neither is set.
fn setup_logging(level: Option<&str>) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(level))
        .with_target(false)
        .init();
}

fn log_filter(level: Option<&str>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::try_new(level.to_lowercase()).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| EnvFilter::new("info"))
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let bank_path = cli.bank.ok_or(TargetError::MissingBank)?;
    let target = StorageTarget::parse(&cli.db)?;

    let bank = Arc::new(load_bank(&bank_path).await?);
    let storage = target.open().await?;
    info!(store = %target, exam_id = %bank.exam_id, "opened progress store");

    let service = ProgressService::new(Clock::system(), bank, storage.progress);
    commands::dispatch(&service, cli.command).await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref());

    if let Err(err) = run(cli).await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
