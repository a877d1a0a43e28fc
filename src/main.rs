//! cardiorisk: Cardiovascular risk inference service
//!
//! Main entry point: reads one JSON request per line on stdin and writes one
//! JSON response per line on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cardiorisk::adapters::fs::FsArtifactStore;
use cardiorisk::adapters::sanitize::SanitizingMakeWriter;
use cardiorisk::adapters::stdio;
use cardiorisk::application::{bootstrap, Api};
use cardiorisk::config::{self, LogConfig, LogMode};

fn init_logging(log: &LogConfig) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    // Stdout carries protocol responses, so logs go to stderr or a file.
    let (writer, guard) = match log.mode {
        LogMode::File => {
            if let Some(parent) = log.file.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating log directory {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log.file)
                .with_context(|| format!("opening log file {}", log.file.display()))?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
        .init();

    Ok(guard)
}

fn main() -> Result<()> {
    let config = config::load()?;
    let _guard = init_logging(&config.log)?;

    tracing::info!("Starting cardiorisk...");

    let policy = config.integrity_policy()?;
    let store = FsArtifactStore::open(
        &config.artifacts.dir,
        config.artifacts.layout.clone(),
        &policy,
    )
    .with_context(|| format!("opening artifacts at {}", config.artifacts.dir.display()))?;

    let services = bootstrap(Arc::new(store), &config.startup_options())?;
    let api = Api::new(services.inference, services.metrics);

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let stats = stdio::serve(stdin.lock(), stdout.lock(), |line| api.handle_bytes(line))?;

    tracing::info!(
        requests = stats.requests,
        skipped = stats.skipped,
        "cardiorisk shutdown complete."
    );
    Ok(())
}
