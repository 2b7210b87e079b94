//! rate-watcher CLI
//!
//! Runs the two watch cycles, or a single pass of either for cron-style use.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rate_watcher::{
    config::{ConfigOrigin, load_config},
    error::{AppError, Result},
    models::Config,
    notify::{Notifier, format::format_rate},
    pipeline::{ChangeDetector, DigestOutcome, DigestReporter, Scheduler},
    services::{HttpPageSource, PageSource, SnapshotBuilder, StaticPageSource, parser},
    storage::{RateStore, open_store},
};

/// rate-watcher - Bank Deposit Rate Watcher
#[derive(Parser, Debug)]
#[command(
    name = "rate-watcher",
    version,
    about = "Watches deposit rate listings and notifies on changes"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Write notifications to the log instead of sending them
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run change detection and analytics until interrupted
    Run,

    /// Run one change-detection pass
    Check {
        /// JSON array of captured card texts to use instead of the live listing
        #[arg(long)]
        replay: Option<PathBuf>,
    },

    /// Send one analytics digest
    Digest,

    /// Parse one card text from a file and print the record
    Parse {
        /// File holding the visible text of one card
        file: PathBuf,
    },

    /// Print stored rates
    Show,

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag and configured level.
#[cfg(not(feature = "json-log"))]
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Initialize JSON logging; `log` records are forwarded to the subscriber.
#[cfg(feature = "json-log")]
fn init_logging(verbose: bool, level: &str) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let level = if verbose { "debug" } else { level };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                log::error!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Ctrl-C received"),
        _ = terminate => log::info!("SIGTERM received"),
    }
}

fn load_replay(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn detector(
    config: &Config,
    source: Arc<dyn PageSource>,
    store: Arc<dyn RateStore>,
    notifier: Notifier,
) -> ChangeDetector {
    ChangeDetector::new(
        SnapshotBuilder::new(source, config.source.timeout()),
        store,
        notifier,
        config.storage.timeout(),
    )
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, origin) = load_config(&cli.config)?;
    init_logging(cli.verbose, &config.logging.level);

    match origin {
        ConfigOrigin::File => log::info!("Loaded configuration from {}", cli.config.display()),
        ConfigOrigin::Defaults => {
            log::warn!("{} not found, running with defaults", cli.config.display())
        }
    }

    match cli.command {
        Command::Run => {
            config.validate()?;
            let store = open_store(&config.storage).await?;
            let notifier = Notifier::from_config(&config.notify, cli.dry_run)?;
            let source: Arc<dyn PageSource> = Arc::new(HttpPageSource::new(&config.source)?);

            let detector = Arc::new(detector(&config, source, Arc::clone(&store), notifier.clone()));
            let digest = Arc::new(DigestReporter::new(store, notifier, config.storage.timeout()));

            let handle = Scheduler::from_config(detector, digest, &config.schedule).start();
            shutdown_signal().await;

            let grace = config.schedule.shutdown_grace();
            log::info!("Shutting down, waiting up to {}s for running passes", grace.as_secs());
            if !handle.shutdown(grace).await {
                log::warn!("Some passes were abandoned");
            }
        }

        Command::Check { replay } => {
            config.validate()?;
            let source: Arc<dyn PageSource> = match replay {
                Some(path) => {
                    let blocks = load_replay(&path)?;
                    log::info!("Replaying {} cards from {}", blocks.len(), path.display());
                    Arc::new(StaticPageSource::new(blocks))
                }
                None => Arc::new(HttpPageSource::new(&config.source)?),
            };
            let store = open_store(&config.storage).await?;
            let notifier = Notifier::from_config(&config.notify, cli.dry_run)?;

            let report = detector(&config, source, store, notifier).run_pass().await?;
            log::info!(
                "Check complete: {} observed, {} added, {} changed, {} delivered, {} store failures, {} delivery failures",
                report.observed,
                report.added,
                report.changed,
                report.delivered(),
                report.store_failures,
                report.delivery_failures
            );
        }

        Command::Digest => {
            config.validate()?;
            let store = open_store(&config.storage).await?;
            let notifier = Notifier::from_config(&config.notify, cli.dry_run)?;
            let reporter = DigestReporter::new(store, notifier, config.storage.timeout());

            match reporter.run_pass().await? {
                DigestOutcome::Sent { banks } => log::info!("Digest sent ({} banks)", banks),
                DigestOutcome::SkippedEmpty => log::info!("Store is empty, no digest sent"),
            }
        }

        Command::Parse { file } => {
            let raw = std::fs::read_to_string(&file)?;
            let parsed = parser::parse_card(&raw);
            for diagnostic in &parsed.diagnostics {
                log::warn!("Skipped '{}': {}", diagnostic.line, diagnostic.reason);
            }
            println!("{}", serde_json::to_string_pretty(&parsed.record)?);
            if !parsed.record.is_valid() {
                return Err(AppError::validation(
                    "card has no bank name or no positive rate",
                ));
            }
        }

        Command::Show => {
            let store = open_store(&config.storage).await?;
            let records = store.read_all().await?;
            if records.is_empty() {
                log::info!("No stored rates yet.");
            }
            for record in &records {
                println!(
                    "{:<32} {:<32} {:>7}%",
                    record.bank_name,
                    record.deposit_name,
                    format_rate(record.rate)
                );
            }
            log::info!("{} banks stored", records.len());
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }
    }

    Ok(())
}
