//! Event Harvester CLI
//!
//! Local execution entry point. Settings come from an optional TOML file
//! overlaid with the process environment.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use event_harvester::{
    error::Result,
    models::Config,
    pipeline::{self, HarvestReport},
    storage::LocalStorage,
};

/// Harvester for paginated, script-rendered event listings
#[derive(Parser, Debug)]
#[command(name = "harvester", version, about = "Authenticated event listing harvester")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "harvest.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in, walk the listing and stream every event
    Harvest,

    /// Validate configuration and environment
    Validate,

    /// Show what is in the output directory
    Info,
}

/// Initialize logging from the configured level, or debug when verbose.
fn init_logging(level: &str, verbose: bool) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// File settings (when the file exists) overlaid with the environment.
fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        Config::load(path)?
    } else {
        Config::default()
    };
    config.apply_env()?;
    Ok(config)
}

fn log_report(report: &HarvestReport) {
    log::info!("State: {:?}", report.state);
    log::info!(
        "Records streamed: {} across {} pages ({} failed to stream)",
        report.records,
        report.pages,
        report.item_failures
    );
    log::info!("Snapshots: {}", report.snapshots.len());
    for snapshot in &report.snapshots {
        log::info!("  - {}", snapshot.display());
    }
    if let Some(batch) = &report.batch {
        log::info!("Batch: {} and {}", batch.latest.display(), batch.dated.display());
    }
    if let Some(shot) = &report.screenshot {
        log::info!("Screenshot: {}", shot.display());
    }
    if let Some(error) = &report.error {
        log::error!("Error: {error}");
    }
    log::info!("Elapsed: {}s", report.elapsed_secs());
}

async fn run(cli: Cli, config: Config) -> Result<bool> {
    match cli.command {
        Command::Harvest => {
            config.validate()?;
            let report = pipeline::run_harvest(Arc::new(config)).await?;
            log_report(&report);
            Ok(report.succeeded())
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            config.validate()?;
            log::info!("✓ Config OK");

            if config.credentials.is_complete() {
                log::info!("✓ Credentials present");
            } else {
                log::warn!("Credentials missing: set FLOW_EMAIL and FLOW_PASS");
                return Ok(false);
            }

            match &config.stream.publish_script {
                Some(script) if script.exists() => {
                    log::info!("✓ Publish script {}", script.display());
                }
                Some(script) => log::warn!(
                    "Publish script {} not found, artifacts stay local",
                    script.display()
                ),
                None => log::info!("No publish script, artifacts stay local"),
            }
            Ok(true)
        }

        Command::Info => {
            let storage = LocalStorage::new(&config.output.dir);
            let summary = storage.summary().await?;
            log::info!("Output directory: {}", storage.root().display());
            log::info!("Stream records: {}", summary.stream_lines);
            log::info!("Snapshots: {}", summary.snapshots.len());
            for name in &summary.snapshots {
                log::info!("  - {name}");
            }
            match summary.batch_records {
                Some(count) => log::info!("Latest batch: {count} records"),
                None => log::info!("No batch file yet."),
            }
            Ok(true)
        }
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            init_logging("info", cli.verbose);
            log::error!("Could not load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.logging.level, cli.verbose);
    log::info!("Event harvester starting...");

    match run(cli, config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
