//! hpoi-relay CLI
//!
//! One invocation is one relay pass. Schedule it externally (cron, systemd
//! timer) and never run two at once.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use hpoi_relay::{
    error::Result,
    models::{Config, RunMode},
    pipeline::{self, Deadline},
    services::{FeedSource, HpoiFeed},
    storage::LocalStorage,
};

/// hpoi-relay - hpoi.net news to Telegram
#[derive(Parser, Debug)]
#[command(
    name = "hpoi-relay",
    version,
    about = "Relay new hpoi.net figure news to Telegram channels"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the configured mode (production, development, test)
    #[arg(short, long)]
    mode: Option<RunMode>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one relay pass
    Run,

    /// Validate the configuration file
    Validate,

    /// Show dedup store info
    Info,

    /// Fetch and print the normalized tags of one item
    Tags {
        /// hpoi.net item id
        id: u64,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Only the read-only helpers may fall back to defaults.
    let mut config = match cli.command {
        Command::Run | Command::Validate => match Config::load(&cli.config) {
            Ok(config) => config,
            Err(e) => {
                log::error!("{}", e);
                return Err(e);
            }
        },
        Command::Info | Command::Tags { .. } => Config::load_or_default(&cli.config),
    };
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }

    log::info!(
        "Loaded configuration from {} ({} mode)",
        cli.config.display(),
        config.mode
    );

    match cli.command {
        Command::Run => {
            let deadline_secs = config.watchdog.deadline_secs;
            let deadline = Deadline::start(Duration::from_secs(deadline_secs));
            pipeline::arm_hard_kill(Duration::from_secs(
                deadline_secs + config.watchdog.grace_secs,
            ));

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }

            match pipeline::run_pipeline(&config, &deadline).await {
                Ok(summary) => {
                    log::info!("Published {} new item(s)", summary.post_count);
                    println!("{}", summary.post_count);
                }
                Err(e) => {
                    log::error!("Run failed: {}", e);
                    return Err(e);
                }
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");

            let destinations = config.destinations();
            log::info!("Primary chat: {}", destinations.primary);
            match destinations.secondary {
                Some(chat) => log::info!("Secondary chat: {}", chat),
                None => log::info!("Secondary chat: none"),
            }
            if config.mode == RunMode::Test {
                log::info!("Test mode: nothing will be posted");
            }
        }

        Command::Info => {
            let path = &config.storage.records_file;
            log::info!("Records file: {}", path.display());

            if path.exists() {
                let store = LocalStorage::initialize(path).await?;
                log::info!("Total records: {}", store.len());
                log::info!("Records in dedup window: {}", store.count_since(Utc::now()));
            } else {
                log::info!("No records yet.");
            }
        }

        Command::Tags { id } => {
            let feed = HpoiFeed::new(config.feed.clone())?;
            let tags = feed.fetch_tags(id).await?;

            if tags.is_empty() {
                log::info!("Item {} has no tags", id);
            }
            println!("{}", tags.join(" "));
        }
    }

    Ok(())
}
