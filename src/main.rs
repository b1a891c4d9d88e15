// src/main.rs

//! gleaner CLI
//!
//! One invocation is one batch run; nothing stays resident.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gleaner::{
    config::Config,
    error::Result,
    models::{Checkpoint, Fingerprint},
    pipeline,
    storage::{self, GitHubStore, LocalStore, RemoteStore, paths},
};

/// gleaner - sequential image archive mirror
#[derive(Parser, Debug)]
#[command(
    name = "gleaner",
    version,
    about = "Mirrors a sequential image archive into a categorized store"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl new pages and sync accepted images into the store
    Run {
        /// Use a local directory as the store instead of GitHub
        #[arg(long)]
        store_dir: Option<PathBuf>,
    },

    /// Show the stored checkpoint, counters and registry size
    Status {
        /// Use a local directory as the store instead of GitHub
        #[arg(long)]
        store_dir: Option<PathBuf>,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Open the store the run should target.
fn open_store(config: &Config, store_dir: Option<PathBuf>) -> Result<Box<dyn RemoteStore>> {
    match store_dir {
        Some(dir) => {
            log::info!("Using local store at {}", dir.display());
            Ok(Box::new(LocalStore::new(dir)))
        }
        None => Ok(Box::new(GitHubStore::from_env(
            &config.remote,
            &config.crawler.user_agent,
        )?)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("gleaner starting...");
    let config = Config::load_or_default(&cli.config);

    match cli.command {
        Command::Run { store_dir } => {
            let store = open_store(&config, store_dir)?;
            if let Err(e) = pipeline::run_ingest(&config, store.as_ref()).await {
                log::error!("Run failed: {}", e);
                return Err(e);
            }
        }

        Command::Status { store_dir } => {
            let store = open_store(&config, store_dir)?;
            show_status(&config, store.as_ref()).await?;
        }

        Command::Validate => {
            config.validate()?;
            log::info!("Config OK");
            log::info!("Page template: {}", config.crawler.page_template);
            log::info!(
                "Store: {} (branch {}, root {})",
                if config.remote.repo.is_empty() {
                    "<unset>"
                } else {
                    config.remote.repo.as_str()
                },
                config.remote.branch,
                config.remote.root_dir
            );
        }
    }

    Ok(())
}

/// Print what the store currently knows.
async fn show_status(config: &Config, store: &dyn RemoteStore) -> Result<()> {
    let root_dir = &config.remote.root_dir;

    match storage::read_json::<Checkpoint>(store, paths::CHECKPOINT_KEY).await? {
        Some(checkpoint) => log::info!("Checkpoint: {}", checkpoint.last_id),
        None => log::info!(
            "Checkpoint: none (a run would start at page {})",
            config.crawler.start_id
        ),
    }

    match storage::read_json::<BTreeMap<String, u64>>(store, &paths::counters_key(root_dir))
        .await?
    {
        Some(counts) => {
            let total: u64 = counts.values().sum();
            log::info!("Stored images: {}", total);
            for (code, count) in &counts {
                log::info!("  {}: {}", code, count);
            }
        }
        None => log::info!("No counters stored yet"),
    }

    match storage::read_json::<BTreeMap<Fingerprint, String>>(
        store,
        &paths::registry_key(root_dir),
    )
    .await?
    {
        Some(registry) => log::info!("Registry: {} fingerprints", registry.len()),
        None => log::info!("No registry stored yet"),
    }

    Ok(())
}
