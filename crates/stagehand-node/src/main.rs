use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use stagehand_engine::roller::StdRoller;
use stagehand_engine::CycleDriver;

mod cli;
mod config;
mod logging;
mod seed;

use config::NodeConfig;

#[derive(Parser)]
#[command(name = "stagehand")]
#[command(about = "Marketplace activity simulator", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Output path for the configuration
        #[arg(short, long, default_value = "./stagehand.toml")]
        output: PathBuf,
    },

    /// Create the synthetic buyer and agent roster
    Seed,

    /// Force-create one contest, skipping the population gates
    Create,

    /// Run a single simulation cycle
    Tick,

    /// Show synthetic row counts and recent contests
    Status,

    /// Delete all synthetic rows
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Run the simulation continuously
    Run {
        /// Run one cycle and exit instead of looping
        #[arg(long)]
        once: bool,
    },
}

const DEFAULT_CONFIG_PATH: &str = "./stagehand.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Precedence: CLI > env > config file > defaults.
    let mut config = if let Some(ref path) = cli.config {
        NodeConfig::from_file(path)?
    } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
        NodeConfig::from_file(Path::new(DEFAULT_CONFIG_PATH))?
    } else {
        NodeConfig::default()
    };
    config.apply_env_overrides();

    logging::init_logging(&config.logging, cli.verbose)?;

    if let Commands::Init { output } = &cli.command {
        let mut template = NodeConfig::default();
        // Never persist the service key into the file.
        template.store.service_key = String::new();
        template.save_to_file(output)?;
        println!("Wrote default configuration to {}", output.display());
        return Ok(());
    }

    config.validate()?;
    let store = config.build_store()?;
    let engine = Arc::new(config.engine.clone());

    match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),
        Commands::Seed => cli::run_seed(store, &engine).await?,
        Commands::Create => cli::run_create(store, &engine).await?,
        Commands::Tick => cli::run_tick(store, engine).await?,
        Commands::Status => cli::run_status(store).await?,
        Commands::Clear { yes } => cli::run_clear(store, yes).await?,
        Commands::Run { once } => {
            let driver = CycleDriver::new(engine, store);
            if once {
                driver.run_cycle(&mut StdRoller::new()).await?;
            } else {
                info!(backend = %config.store.backend, "Simulator starting");
                driver.run_forever(StdRoller::new()).await?;
            }
        }
    }

    Ok(())
}
