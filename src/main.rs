//! Harvester - multi-wallet Solana activity rotator
//!
//! # WARNING
//! - This bot signs and sends real transactions. Only fund wallets with
//!   amounts you can afford to lose.
//! - Public RPC endpoints rate-limit aggressively; use a dedicated
//!   endpoint for pools beyond a handful of wallets.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};

// Use the library crate
use harvester::cli::commands;
use harvester::config::Config;

/// Multi-wallet activity rotator
#[derive(Parser)]
#[command(name = "harvester")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the infinite round scheduler
    Start {
        /// Concurrent worker slots per round (1-10, overrides config)
        #[arg(long)]
        workers: Option<usize>,

        /// Fixed roster of wallet names or addresses (skips adaptive search)
        #[arg(long, value_delimiter = ',')]
        wallets: Vec<String>,
    },

    /// Run every wallet exactly once, then exit
    Sweep {
        /// Maximum wallets in flight at once
        #[arg(long, default_value = "5")]
        concurrency: usize,
    },

    /// List wallets and balances
    Wallets,

    /// List work modules and exclusion state
    Modules,

    /// Show current configuration
    Config,

    /// Check RPC and fee-gate connectivity
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("harvester=info".parse().unwrap()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Perform startup checks
    if let Err(e) = startup_checks(&config) {
        error!("Startup checks failed: {}", e);
        std::process::exit(1);
    }

    // Execute command
    let result = match cli.command {
        Commands::Start { workers, wallets } => commands::start(&config, workers, wallets).await,
        Commands::Sweep { concurrency } => commands::sweep(&config, concurrency).await,
        Commands::Wallets => commands::wallets(&config).await,
        Commands::Modules => commands::modules(&config),
        Commands::Config => commands::show_config(&config),
        Commands::Health => commands::health(&config).await,
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Perform startup safety checks
fn startup_checks(config: &Config) -> Result<()> {
    info!("Performing startup checks...");

    let credentials_dir = std::path::Path::new(&config.wallet.credentials_dir);
    if !credentials_dir.is_dir() {
        return Err(anyhow::anyhow!(
            "Credentials directory not found: {}",
            credentials_dir.display()
        ));
    }

    let has_plain = credentials_dir.join("wallets.json").exists();
    let has_keystore = credentials_dir.join("keystore.json").exists();
    if !has_plain && !has_keystore {
        return Err(anyhow::anyhow!(
            "Neither wallets.json nor keystore.json found in {}",
            credentials_dir.display()
        ));
    }
    if has_keystore {
        info!("Keystore found; passphrase prompt will run before scheduling");
    }

    info!("Startup checks passed");
    Ok(())
}
