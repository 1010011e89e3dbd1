// ============================================
// File: crates/watchpost-collector/src/main.rs
// ============================================
//! # Watchpost Collector Entry Point
//!
//! ## Creation Reason
//! Binary for the central collector: CLI parsing, logging setup, key
//! management and collector startup.
//!
//! ## Usage
//! ```bash
//! # Step 1: Create the key pair (public half goes to every agent)
//! watchpost-collector keygen \
//!     --private-out /etc/watchpost/collector_private.pem \
//!     --public-out /etc/watchpost/collector_public.pem
//!
//! # Step 2: Start
//! watchpost-collector start --config /etc/watchpost/collector.toml
//!
//! # Other commands
//! watchpost-collector validate     # Check config and key
//! watchpost-collector keygen       # Print a new key pair to stdout
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The private key file is written with mode 0600 on Unix
//! - `RUST_LOG` overrides `logging.level` from the config file
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use watchpost_collector::config::SinkKind;
use watchpost_collector::{Collector, CollectorConfig, CollectorError};
use watchpost_core::crypto::{DEFAULT_KEY_BITS, MIN_KEY_BITS};
use watchpost_core::{KeyCapacity, PrivateKeyMaterial};

// ============================================
// CLI Definition
// ============================================

/// Watchpost telemetry collector
///
/// Quick Start:
///   1. Run: watchpost-collector keygen --private-out collector_private.pem --public-out collector_public.pem
///   2. Copy collector_public.pem to every agent
///   3. Run: watchpost-collector start
#[derive(Parser, Debug)]
#[command(name = "watchpost-collector")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the collector
    Start {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/watchpost/collector.toml")]
        config: PathBuf,
    },

    /// Validate configuration file and private key
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/watchpost/collector.toml")]
        config: PathBuf,
    },

    /// Generate an RSA key pair
    ///
    /// Without output paths both PEMs are printed to stdout.
    Keygen {
        /// Modulus size in bits
        #[arg(long, default_value_t = DEFAULT_KEY_BITS)]
        bits: usize,

        /// Write the private key here (mode 0600)
        #[arg(long)]
        private_out: Option<PathBuf>,

        /// Write the public key here
        #[arg(long)]
        public_out: Option<PathBuf>,
    },
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Start { config } => cmd_start(config).await,
        Commands::Validate { config } => cmd_validate(config).await.map(|()| 0),
        Commands::Keygen {
            bits,
            private_out,
            public_out,
        } => cmd_keygen(bits, private_out, public_out).await.map(|()| 0),
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            init_logging("info");
            error!("{:#}", e);
            if e.downcast_ref::<CollectorError>().is_some_and(CollectorError::is_config_error) {
                error!("Check the file with `watchpost-collector validate --config <PATH>`");
            }
            std::process::exit(1);
        }
    }
}

// ============================================
// Commands
// ============================================

/// Starts the collector and returns its exit code.
async fn cmd_start(config_path: PathBuf) -> anyhow::Result<i32> {
    let config = CollectorConfig::load(&config_path).await?;
    init_logging(&config.logging.level);

    info!("Starting Watchpost collector v{}", env!("CARGO_PKG_VERSION"));

    let key = load_key(&config).await?;
    let collector = Collector::new(config, key)?;
    let outcome = collector.run().await?;

    info!(
        reason = ?outcome.reason,
        received = outcome.stats.received,
        delivered = outcome.stats.delivered,
        rejected = outcome.stats.rejected,
        "Watchpost collector exited"
    );
    Ok(outcome.exit_code())
}

/// Validates configuration file and key.
async fn cmd_validate(config_path: PathBuf) -> anyhow::Result<()> {
    let config = CollectorConfig::load(&config_path).await?;
    let key = load_key(&config).await?;

    println!("✅ Configuration is valid");
    println!();
    println!("Network:");
    println!("   Listen:      {}", config.listen_addr());
    println!();
    println!("Key:");
    println!("   File:        {}", config.server_key.private_key.display());
    println!("   Size:        {} bits", key.modulus_bits());
    println!("   Max Payload: {} bytes", key.max_payload_size(config.layout()));
    println!();
    println!("Clients:");
    println!("   Client ID:   {}", config.packet.client_id);
    match &config.clients.allowed {
        Some(names) => println!("   Allowed:     {}", names.join(", ")),
        None => println!("   Allowed:     any"),
    }
    println!();
    println!("Sink:");
    match config.sink.kind {
        SinkKind::Log => println!("   Kind:        log"),
        SinkKind::JsonLines => {
            println!("   Kind:        json_lines");
            if let Some(path) = &config.sink.path {
                println!("   Path:        {}", path.display());
            }
        }
    }
    println!();

    Ok(())
}

/// Generates a key pair and writes or prints it.
async fn cmd_keygen(
    bits: usize,
    private_out: Option<PathBuf>,
    public_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    if bits < MIN_KEY_BITS {
        anyhow::bail!("key size must be at least {MIN_KEY_BITS} bits");
    }

    eprintln!("Generating {bits}-bit RSA key pair...");
    // Prime search is CPU-bound; keep it off the async workers.
    let private = tokio::task::spawn_blocking(move || PrivateKeyMaterial::generate(bits))
        .await
        .context("key generation task")??;
    let public = private.public_key();

    match &private_out {
        Some(path) => {
            ensure_parent(path).await?;
            private
                .save(path)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!("🔑 Private key written to {}", path.display());
        }
        None => print!("{}", private.to_pem()?.as_str()),
    }

    match &public_out {
        Some(path) => {
            ensure_parent(path).await?;
            tokio::fs::write(path, public.to_pem()?)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!("📤 Public key written to {}", path.display());
        }
        None => print!("{}", public.to_pem()?),
    }

    eprintln!(
        "Max payload with client id: {} bytes",
        public.max_payload_size(watchpost_core::PacketLayout::WithClientId)
    );
    Ok(())
}

// ============================================
// Helper Functions
// ============================================

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .ok();
}

/// Creates the parent directory of `path` if needed.
async fn ensure_parent(path: &std::path::Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    Ok(())
}

/// Loads the collector private key named in `config`.
async fn load_key(config: &CollectorConfig) -> anyhow::Result<PrivateKeyMaterial> {
    let path = &config.server_key.private_key;
    PrivateKeyMaterial::load(path)
        .await
        .with_context(|| format!("loading private key {}", path.display()))
}
