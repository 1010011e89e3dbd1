// ============================================
// File: crates/watchpost-agent/src/main.rs
// ============================================
//! # Watchpost Agent Entry Point
//!
//! ## Creation Reason
//! Binary for monitored hosts: parses the CLI, sets up logging, loads
//! the configuration and the collector's public key, then runs the agent.
//!
//! ## Usage
//! ```bash
//! watchpost-agent start                      # uses /etc/watchpost/agent.toml
//! watchpost-agent start --config agent.toml
//! watchpost-agent validate --config agent.toml
//! ```
//!
//! ## Exit Codes
//! - `0`: stopped by SIGINT / SIGTERM
//! - `1`: startup failure, or every service terminated
//!
//! ## ⚠️ Important Note for Next Developer
//! - `RUST_LOG` overrides `logging.level` from the config file
//! - Use systemd (or another supervisor) for production deployments
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use watchpost_agent::{Agent, AgentConfig, AgentError};
use watchpost_core::{KeyCapacity, PublicKeyMaterial};

// ============================================
// CLI Definition
// ============================================

/// Watchpost telemetry agent
///
/// Runs the configured services periodically and sends their output,
/// encrypted with the collector's public key, over UDP.
#[derive(Parser, Debug)]
#[command(name = "watchpost-agent")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the agent
    Start {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/watchpost/agent.toml")]
        config: PathBuf,
    },

    /// Validate configuration file and collector key
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/watchpost/agent.toml")]
        config: PathBuf,
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
        Commands::Validate { config } => cmd_validate(config).await,
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            init_logging("info");
            error!("{:#}", e);
            if e.downcast_ref::<AgentError>().is_some_and(AgentError::is_config_error) {
                error!("Check the file with `watchpost-agent validate --config <PATH>`");
            }
            std::process::exit(1);
        }
    }
}

// ============================================
// Commands
// ============================================

/// Starts the agent and returns its exit code.
async fn cmd_start(config_path: PathBuf) -> anyhow::Result<i32> {
    let config = AgentConfig::load(&config_path).await?;
    init_logging(&config.logging.level);

    info!("Starting Watchpost agent...");

    let public_key = PublicKeyMaterial::load(&config.collector.public_key)
        .await
        .with_context(|| {
            format!(
                "loading collector public key {}",
                config.collector.public_key.display()
            )
        })?;

    let agent = Agent::new(config, public_key);
    let outcome = agent.run().await?;

    info!(
        reason = ?outcome.reason,
        sent = outcome.stats.sent,
        failed_services = outcome.failed_services,
        "Watchpost agent exited"
    );
    Ok(outcome.exit_code())
}

/// Validates configuration file and key.
async fn cmd_validate(config_path: PathBuf) -> anyhow::Result<i32> {
    let config = AgentConfig::load(&config_path).await?;
    let public_key = PublicKeyMaterial::load(&config.collector.public_key)
        .await
        .with_context(|| {
            format!(
                "loading collector public key {}",
                config.collector.public_key.display()
            )
        })?;
    let layout = config.packet.layout();

    println!("✅ Configuration is valid");
    println!();
    println!("Collector:");
    println!("   Address:     {}", config.collector.address);
    println!("   Key:         {} bits", public_key.modulus_bits());
    println!();
    println!("Packets:");
    println!("   Client:      {}", config.client.name);
    println!("   Client ID:   {}", config.packet.client_id);
    println!("   Max Payload: {} bytes", public_key.max_payload_size(layout));
    println!("   Queue:       {}", config.limits.queue_capacity);
    println!();
    if config.services.is_empty() {
        println!("⚠️  No services configured; 'start' will refuse to run.");
    } else {
        println!("Services:");
        for service in &config.services {
            println!(
                "   {:<16} every {:>4}s  {}{}",
                service.name,
                service.period_secs,
                service.exec,
                if service.ignore_errors {
                    "  (errors ignored)"
                } else {
                    ""
                }
            );
        }
    }
    println!();

    Ok(0)
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
