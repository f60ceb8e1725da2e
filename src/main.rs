//! signal-session - X3DH session establishment tool
//!
//! Generates prekey bundles and runs in-memory handshakes between two parties.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BundleCommand, CommandExecutor, SimulateCommand};

/// signal-session - X3DH session establishment
#[derive(Parser)]
#[command(name = "signal-session")]
#[command(version)]
#[command(about = "X3DH key agreement and double-ratchet session bootstrap")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an identity with prekeys, printing or saving the bundle
    Bundle(BundleCommand),

    /// Run an initiator/responder handshake in memory and compare keys
    Simulate(SimulateCommand),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("signal_session=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Bundle(cmd) => cmd.execute(),
        Commands::Simulate(cmd) => cmd.execute(),
    }
}
