//! mosync CLI
//!
//! Reconciles one managed object, declared in a JSON manifest, against a
//! REST management API.
//!
//! # Commands
//!
//! - `apply` - Create the object, update it, or replace it if its identity changed
//! - `read` - Refresh the recorded state and report drift
//! - `delete` - Remove the object

mod client;
mod commands;

use clap::{Parser, Subcommand};
use client::ApiClient;
use commands::Format;
use mosync_engine::{HttpTransport, ReconcileConfig, Reconciler, RetryPolicy};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Reconcile a managed object against a REST management API.
#[derive(Parser)]
#[command(name = "mosync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the management API
    #[arg(global = true, short, long, env = "MOSYNC_URL")]
    url: Option<String>,

    /// User name for session login
    #[arg(global = true, long, env = "MOSYNC_USERNAME", default_value = "admin")]
    username: String,

    /// Password for session login
    #[arg(global = true, long, env = "MOSYNC_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// State file recording the reconciled object
    #[arg(global = true, short, long, default_value = "mosync.state.json")]
    state: PathBuf,

    /// Retries after a failed attempt
    #[arg(global = true, long, default_value = "3")]
    retries: u32,

    /// Retry immediately instead of waiting between attempts
    #[arg(global = true, long)]
    no_backoff: bool,

    /// Request timeout in seconds
    #[arg(global = true, long, default_value = "30")]
    timeout: u64,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, update or replace the object declared in a manifest
    Apply {
        /// Object manifest (JSON)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Read the recorded object back and report drift
    Read {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Delete the recorded object, or the one declared in a manifest
    Delete {
        /// Object manifest (JSON), used when there is no state file
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Version = cli.command {
        println!("mosync CLI v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let url = cli.url.ok_or("--url (or MOSYNC_URL) is required")?;
    let password = cli
        .password
        .ok_or("--password (or MOSYNC_PASSWORD) is required")?;

    let mut policy = RetryPolicy::new(cli.retries);
    if cli.no_backoff {
        policy = policy.without_backoff();
    }
    let config = ReconcileConfig::with_retry(policy);

    let client = ApiClient::new(&url, cli.username, password, Duration::from_secs(cli.timeout));
    let reconciler = Reconciler::new(config, HttpTransport::new(url, client));

    match cli.command {
        Commands::Apply { manifest, format } => {
            commands::apply::run(&reconciler, &manifest, &cli.state, Format::parse(&format)?)?;
        }
        Commands::Read { format } => {
            commands::read::run(&reconciler, &cli.state, Format::parse(&format)?)?;
        }
        Commands::Delete { manifest } => {
            commands::delete::run(&reconciler, manifest.as_deref(), &cli.state)?;
        }
        Commands::Version => {}
    }

    Ok(())
}
