//! Long transaction CLI
//!
//! Command-line tools for exercising the long transaction service.
//!
//! # Commands
//!
//! - `replay` - Run a JSON script of transaction steps against an
//!   in-process service
//! - `decode` - Decode a protobuf request, response or result body
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Long transaction command-line tools.
#[derive(Parser)]
#[command(name = "longtx")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script of transaction steps
    Replay {
        /// Path to the JSON script
        script: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Idle timeout of transactions in milliseconds
        #[arg(long)]
        idle_timeout_ms: Option<u64>,
    },

    /// Decode a protobuf body
    Decode {
        /// Method name (BeginTransaction, CommitTransaction,
        /// RollbackTransaction, Write, Read)
        method: String,

        /// Message kind (request, response, result)
        kind: String,

        /// File holding the encoded body
        file: PathBuf,
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
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Replay {
            script,
            format,
            idle_timeout_ms,
        } => {
            commands::replay::run(&script, &format, idle_timeout_ms)?;
        }
        Commands::Decode { method, kind, file } => {
            commands::decode::run(&method, &kind, &file)?;
        }
        Commands::Version => {
            println!("longtx CLI v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "API packages: {}, {}",
                longtx_protocol::LONG_TX_PACKAGE,
                longtx_protocol::OPERATIONS_PACKAGE
            );
        }
    }

    Ok(())
}
