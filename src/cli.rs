//! Command-line interface for pink_sesame.

use clap::{Parser, Subcommand};

/// Pink Sesame - two-player tic-tac-toe
#[derive(Parser, Debug)]
#[command(name = "pink_sesame")]
#[command(about = "Tic-tac-toe for two, on one terminal or across a shared room", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration file (optional)
    #[arg(long, global = true, default_value = "pink_sesame.toml")]
    pub config: std::path::PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play PP and SMS on this terminal
    Local,

    /// Create a room and play PP in it
    Host {
        /// Room service URL (overrides config and environment)
        #[arg(long)]
        store_url: Option<String>,
    },

    /// Join a room by code and play SMS in it
    Join {
        /// Six-character room code (case-insensitive)
        code: String,

        /// Room service URL (overrides config and environment)
        #[arg(long)]
        store_url: Option<String>,
    },

    /// Run the room service
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}
