//! Command-line interface definition for the SportMate session bridge
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for running the HTTP service and checking the
//! resolved configuration.

use clap::{Parser, Subcommand};

/// SportMate session bridge
///
/// Turns one user chat message into one durable exchange, using model
/// reasoning and optionally a web search tool.
#[derive(Parser, Debug, Clone)]
#[command(name = "sportmate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the bridge HTTP service
    Serve {
        /// Override the bind address from config
        #[arg(long)]
        host: Option<String>,

        /// Override the bind port from config
        #[arg(long)]
        port: Option<u16>,

        /// Override the provider from config (gemini)
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Validate the configuration and print the resolved provider
    Check,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
