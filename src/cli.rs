//! CLI argument definitions.

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `eco`.
#[derive(Debug, Parser)]
#[command(name = "eco", version, about = "Identity and connectivity client for the Eco API")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the current guest and session identifiers, creating them if needed.
    Ids,
    /// Adopt identifiers issued elsewhere; invalid values are ignored.
    Remember {
        /// Guest identifier to adopt.
        #[arg(long)]
        guest: Option<String>,
        /// Session identifier to adopt.
        #[arg(long)]
        session: Option<String>,
    },
    /// Probe the health endpoint and print the resulting status.
    Health {
        /// Attempts before giving up (defaults to ECO_HEALTH_TRIES).
        #[arg(long)]
        tries: Option<u32>,
        /// Pause between attempts in milliseconds (defaults to ECO_HEALTH_DELAY_MS).
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Keep polling every ECO_HEALTH_INTERVAL_MS until interrupted.
        #[arg(long)]
        watch: bool,
    },
    /// Send an API request carrying the identity headers.
    Request {
        /// Path relative to ECO_API_BASE_URL, or an absolute URL.
        path: String,
        /// HTTP method.
        #[arg(long, short = 'X', default_value = "GET")]
        method: String,
        /// Request body.
        #[arg(long, short = 'd')]
        data: Option<String>,
    },
}
