//! Core library entry for the `eco` client.
//!
//! Anonymous guest/session identity, a cancellable fetch wrapper with
//! timeouts, and health polling for the connectivity banner.

pub mod adapters;
pub mod api;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod health;
pub mod identity;
pub mod net;
pub mod ports;

#[cfg(test)]
mod testing;

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub async fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    commands::dispatch(&cli.command).await
}
