//! Command dispatch and handlers.

pub mod health;
pub mod ids;
pub mod remember;
pub mod request;

use tracing::debug;

use crate::cli::Command;
use crate::config::Config;
use crate::context::SessionContext;

/// Dispatch a parsed command to its handler.
///
/// `ECO_RECORD=<path>` records every HTTP exchange to a cassette written when
/// the command finishes; `ECO_REPLAY=<path>` serves exchanges from one.
///
/// # Errors
///
/// Returns an error string if configuration is invalid or the selected
/// command handler fails.
pub async fn dispatch(command: &Command) -> Result<(), String> {
    let config = Config::from_env().map_err(|e| e.to_string())?;
    let ctx = SessionContext::from_config(&config)?;

    let result = dispatch_with_context(command, &ctx, &config).await;
    debug!(pending_timers = ctx.pending_timers(), "command finished");
    // Dropping the context writes any cassette, even on error.
    drop(ctx);
    result
}

/// Dispatch a command with the given session context.
///
/// # Errors
///
/// Returns an error string if the command handler fails.
pub async fn dispatch_with_context(
    command: &Command,
    ctx: &SessionContext,
    config: &Config,
) -> Result<(), String> {
    match command {
        Command::Ids => ids::run(ctx),
        Command::Remember { guest, session } => {
            remember::run(ctx, guest.as_deref(), session.as_deref())
        }
        Command::Health { tries, delay_ms, watch } => {
            let options = health::Options::resolve(config, *tries, *delay_ms);
            if *watch {
                health::watch(ctx, options, config.health_interval).await
            } else {
                health::run(ctx, options).await
            }
        }
        Command::Request { path, method, data } => {
            request::run(ctx, path, method, data.as_deref()).await
        }
    }
}
