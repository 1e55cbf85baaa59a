//! `eco health` command.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::config::Config;
use crate::context::SessionContext;
use crate::health::{HealthCheckResult, HealthMonitor, HealthStatus};
use crate::net::{AbortController, AbortReason};

/// Retry settings after applying flag overrides to the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Attempts per run.
    pub tries: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Options {
    /// Flags win over configuration.
    #[must_use]
    pub fn resolve(config: &Config, tries: Option<u32>, delay_ms: Option<u64>) -> Self {
        Self {
            tries: tries.unwrap_or(config.health_tries),
            delay: delay_ms.map_or(config.health_retry_delay, Duration::from_millis),
        }
    }
}

/// Runs one retrying health check and prints the status.
///
/// # Errors
///
/// Returns an error string when the API is down.
pub async fn run(ctx: &SessionContext, options: Options) -> Result<(), String> {
    let result = ctx.health_poller().ping_with_retry(options.tries, options.delay, None).await;
    print_result(&result);
    match result.status {
        HealthStatus::Down => Err("Health check failed: API is down".to_string()),
        _ => Ok(()),
    }
}

/// Polls on an interval, printing every status change, until Ctrl-C.
///
/// # Errors
///
/// Never fails today; interruption ends the watch successfully.
pub async fn watch(
    ctx: &SessionContext,
    options: Options,
    interval: Duration,
) -> Result<(), String> {
    let controller = AbortController::new();
    let monitor = HealthMonitor::spawn(
        Arc::new(ctx.health_poller()),
        interval,
        options.tries,
        options.delay,
        controller.signal(),
    );
    let mut results = monitor.subscribe();

    loop {
        tokio::select! {
            changed = results.changed() => {
                if changed.is_err() {
                    break;
                }
                let result = *results.borrow_and_update();
                print_result(&result);
            }
            interrupted = tokio::signal::ctrl_c() => {
                if let Err(e) = interrupted {
                    warn!(error = %e, "could not listen for Ctrl-C");
                }
                controller.abort(AbortReason::UserCancel);
                break;
            }
        }
    }
    Ok(())
}

fn print_result(result: &HealthCheckResult) {
    if result.aborted {
        println!("status: {} (aborted)", result.status);
    } else {
        println!("status: {}", result.status);
    }
    if let Some(message) = result.status.banner_message() {
        println!("{message}");
    }
}
