//! Health probes against the fixed health endpoint.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::net::{AbortSignal, FetchInit, FetchOutcome, SafeFetch};

/// Path of the health endpoint.
pub const HEALTH_ENDPOINT: &str = "/api/health";
/// Attempts made by [`HealthPoller::ping_with_retry`] unless told otherwise.
pub const DEFAULT_TRIES: u32 = 2;
/// Pause between attempts unless told otherwise.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(800);

/// What the banner should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Nothing checked yet.
    Idle,
    /// The server confirmed it is healthy.
    Ok,
    /// Reachable but unconfirmed, or the probe was cancelled.
    Degraded,
    /// Unreachable or answering with an error status.
    Down,
}

impl HealthStatus {
    /// Banner copy for this status; `None` hides the banner.
    #[must_use]
    pub fn banner_message(self) -> Option<&'static str> {
        match self {
            Self::Idle | Self::Ok => None,
            Self::Degraded => Some("Some features are slow right now. We're on it."),
            Self::Down => Some("We can't reach our servers. Check your connection and try again."),
        }
    }

    /// Lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ok => "ok",
            Self::Degraded => "degraded",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one probe or one retry run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthCheckResult {
    /// Aggregated status.
    pub status: HealthStatus,
    /// Whether the probe was cancelled rather than answered.
    pub aborted: bool,
    /// Whether the last response had a 2xx status.
    pub response_ok: bool,
}

impl HealthCheckResult {
    /// The result before any probe ran.
    pub const IDLE: Self = Self { status: HealthStatus::Idle, aborted: false, response_ok: false };

    const ABORTED: Self =
        Self { status: HealthStatus::Degraded, aborted: true, response_ok: false };

    fn settled(status: HealthStatus, response_ok: bool) -> Self {
        Self { status, aborted: false, response_ok }
    }
}

/// Probes the health endpoint through [`SafeFetch`].
pub struct HealthPoller {
    fetcher: Arc<SafeFetch>,
    endpoint: String,
}

impl HealthPoller {
    /// Creates a poller for [`HEALTH_ENDPOINT`].
    #[must_use]
    pub fn new(fetcher: Arc<SafeFetch>) -> Self {
        Self { fetcher, endpoint: HEALTH_ENDPOINT.to_string() }
    }

    /// Points the poller at another health URL.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Issues a single `GET` and classifies the answer.
    pub async fn ping_health(&self, signal: Option<&AbortSignal>) -> HealthCheckResult {
        let init = FetchInit { signal: signal.cloned(), ..FetchInit::default() };
        match self.fetcher.fetch(self.endpoint.as_str(), init).await {
            FetchOutcome::Failed { aborted: true, .. } => HealthCheckResult::ABORTED,
            FetchOutcome::Failed { aborted: false, .. } => {
                HealthCheckResult::settled(HealthStatus::Down, false)
            }
            FetchOutcome::Response(response) if !response.ok() => {
                HealthCheckResult::settled(HealthStatus::Down, false)
            }
            FetchOutcome::Response(response) => {
                let confirmed = response
                    .json::<Value>()
                    .ok()
                    .and_then(|body| body.get("ok").map(is_truthy))
                    .unwrap_or(false);
                let status = if confirmed { HealthStatus::Ok } else { HealthStatus::Degraded };
                HealthCheckResult::settled(status, true)
            }
        }
    }

    /// Probes up to `tries` times, `delay` apart, stopping at the first `ok`.
    ///
    /// A `down` result is sticky: later `degraded` results never replace it.
    /// A cancelled `signal` ends the run immediately with an aborted
    /// `degraded` result. Fewer than one try is treated as one.
    pub async fn ping_with_retry(
        &self,
        tries: u32,
        delay: Duration,
        signal: Option<&AbortSignal>,
    ) -> HealthCheckResult {
        let tries = tries.max(1);
        let mut status = HealthStatus::Idle;
        let mut response_ok = false;

        for attempt in 1..=tries {
            if is_aborted(signal) {
                return HealthCheckResult::ABORTED;
            }

            let result = self.ping_health(signal).await;
            debug!(attempt, tries, status = %result.status, "health probe finished");
            match result.status {
                HealthStatus::Ok => return result,
                HealthStatus::Down => status = HealthStatus::Down,
                HealthStatus::Degraded if status != HealthStatus::Down => {
                    status = HealthStatus::Degraded;
                }
                HealthStatus::Degraded | HealthStatus::Idle => {}
            }
            response_ok = result.response_ok;

            if attempt < tries && (is_aborted(signal) || !pause(delay, signal).await) {
                return HealthCheckResult::ABORTED;
            }
        }

        HealthCheckResult::settled(status, response_ok)
    }
}

fn is_aborted(signal: Option<&AbortSignal>) -> bool {
    signal.is_some_and(AbortSignal::is_aborted)
}

/// Sleeps for `delay`; returns `false` if the signal fired first.
async fn pause(delay: Duration, signal: Option<&AbortSignal>) -> bool {
    match signal {
        Some(signal) => tokio::select! {
            () = tokio::time::sleep(delay) => !signal.is_aborted(),
            _ = signal.aborted() => false,
        },
        None => {
            tokio::time::sleep(delay).await;
            true
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
