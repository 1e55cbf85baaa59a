//! `SafeFetch`: a fetch that never fails loudly.
//!
//! Every call composes two cancellation sources (the caller's signal and an
//! internal timeout) onto one internal [`AbortController`], registers the
//! glue for both on a [`CleanupStack`], and resolves to a [`FetchOutcome`]
//! rather than an error. When the call completes, by any path, the stack has
//! removed every listener and timer it added.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::HeaderMap;
use reqwest::{Method, Url};
use tracing::{debug, error};

use super::abort::{AbortController, AbortReason, AbortSignal};
use super::cleanup::CleanupStack;
use super::error::FetchError;
use crate::ports::{FetchRequest, FetchResponse, HttpTransport, Timer};

/// Timeout applied to every request unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

static HEALTH_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/api/health(?:[/?#]|$)").expect("health url pattern is valid"));

/// What to fetch.
#[derive(Debug, Clone)]
pub enum FetchInput {
    /// A URL string, absolute or relative to the transport's base URL.
    Url(String),
    /// A parsed absolute URL.
    Parsed(Url),
    /// A prepared request; its method, headers, body and keepalive flag are
    /// used unless the [`FetchInit`] overrides them.
    Request(FetchRequest),
}

impl From<&str> for FetchInput {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

impl From<String> for FetchInput {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

impl From<Url> for FetchInput {
    fn from(url: Url) -> Self {
        Self::Parsed(url)
    }
}

impl From<FetchRequest> for FetchInput {
    fn from(request: FetchRequest) -> Self {
        Self::Request(request)
    }
}

/// Per-call options. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct FetchInit {
    /// Explicit method.
    pub method: Option<Method>,
    /// Explicit headers, replacing the request's.
    pub headers: Option<HeaderMap>,
    /// Explicit body.
    pub body: Option<Vec<u8>>,
    /// Explicit keepalive flag; disables the health-endpoint heuristic.
    pub keepalive: Option<bool>,
    /// Caller cancellation.
    pub signal: Option<AbortSignal>,
}

impl FetchInit {
    /// Sets the method.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets keepalive explicitly.
    #[must_use]
    pub fn with_keepalive(mut self, keepalive: bool) -> Self {
        self.keepalive = Some(keepalive);
        self
    }

    /// Attaches a caller signal.
    #[must_use]
    pub fn with_signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }
}

/// Result of [`SafeFetch::fetch`]. Check [`ok`](Self::ok) and
/// [`aborted`](Self::aborted) instead of expecting errors.
#[derive(Debug)]
pub enum FetchOutcome {
    /// A response arrived; its status may still be an error status.
    Response(FetchResponse),
    /// No response.
    Failed {
        /// Whether the internal controller was aborted.
        aborted: bool,
        /// What went wrong.
        error: FetchError,
    },
}

impl FetchOutcome {
    /// `true` only for a response with a 2xx status.
    #[must_use]
    pub fn ok(&self) -> bool {
        matches!(self, Self::Response(response) if response.ok())
    }

    /// `true` if the request was cancelled.
    #[must_use]
    pub fn aborted(&self) -> bool {
        matches!(self, Self::Failed { aborted: true, .. })
    }

    /// The response, if one arrived.
    #[must_use]
    pub fn response(&self) -> Option<&FetchResponse> {
        match self {
            Self::Response(response) => Some(response),
            Self::Failed { .. } => None,
        }
    }

    /// The failure, if no response arrived.
    #[must_use]
    pub fn error(&self) -> Option<&FetchError> {
        match self {
            Self::Response(_) => None,
            Self::Failed { error, .. } => Some(error),
        }
    }
}

/// Returns `true` if `url` points at the health endpoint.
#[must_use]
pub fn is_health_url(url: &str) -> bool {
    HEALTH_URL.is_match(url)
}

/// Wraps an [`HttpTransport`] with timeout, cancellation and classification.
pub struct SafeFetch {
    transport: Arc<dyn HttpTransport>,
    timer: Option<Arc<dyn Timer>>,
    timeout: Duration,
}

impl SafeFetch {
    /// Creates a wrapper using the runtime's own timer for timeouts.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport, timer: None, timeout: DEFAULT_TIMEOUT }
    }

    /// Routes timeouts through a [`Timer`] port instead of the runtime timer.
    #[must_use]
    pub fn with_timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Overrides the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The configured request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Performs one request. Never panics on network trouble and never
    /// returns an error; inspect the outcome instead.
    pub async fn fetch(&self, input: impl Into<FetchInput>, init: FetchInit) -> FetchOutcome {
        let FetchInit { method, headers, body, keepalive, signal: caller } = init;
        let request = resolve_request(input.into(), method, headers, body, keepalive);
        let method = request.method.clone();
        let url = request.url.clone();

        let controller = AbortController::new();
        let signal = controller.signal();
        let mut cleanup = CleanupStack::new();

        if let Some(caller) = caller {
            let forward = controller.clone();
            let registered = caller.add_listener(move |reason| {
                forward.abort(reason.clone());
            });
            if let Some(id) = registered {
                cleanup.defer(move || {
                    caller.remove_listener(id);
                });
            }
        }

        let result = if let Some(reason) = signal.reason() {
            Err(FetchError::Aborted(reason))
        } else if let Some(timer) = &self.timer {
            let forward = controller.clone();
            let id = timer.set_timeout(
                self.timeout,
                Box::new(move || {
                    forward.abort(AbortReason::Timeout);
                }),
            );
            let timer = Arc::clone(timer);
            cleanup.defer(move || timer.clear_timeout(id));
            self.race(request, &controller, None).await
        } else {
            self.race(request, &controller, Some(self.timeout)).await
        };

        cleanup.run();

        match result {
            Ok(response) => FetchOutcome::Response(response),
            Err(error) => {
                let aborted = signal.is_aborted();
                report_failure(&method, &url, aborted, &error);
                FetchOutcome::Failed { aborted, error }
            }
        }
    }

    async fn race(
        &self,
        mut request: FetchRequest,
        controller: &AbortController,
        deadline: Option<Duration>,
    ) -> Result<FetchResponse, FetchError> {
        let signal = controller.signal();
        request.signal = Some(signal.clone());
        let expire = async move {
            match deadline {
                Some(after) => tokio::time::sleep(after).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            result = self.transport.send(request) => {
                result.map_err(|e| FetchError::Network(e.to_string()))
            }
            reason = signal.aborted() => Err(FetchError::Aborted(reason)),
            () = expire => {
                controller.abort(AbortReason::Timeout);
                Err(FetchError::Aborted(signal.reason().unwrap_or(AbortReason::Timeout)))
            }
        }
    }
}

fn resolve_request(
    input: FetchInput,
    method: Option<Method>,
    headers: Option<HeaderMap>,
    body: Option<Vec<u8>>,
    keepalive: Option<bool>,
) -> FetchRequest {
    let mut request = match input {
        FetchInput::Url(url) => FetchRequest::get(url),
        FetchInput::Parsed(url) => FetchRequest::get(url.as_str()),
        FetchInput::Request(request) => request,
    };
    if let Some(method) = method {
        request.method = method;
    }
    if let Some(headers) = headers {
        request.headers = headers;
    }
    if body.is_some() {
        request.body = body;
    }
    request.keepalive = keepalive.unwrap_or_else(|| {
        request.keepalive || (request.method == Method::GET && is_health_url(&request.url))
    });
    request
}

fn report_failure(method: &Method, url: &str, aborted: bool, error: &FetchError) {
    let reason = error.reason();
    if error.is_expected_abort() {
        debug!(method = %method, url, aborted, reason = %reason, "fetch aborted");
    } else {
        error!(method = %method, url, aborted, reason = %reason, "fetch failed");
    }
}
