//! HTTP transport port: the raw network call underneath `SafeFetch`.

use std::error::Error;
use std::future::Future;
use std::pin::Pin;

use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::net::AbortSignal;

/// Boxed future type alias used by [`HttpTransport`] to keep the trait dyn-compatible.
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<FetchResponse, Box<dyn Error + Send + Sync>>> + Send + 'a>>;

/// A fully described outgoing request.
///
/// Doubles as the "request object" form of fetch input: callers may build one
/// and pass it to `SafeFetch`, which reads its method and URL when the init
/// does not override them.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL, or a path resolved against the transport's base URL.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Optional request body.
    pub body: Option<Vec<u8>>,
    /// Whether the request must outlive the caller that issued it.
    pub keepalive: bool,
    /// Cancels the exchange, including work a transport moved off the
    /// caller's task.
    pub signal: Option<AbortSignal>,
}

impl FetchRequest {
    /// Creates a bodiless request with no headers.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            keepalive: false,
            signal: None,
        }
    }

    /// Creates a `GET` request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }
}

/// A response with its body already buffered.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Creates a response with no headers.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, headers: HeaderMap::new(), body: body.into() }
    }

    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body as JSON without consuming the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Returns the body as UTF-8 text, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends a single request over the network.
///
/// Transports never retry and never apply timeouts; both concerns belong to
/// the layers above.
pub trait HttpTransport: Send + Sync {
    /// Sends the request and buffers the response.
    ///
    /// # Errors
    ///
    /// Returns an error when no response could be obtained (DNS, connect,
    /// reset, unreadable body).
    fn send(&self, request: FetchRequest) -> TransportFuture<'_>;
}
