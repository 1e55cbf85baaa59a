//! Live adapter for the `HttpTransport` port using reqwest.

use std::error::Error;

use reqwest::{Client, Url};

use crate::ports::http::{FetchRequest, FetchResponse, HttpTransport, TransportFuture};

/// Live transport that sends requests with a shared reqwest client.
///
/// Relative request URLs are resolved against the configured base URL.
/// Keepalive requests run on a detached task, so they complete even if the
/// caller's future is dropped mid-flight. The task still watches the
/// request's abort signal and drops the connection once it fires.
pub struct LiveHttpTransport {
    client: Client,
    base_url: Url,
}

impl LiveHttpTransport {
    /// Creates a transport resolving relative URLs against `base_url`.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self { client: Client::new(), base_url }
    }

    fn resolve(&self, url: &str) -> Result<Url, Box<dyn Error + Send + Sync>> {
        // Joining an absolute URL yields it unchanged.
        self.base_url.join(url).map_err(|e| format!("Invalid request URL {url}: {e}").into())
    }
}

async fn send_buffered(
    client: Client,
    url: Url,
    request: FetchRequest,
) -> Result<FetchResponse, Box<dyn Error + Send + Sync>> {
    let mut builder = client.request(request.method, url).headers(request.headers);
    if let Some(body) = request.body {
        builder = builder.body(body);
    }

    let response = builder.send().await.map_err(|e| -> Box<dyn Error + Send + Sync> {
        format!("HTTP request failed: {e}").into()
    })?;

    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let body = response.bytes().await.map_err(|e| -> Box<dyn Error + Send + Sync> {
        format!("Failed to read response body: {e}").into()
    })?;

    Ok(FetchResponse { status, headers, body: body.to_vec() })
}

/// Sends `request` unless its signal fires first.
async fn send_until_aborted(
    client: Client,
    url: Url,
    mut request: FetchRequest,
) -> Result<FetchResponse, Box<dyn Error + Send + Sync>> {
    let Some(signal) = request.signal.take() else {
        return send_buffered(client, url, request).await;
    };
    tokio::select! {
        result = send_buffered(client, url, request) => result,
        reason = signal.aborted() => Err(format!("Request aborted: {reason}").into()),
    }
}

impl HttpTransport for LiveHttpTransport {
    fn send(&self, request: FetchRequest) -> TransportFuture<'_> {
        let resolved = self.resolve(&request.url);
        let client = self.client.clone();

        Box::pin(async move {
            let url = resolved?;
            if request.keepalive {
                tokio::spawn(send_until_aborted(client, url, request))
                    .await
                    .map_err(|e| -> Box<dyn Error + Send + Sync> {
                        format!("Keepalive request task failed: {e}").into()
                    })?
            } else {
                send_until_aborted(client, url, request).await
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    use super::*;
    use crate::net::{FetchInit, SafeFetch};

    fn transport() -> LiveHttpTransport {
        LiveHttpTransport::new(Url::parse("https://eco.example/app/").unwrap())
    }

    #[test]
    fn relative_urls_join_the_base() {
        let url = transport().resolve("/api/health").unwrap();
        assert_eq!(url.as_str(), "https://eco.example/api/health");
    }

    #[test]
    fn absolute_urls_pass_through() {
        let url = transport().resolve("http://other.example/x").unwrap();
        assert_eq!(url.as_str(), "http://other.example/x");
    }

    /// Serves one connection that never answers and reports when the client
    /// hangs up.
    async fn silent_server() -> (Url, oneshot::Receiver<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
        let (hung_up, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0_u8; 1024];
            while let Ok(n) = socket.read(&mut buf).await {
                if n == 0 {
                    break;
                }
            }
            let _ = hung_up.send(());
        });
        (base, rx)
    }

    async fn assert_timeout_closes_socket(path: &str) {
        let (base, hung_up) = silent_server().await;
        let transport: Arc<dyn HttpTransport> = Arc::new(LiveHttpTransport::new(base));
        let fetch = SafeFetch::new(transport).with_timeout(Duration::from_millis(200));

        let outcome = fetch.fetch(path, FetchInit::default()).await;
        assert!(outcome.aborted(), "{path} should time out");

        let closed = tokio::time::timeout(Duration::from_secs(2), hung_up).await;
        assert!(matches!(closed, Ok(Ok(()))), "{path} left its connection open");
    }

    #[tokio::test]
    async fn timed_out_keepalive_request_closes_its_connection() {
        assert_timeout_closes_socket("/api/health").await;
    }

    #[tokio::test]
    async fn timed_out_plain_request_closes_its_connection() {
        assert_timeout_closes_socket("/api/feedback").await;
    }
}
