//! `eco request` command.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Method;

use crate::context::SessionContext;
use crate::net::{FetchError, FetchInit};

/// Sends one API request with identity headers and prints the response.
///
/// # Errors
///
/// Returns an error string for an invalid method, a failed request, or a
/// non-2xx response.
pub async fn run(
    ctx: &SessionContext,
    path: &str,
    method: &str,
    data: Option<&str>,
) -> Result<(), String> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| format!("Invalid HTTP method: {method}"))?;

    let mut init = FetchInit::default().with_method(method);
    if let Some(body) = data {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        init = init.with_headers(headers).with_body(body.as_bytes().to_vec());
    }

    let outcome = ctx.api_client().request(path, init).await;
    let Some(response) = outcome.response() else {
        let reason = outcome.error().map_or_else(|| "unknown".to_string(), FetchError::reason);
        let verb = if outcome.aborted() { "aborted" } else { "failed" };
        return Err(format!("Request {verb}: {reason}"));
    };

    println!("{}", response.status);
    let body = response.text();
    if !body.is_empty() {
        println!("{body}");
    }
    if response.ok() {
        Ok(())
    } else {
        Err(format!("Request failed with status {}", response.status))
    }
}
