//! Replaying adapters that serve recorded interactions.

pub mod http;

use serde::de::DeserializeOwned;

use crate::cassette::replayer::CassetteReplayer;

pub use http::ReplayingTransport;

/// Decodes a recorded `Result<T, String>` using the Ok/Err JSON convention.
///
/// Mirror of `recording::record_result`. The outer `Err` means the cassette
/// itself could not serve the call; the inner one is a recorded failure.
pub(crate) fn replay_result<T: DeserializeOwned>(
    replayer: &mut CassetteReplayer,
    port: &str,
    method: &str,
) -> Result<Result<T, String>, String> {
    let output = &replayer.next_interaction(port, method)?.output;

    if let Some(ok) = output.get("Ok") {
        return serde_json::from_value(ok.clone())
            .map(Ok)
            .map_err(|e| format!("{port}::{method}: malformed Ok value: {e}"));
    }
    match output.get("Err") {
        Some(err) => Ok(Err(err.as_str().unwrap_or("unknown").to_string())),
        None => Err(format!("{port}::{method}: expected Ok or Err output, got {output}")),
    }
}
