//! Replaying adapter for the `HttpTransport` port.

use std::error::Error;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use super::replay_result;
use crate::cassette::format::RecordedResponse;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{FetchRequest, FetchResponse, HttpTransport, TransportFuture};

/// Serves recorded responses in order, ignoring what is actually requested.
///
/// A recorded failure is returned as a transport error; running out of
/// recorded exchanges is a transport error too.
pub struct ReplayingTransport {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingTransport {
    /// Creates a transport backed by `replayer`.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }

    /// Recorded exchanges not yet served.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.replayer.lock().unwrap_or_else(PoisonError::into_inner).remaining()
    }

    fn next(&self) -> Result<FetchResponse, String> {
        let mut replayer = self.replayer.lock().unwrap_or_else(PoisonError::into_inner);
        replay_result::<RecordedResponse>(&mut replayer, "http", "send")?.map(FetchResponse::from)
    }
}

impl HttpTransport for ReplayingTransport {
    fn send(&self, request: FetchRequest) -> TransportFuture<'_> {
        debug!(method = %request.method, url = %request.url, "replaying http exchange");
        let result: Result<FetchResponse, Box<dyn Error + Send + Sync>> =
            self.next().map_err(Into::into);
        Box::pin(async move { result })
    }
}

impl Drop for ReplayingTransport {
    fn drop(&mut self) {
        let remaining = self.remaining();
        if remaining > 0 {
            debug!(remaining, "replay ended with unserved exchanges");
        }
    }
}
