//! Recording adapter for the `HttpTransport` port.

use std::sync::Arc;

use super::{record_result, SharedRecorder};
use crate::cassette::format::{RecordedRequest, RecordedResponse};
use crate::ports::{FetchRequest, HttpTransport, TransportFuture};

/// Records every exchange while delegating to an inner transport.
pub struct RecordingTransport {
    inner: Arc<dyn HttpTransport>,
    recorder: SharedRecorder,
}

impl RecordingTransport {
    /// Wraps `inner`, appending each exchange to `recorder`.
    pub fn new(inner: Arc<dyn HttpTransport>, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }
}

impl HttpTransport for RecordingTransport {
    fn send(&self, request: FetchRequest) -> TransportFuture<'_> {
        Box::pin(async move {
            let input = RecordedRequest::from(&request);
            let result = self.inner.send(request).await;
            let recorded = result.as_ref().map(RecordedResponse::from);
            record_result(&self.recorder, "http", "send", &input, &recorded);
            result
        })
    }
}
