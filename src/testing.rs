//! Scripted port implementations shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::ports::{
    FetchRequest, FetchResponse, HttpTransport, KeyValueStore, StorageError, TransportFuture,
};

/// One scripted transport reply.
pub(crate) enum Reply {
    Respond(FetchResponse),
    Fail(&'static str),
    Hang,
}

impl Reply {
    pub(crate) fn json(status: u16, body: &str) -> Self {
        Self::Respond(FetchResponse::new(status, body.as_bytes().to_vec()))
    }
}

/// Transport that serves replies in order and remembers what it was sent.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<FetchRequest>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub(crate) fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self { replies: Mutex::new(replies.into_iter().collect()), ..Self::default() }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpTransport for ScriptedTransport {
    fn send(&self, request: FetchRequest) -> TransportFuture<'_> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        let reply = self.replies.lock().unwrap().pop_front();
        Box::pin(async move {
            let result: Result<FetchResponse, Box<dyn Error + Send + Sync>> = match reply {
                Some(Reply::Respond(response)) => Ok(response),
                Some(Reply::Fail(message)) => Err(message.into()),
                Some(Reply::Hang) => std::future::pending().await,
                None => Err("no scripted reply left".into()),
            };
            result
        })
    }
}

/// Key/value store whose availability can be toggled mid-test.
#[derive(Default)]
pub(crate) struct FlakyStore {
    values: Mutex<HashMap<String, String>>,
    broken: Mutex<bool>,
}

impl FlakyStore {
    pub(crate) fn broken() -> Self {
        let store = Self::default();
        store.set_broken(true);
        store
    }

    pub(crate) fn set_broken(&self, broken: bool) {
        *self.broken.lock().unwrap() = broken;
    }

    pub(crate) fn seed(&self, key: &str, value: &str) {
        self.values.lock().unwrap().insert(key.to_string(), value.to_string());
    }

    pub(crate) fn peek(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn check(&self) -> Result<(), StorageError> {
        if *self.broken.lock().unwrap() {
            Err(StorageError::Unavailable("disabled for test".into()))
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check()?;
        Ok(self.peek(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check()?;
        self.seed(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check()?;
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}
