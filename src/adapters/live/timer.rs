//! Live timer backed by tokio tasks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::ports::timer::{Timer, TimerCallback, TimerId};

#[derive(Default)]
struct TimerTable {
    handles: Mutex<HashMap<TimerId, JoinHandle<()>>>,
    next_id: AtomicU64,
}

impl TimerTable {
    fn handles(&self) -> MutexGuard<'_, HashMap<TimerId, JoinHandle<()>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Live timer: each timeout is a spawned task sleeping on the tokio clock.
///
/// Must be used from within a tokio runtime.
#[derive(Clone, Default)]
pub struct TokioTimer {
    table: Arc<TimerTable>,
}

impl TokioTimer {
    /// Creates a timer with nothing scheduled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Timer for TokioTimer {
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerId {
        let id = TimerId(self.table.next_id.fetch_add(1, Ordering::Relaxed));
        let table = Arc::clone(&self.table);
        // Hold the table lock across spawn so the task cannot look itself up
        // before it has been inserted.
        let mut handles = self.table.handles();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let still_scheduled = table.handles().remove(&id).is_some();
            if still_scheduled {
                callback();
            }
        });
        handles.insert(id, handle);
        id
    }

    fn clear_timeout(&self, id: TimerId) {
        if let Some(handle) = self.table.handles().remove(&id) {
            handle.abort();
        }
    }

    fn pending(&self) -> usize {
        self.table.handles().len()
    }
}
