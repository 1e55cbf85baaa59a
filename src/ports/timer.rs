//! Timer port for cancellable one-shot callbacks.

use std::time::Duration;

/// Opaque handle returned by [`Timer::set_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Callback fired when a timer elapses.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Schedules one-shot callbacks, the manual-timer path of fetch timeouts.
///
/// `pending` makes leaked timers observable: after every completed fetch it
/// must be back to where it started.
pub trait Timer: Send + Sync {
    /// Runs `callback` once after `delay` unless cleared first.
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> TimerId;

    /// Cancels a scheduled timer. Clearing an elapsed or unknown id is a no-op.
    fn clear_timeout(&self, id: TimerId);

    /// Number of timers scheduled but neither fired nor cleared.
    fn pending(&self) -> usize;
}
