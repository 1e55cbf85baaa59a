//! Abort controller and signal: one-shot cancellation with a reason.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::watch;

const UNKNOWN_REASON: &str = "unknown";

/// Why an operation was cancelled.
#[derive(Debug, Clone, PartialEq)]
pub enum AbortReason {
    /// Plain abort with no specific cause.
    AbortError,
    /// The internal request timeout fired.
    Timeout,
    /// The tab moved to the background.
    TabHide,
    /// The page is being unloaded.
    PageHide,
    /// The document became hidden.
    Hidden,
    /// The owning flow finished and tore down outstanding work.
    Finalize,
    /// A supervising watchdog gave up on the operation.
    WatchdogTimeout,
    /// The user cancelled explicitly.
    UserCancel,
    /// Anything else, kept as the caller supplied it.
    Custom(Value),
}

impl AbortReason {
    /// Maps a reason tag (`"timeout"`, `"tab-hide"`, ...) to its variant.
    ///
    /// Unknown tags become [`AbortReason::Custom`].
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "AbortError" => Self::AbortError,
            "timeout" => Self::Timeout,
            "tab-hide" => Self::TabHide,
            "page-hide" | "pagehide" => Self::PageHide,
            "hidden" => Self::Hidden,
            "finalize" => Self::Finalize,
            "watchdog-timeout" => Self::WatchdogTimeout,
            "user-cancel" => Self::UserCancel,
            other => Self::Custom(Value::String(other.to_string())),
        }
    }

    /// Returns `true` for intentional cancellations that are not worth an
    /// error log.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::Custom(value) => {
                value.get("name").and_then(Value::as_str) == Some("AbortError")
                    || !matches!(Self::from_tag(&describe_value(value)), Self::Custom(_))
            }
            _ => true,
        }
    }

    /// Best-effort human-readable description.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::AbortError => "AbortError".to_string(),
            Self::Timeout => "timeout".to_string(),
            Self::TabHide => "tab-hide".to_string(),
            Self::PageHide => "page-hide".to_string(),
            Self::Hidden => "hidden".to_string(),
            Self::Finalize => "finalize".to_string(),
            Self::WatchdogTimeout => "watchdog-timeout".to_string(),
            Self::UserCancel => "user-cancel".to_string(),
            Self::Custom(value) => describe_value(value),
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Stringifies an arbitrary abort payload.
///
/// Handles plain strings, error-shaped objects (`name` + `message`), nested
/// `{ "reason": ... }` wrappers and any other JSON value, falling back to
/// `"unknown"` when nothing useful is present.
#[must_use]
pub fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => UNKNOWN_REASON.to_string(),
        Value::String(s) if s.trim().is_empty() => UNKNOWN_REASON.to_string(),
        Value::String(s) => s.clone(),
        Value::Object(map) => {
            if let Some(inner) = map.get("reason") {
                let described = describe_value(inner);
                if described != UNKNOWN_REASON {
                    return described;
                }
            }
            if let Some(message) = map.get("message").and_then(Value::as_str) {
                return match map.get("name").and_then(Value::as_str) {
                    Some(name) if !name.is_empty() => format!("{name}: {message}"),
                    _ => message.to_string(),
                };
            }
            serde_json::to_string(value).unwrap_or_else(|_| UNKNOWN_REASON.to_string())
        }
        other => other.to_string(),
    }
}

/// Identifies a listener registered with [`AbortSignal::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnOnce(&AbortReason) + Send + 'static>;

#[derive(Default)]
struct SignalState {
    reason: Option<AbortReason>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

struct Shared {
    state: Mutex<SignalState>,
    aborted: watch::Sender<bool>,
}

/// Observes cancellation of an [`AbortController`].
///
/// Cheap to clone; all clones observe the same controller.
#[derive(Clone)]
pub struct AbortSignal {
    shared: Arc<Shared>,
}

impl AbortSignal {
    fn new() -> Self {
        let (aborted, _) = watch::channel(false);
        Self { shared: Arc::new(Shared { state: Mutex::new(SignalState::default()), aborted }) }
    }

    /// Creates a signal that is aborted from the start.
    #[must_use]
    pub fn already_aborted(reason: AbortReason) -> Self {
        let controller = AbortController::new();
        controller.abort(reason);
        controller.signal()
    }

    fn state(&self) -> MutexGuard<'_, SignalState> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` once the controller has been aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.state().reason.is_some()
    }

    /// The abort reason, if aborted.
    #[must_use]
    pub fn reason(&self) -> Option<AbortReason> {
        self.state().reason.clone()
    }

    /// Registers a one-shot listener called with the reason on abort.
    ///
    /// If the signal is already aborted the listener runs right away and
    /// `None` is returned, since there is nothing left to remove.
    pub fn add_listener(
        &self,
        listener: impl FnOnce(&AbortReason) + Send + 'static,
    ) -> Option<ListenerId> {
        let reason = {
            let mut state = self.state();
            match &state.reason {
                Some(reason) => reason.clone(),
                None => {
                    let id = ListenerId(state.next_listener);
                    state.next_listener += 1;
                    state.listeners.push((id, Box::new(listener)));
                    return Some(id);
                }
            }
        };
        listener(&reason);
        None
    }

    /// Removes a listener. Returns `false` if it already fired or was removed.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut state = self.state();
        let before = state.listeners.len();
        state.listeners.retain(|(listener_id, _)| *listener_id != id);
        state.listeners.len() != before
    }

    /// Number of listeners still registered.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.state().listeners.len()
    }

    /// Resolves with the reason once aborted; immediately if already aborted.
    pub async fn aborted(&self) -> AbortReason {
        let mut rx = self.shared.aborted.subscribe();
        // The sender lives as long as `self`, so waiting cannot fail.
        let _ = rx.wait_for(|aborted| *aborted).await;
        self.reason().unwrap_or(AbortReason::AbortError)
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("AbortSignal")
            .field("reason", &state.reason)
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

/// Owns the right to abort a signal.
#[derive(Clone, Debug)]
pub struct AbortController {
    signal: AbortSignal,
}

impl AbortController {
    /// Creates a controller with a fresh, unaborted signal.
    #[must_use]
    pub fn new() -> Self {
        Self { signal: AbortSignal::new() }
    }

    /// The signal observed by cancellable operations.
    #[must_use]
    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    /// Aborts with `reason`. Only the first call has any effect; returns
    /// whether this call was it.
    pub fn abort(&self, reason: AbortReason) -> bool {
        let listeners = {
            let mut state = self.signal.state();
            if state.reason.is_some() {
                return false;
            }
            state.reason = Some(reason.clone());
            std::mem::take(&mut state.listeners)
        };
        self.signal.shared.aborted.send_replace(true);
        for (_, listener) in listeners {
            listener(&reason);
        }
        true
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}
