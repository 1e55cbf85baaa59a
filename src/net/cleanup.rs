//! Scoped cleanup: a stack of deferred actions that always runs.

/// A deferred action registered with a [`CleanupStack`].
type Deferred = Box<dyn FnOnce() + Send + 'static>;

/// Owns cleanup actions registered at each subscription point.
///
/// Actions run in reverse registration order, exactly once, when the stack is
/// dropped or [`run`](Self::run) is called.
#[derive(Default)]
pub struct CleanupStack {
    actions: Vec<Deferred>,
}

impl CleanupStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action to run on cleanup.
    pub fn defer(&mut self, action: impl FnOnce() + Send + 'static) {
        self.actions.push(Box::new(action));
    }

    /// Number of actions still pending.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Runs every pending action now.
    pub fn run(mut self) {
        self.drain();
    }

    fn drain(&mut self) {
        while let Some(action) = self.actions.pop() {
            action();
        }
    }
}

impl Drop for CleanupStack {
    fn drop(&mut self) {
        self.drain();
    }
}

impl std::fmt::Debug for CleanupStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupStack").field("pending", &self.actions.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn runs_actions_in_reverse_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = CleanupStack::new();
        for i in 0..3 {
            let log = Arc::clone(&log);
            stack.defer(move || log.lock().unwrap().push(i));
        }
        assert_eq!(stack.len(), 3);
        stack.run();
        assert_eq!(*log.lock().unwrap(), vec![2, 1, 0]);
    }

    #[test]
    fn drop_runs_pending_actions() {
        let hits = Arc::new(Mutex::new(0));
        {
            let mut stack = CleanupStack::new();
            let hits = Arc::clone(&hits);
            stack.defer(move || *hits.lock().unwrap() += 1);
        }
        assert_eq!(*hits.lock().unwrap(), 1);
    }
}
