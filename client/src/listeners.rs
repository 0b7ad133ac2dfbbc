//! Fan-out of dispatched commands to external observers.
//!
//! Callbacks run in registration order on the dispatcher. A callback that
//! returns an error or panics is logged and skipped; it never stops the
//! remaining callbacks or the dispatcher itself.

use crate::error::ListenerError;
use log::error;
use shared::ConsoleCommand;
use std::error::Error as StdError;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

pub type ListenerResult = Result<(), Box<dyn StdError + Send + Sync>>;

type Callback = Arc<dyn Fn(&ConsoleCommand) -> ListenerResult + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Callback)>,
}

#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<Listeners>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a callback. It stays registered until the returned handle is
    /// disposed or dropped.
    pub fn register<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&ConsoleCommand) -> ListenerResult + Send + Sync + 'static,
    {
        let mut listeners = lock(&self.inner);
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(callback)));

        ListenerHandle {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes every callback with `command` and returns the failures.
    pub fn notify(&self, command: &ConsoleCommand) -> Vec<ListenerError> {
        // Callbacks may register or dispose listeners, so run them unlocked.
        let callbacks: Vec<Callback> = lock(&self.inner)
            .entries
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        let mut failures = Vec::new();
        for callback in callbacks {
            let outcome = match catch_unwind(AssertUnwindSafe(|| callback(command))) {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => ListenerError::Failed(e),
                Err(payload) => ListenerError::Panicked(panic_message(payload.as_ref())),
            };

            error!(
                "Exception in command listener for '{}': {}",
                command.raw_text, outcome
            );
            failures.push(outcome);
        }

        failures
    }
}

/// Deregisters its listener when disposed or dropped.
#[must_use = "dropping the handle deregisters the listener"]
pub struct ListenerHandle {
    id: u64,
    registry: Weak<Mutex<Listeners>>,
}

impl ListenerHandle {
    pub fn dispose(self) {}
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade() {
            lock(&inner).entries.retain(|(id, _)| *id != self.id);
        }
    }
}

fn lock(inner: &Mutex<Listeners>) -> MutexGuard<'_, Listeners> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
