//! One-shot promise used to hand results back from queue-confined work.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A value that will be produced exactly once, possibly on another thread.
///
/// The first `resolve` wins; later calls are logged and ignored. Waiters
/// may be on any thread, and a resolved value can be read repeatedly.
pub struct Deferred<T> {
    slot: Arc<Slot<T>>,
}

struct Slot<T> {
    value: Mutex<Option<T>>,
    ready: Condvar,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deferred<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Slot {
                value: Mutex::new(None),
                ready: Condvar::new(),
            }),
        }
    }

    /// A promise that is already fulfilled.
    pub fn resolved(value: T) -> Self {
        let deferred = Self::new();
        deferred.resolve(value);
        deferred
    }

    pub fn resolve(&self, value: T) {
        let mut guard = self.slot.value.lock();
        if guard.is_some() {
            log::warn!("deferred resolved more than once, keeping the first value");
            return;
        }
        *guard = Some(value);
        self.slot.ready.notify_all();
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.value.lock().is_some()
    }
}

impl<T: Clone> Deferred<T> {
    /// Block until the value is available.
    pub fn wait(&self) -> T {
        let mut guard = self.slot.value.lock();
        loop {
            if let Some(value) = guard.as_ref() {
                return value.clone();
            }
            self.slot.ready.wait(&mut guard);
        }
    }

    /// Block until the value is available or the timeout elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.slot.value.lock();
        loop {
            if let Some(value) = guard.as_ref() {
                return Some(value.clone());
            }
            if self.slot.ready.wait_until(&mut guard, deadline).timed_out() {
                return guard.as_ref().cloned();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn wait_sees_value_resolved_on_another_thread() {
        let deferred: Deferred<u32> = Deferred::new();
        let remote = deferred.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.resolve(7);
        });
        assert_eq!(deferred.wait(), 7);
        assert!(deferred.is_resolved());
    }

    #[test]
    fn first_resolution_wins() {
        let deferred = Deferred::new();
        deferred.resolve("first");
        deferred.resolve("second");
        assert_eq!(deferred.wait(), "first");
    }

    #[test]
    fn wait_timeout_returns_none_when_unresolved() {
        let deferred: Deferred<u32> = Deferred::new();
        assert_eq!(deferred.wait_timeout(Duration::from_millis(10)), None);
    }

    #[test]
    fn resolved_constructor_is_immediately_ready() {
        let deferred = Deferred::resolved(3);
        assert_eq!(deferred.wait_timeout(Duration::from_millis(1)), Some(3));
    }
}
