//! In-process locks keyed by host name.
//!
//! Create and destroy for the same name are serialized; different names run
//! concurrently. Nothing here protects against other processes.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, MutexGuard};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Set of host names currently being changed.
#[derive(Debug, Default)]
pub struct HostLocks {
    held: Mutex<HashSet<String>>,
    released: Condvar,
}

impl HostLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until no one else holds `name`, then hold it.
    pub fn acquire(&self, name: &str) -> HostGuard<'_> {
        let mut held = lock(&self.held);
        while held.contains(name) {
            log::debug!("Waiting for another operation on {name}");
            held = match self.released.wait(held) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
        held.insert(name.to_string());
        HostGuard {
            locks: self,
            name: name.to_string(),
        }
    }

    /// Hold `name` only if it is free right now.
    pub fn try_acquire(&self, name: &str) -> Option<HostGuard<'_>> {
        let mut held = lock(&self.held);
        if !held.insert(name.to_string()) {
            return None;
        }
        Some(HostGuard {
            locks: self,
            name: name.to_string(),
        })
    }
}

/// Releases its host name on drop.
#[derive(Debug)]
pub struct HostGuard<'a> {
    locks: &'a HostLocks,
    name: String,
}

impl Drop for HostGuard<'_> {
    fn drop(&mut self) {
        lock(&self.locks.held).remove(&self.name);
        self.locks.released.notify_all();
    }
}
