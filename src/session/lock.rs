//! Per-address mutual exclusion for session mutation.
//!
//! Every read-modify-write of a [`Session`](super::Session) for one address
//! runs under that address's mutex, so a state cannot be closed or evicted
//! between a reader finding it and using it. Different addresses never share
//! a mutex.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::trace;

use super::address::SessionAddress;
use super::error::SessionError;

/// Registry of per-address locks.
///
/// Entries are created on demand and dropped again once no caller holds
/// or waits on them.
#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<SessionAddress, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for `address`.
    ///
    /// The registry entry is released on every exit path, including a panic
    /// in `f`, so a later call for the same address starts on a fresh mutex.
    pub fn with_lock<R>(
        &self,
        address: &SessionAddress,
        f: impl FnOnce() -> R,
    ) -> Result<R, SessionError> {
        // Locals drop in reverse order: guard, then our handle, then release.
        let _release = ReleaseEntry {
            locks: self,
            address,
        };
        let lock = self.acquire_entry(address)?;

        let _guard = lock
            .lock()
            .map_err(|_| SessionError::LockPoisoned(address.clone()))?;
        trace!("Holding session lock for {}", address);
        Ok(f())
    }

    /// Number of addresses with a live lock entry.
    pub fn active_addresses(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }

    fn acquire_entry(&self, address: &SessionAddress) -> Result<Arc<Mutex<()>>, SessionError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| SessionError::LockPoisoned(address.clone()))?;
        Ok(Arc::clone(locks.entry(address.clone()).or_default()))
    }

    fn release_entry(&self, address: &SessionAddress) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        // Only the registry's own reference left: nobody holds or waits.
        if locks
            .get(address)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(address);
        }
    }
}

/// Prunes an address entry when dropped, on return or unwind alike.
struct ReleaseEntry<'a> {
    locks: &'a SessionLocks,
    address: &'a SessionAddress,
}

impl Drop for ReleaseEntry<'_> {
    fn drop(&mut self) {
        self.locks.release_entry(self.address);
    }
}
