//! Sending and receiving chains.

use std::collections::BTreeMap;

use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

use crate::KEY_LENGTH;

/// One symmetric chain of a session state.
///
/// The counter is the index of the last message processed on the chain;
/// `-1` means no message has gone through it yet. Skipped message keys are
/// cached for out-of-order delivery, bounded by `max_message_keys` with the
/// lowest index evicted first.
#[derive(Clone)]
pub struct SessionChain {
    counter: i32,
    key: [u8; KEY_LENGTH],
    message_keys: BTreeMap<u32, [u8; KEY_LENGTH]>,
    max_message_keys: usize,
}

impl std::fmt::Debug for SessionChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionChain")
            .field("counter", &self.counter)
            .field("key", &"[REDACTED]")
            .field("message_keys", &self.message_keys.len())
            .finish()
    }
}

impl Drop for SessionChain {
    fn drop(&mut self) {
        for key in self.message_keys.values_mut() {
            key.zeroize();
        }
        self.key.zeroize();
    }
}

impl SessionChain {
    /// Creates a chain at `counter` with the given chain key.
    pub fn new(counter: i32, key: [u8; KEY_LENGTH], max_message_keys: usize) -> Self {
        Self {
            counter,
            key,
            message_keys: BTreeMap::new(),
            max_message_keys,
        }
    }

    /// Index of the last processed message, `-1` for a fresh chain.
    pub fn counter(&self) -> i32 {
        self.counter
    }

    /// Current chain key.
    pub fn key(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }

    /// Moves the chain forward by one message.
    ///
    /// Returns the new counter, or `None` without changing the chain once
    /// the counter has reached `i32::MAX`.
    pub fn advance(&mut self, mut next_key: [u8; KEY_LENGTH]) -> Option<i32> {
        let Some(counter) = self.counter.checked_add(1) else {
            next_key.zeroize();
            return None;
        };
        self.key.zeroize();
        self.key = next_key;
        self.counter = counter;
        Some(counter)
    }

    /// Caches the message key for a skipped `index`.
    ///
    /// Returns the index evicted to stay within the bound, if any.
    pub fn add_message_key(&mut self, index: u32, key: [u8; KEY_LENGTH]) -> Option<u32> {
        if let Some(mut previous) = self.message_keys.insert(index, key) {
            previous.zeroize();
        }
        if self.message_keys.len() <= self.max_message_keys {
            return None;
        }

        let (evicted, mut old_key) = self.message_keys.pop_first()?;
        old_key.zeroize();
        debug!("Evicted skipped message key {} past bound {}", evicted, self.max_message_keys);
        Some(evicted)
    }

    /// Removes and returns the cached key for `index`.
    pub fn take_message_key(&mut self, index: u32) -> Option<Zeroizing<[u8; KEY_LENGTH]>> {
        self.message_keys.remove(&index).map(Zeroizing::new)
    }

    pub fn has_message_key(&self, index: u32) -> bool {
        self.message_keys.contains_key(&index)
    }

    pub fn message_key_count(&self) -> usize {
        self.message_keys.len()
    }
}
