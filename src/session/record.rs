//! Per-address session history.

use std::collections::VecDeque;

use tracing::debug;

use super::state::SessionState;
use crate::crypto::SignalPublicKey;
use crate::MAX_ARCHIVED_STATES;

/// All ratchet states known for one remote address, newest first.
///
/// Only the newest state is open for sending. Older states are closed but
/// kept so messages in flight on a superseded ratchet still decrypt. The
/// history is bounded; the oldest state is evicted once the bound is passed.
#[derive(Debug, Clone)]
pub struct Session {
    states: VecDeque<SessionState>,
    max_states: usize,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates an empty session with the default history bound.
    pub fn new() -> Self {
        Self::with_max_states(MAX_ARCHIVED_STATES)
    }

    /// Creates an empty session keeping at most `max_states` states.
    pub fn with_max_states(max_states: usize) -> Self {
        Self {
            states: VecDeque::new(),
            max_states: max_states.max(1),
        }
    }

    pub fn max_states(&self) -> usize {
        self.max_states
    }

    /// The newest state, open or not.
    pub fn current_state(&self) -> Option<&SessionState> {
        self.states.front()
    }

    pub fn current_state_mut(&mut self) -> Option<&mut SessionState> {
        self.states.front_mut()
    }

    /// All states, newest first.
    pub fn states(&self) -> impl Iterator<Item = &SessionState> {
        self.states.iter()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of states still open for sending.
    pub fn open_state_count(&self) -> usize {
        self.states.iter().filter(|state| !state.is_closed()).count()
    }

    /// Whether a state from handshake `(version, base_key)` is present.
    pub fn has_state(&self, version: u32, base_key: &SignalPublicKey) -> bool {
        self.find_state(version, base_key).is_some()
    }

    pub fn find_state(&self, version: u32, base_key: &SignalPublicKey) -> Option<&SessionState> {
        self.states.iter().find(|state| state.matches(version, base_key))
    }

    /// Closes the current state, if any.
    pub fn close_current_state(&mut self) -> &mut Self {
        if let Some(state) = self.states.front_mut() {
            state.close();
        }
        self
    }

    /// Installs `state` as the current state.
    ///
    /// A predecessor still open is closed first, and the oldest states are
    /// evicted while the history exceeds its bound.
    pub fn add_state(&mut self, state: SessionState) -> &mut Self {
        for previous in self.states.iter_mut().filter(|s| !s.is_closed()) {
            previous.close();
        }

        self.states.push_front(state);

        while self.states.len() > self.max_states {
            if let Some(evicted) = self.states.pop_back() {
                debug!(
                    "Evicted session state version {} past bound {}",
                    evicted.version(),
                    self.max_states
                );
            }
        }
        self
    }
}
