//! Observable holder of the [`PlayerState`] mirror.
//!
//! The store wraps a [`tokio::sync::watch`] channel: readers take cheap
//! snapshots or subscribe for change notifications, and every mutation made
//! through the store notifies subscribers, even when the resulting value is
//! equal to the previous one.

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::protocol::PlayerEvent;
use crate::state::{PlayerState, PolledState};

/// The single authoritative in-process copy of the remote player state.
#[derive(Debug)]
pub struct PlayerStore {
    tx: watch::Sender<PlayerState>,
}

impl Default for PlayerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerStore {
    /// Create a store holding the cleared default state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(PlayerState::default());
        Self { tx }
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> PlayerState {
        self.tx.borrow().clone()
    }

    /// Subscribe to state changes.
    ///
    /// The receiver sees the current value immediately and is marked changed
    /// after every subsequent mutation.
    pub fn subscribe(&self) -> watch::Receiver<PlayerState> {
        self.tx.subscribe()
    }

    /// Mutate the state in place and notify subscribers.
    pub(crate) fn update(&self, mutate: impl FnOnce(&mut PlayerState)) {
        self.tx.send_modify(mutate);
    }

    /// Apply a pushed event. Unknown events are logged and dropped without a
    /// notification.
    pub(crate) fn apply_event(&self, event: &PlayerEvent) {
        let applied = self.tx.send_if_modified(|state| state.apply(event));
        if applied {
            debug!(kind = event.kind(), "applied player event");
        } else {
            warn!("ignoring unknown player event type");
        }
    }

    /// Merge an authoritative fetch.
    pub(crate) fn merge_polled(&self, polled: &PolledState) {
        self.update(|state| state.merge_polled(polled));
    }

    /// Clear the mirror so stale data is never shown as current.
    pub(crate) fn reset(&self) {
        self.update(PlayerState::reset);
    }
}
