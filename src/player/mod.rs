//! The externally visible player.
//!
//! [`PublishedPlayer`] holds the single published [`PlayerState`] in a watch
//! channel. Writers replace it wholesale, so a reader never observes a status
//! from one update next to metadata from another. Presentation adapters such
//! as [`mpris`] subscribe and mirror every replacement.

use std::sync::Arc;

use tokio::sync::watch;

use crate::types::{PlaybackStatus, PlayerState};

pub mod mpris;

#[derive(Debug, Clone)]
pub struct PublishedPlayer {
    tx: Arc<watch::Sender<PlayerState>>,
}

impl Default for PublishedPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishedPlayer {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(PlayerState::default());
        PublishedPlayer { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> PlayerState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlayerState> {
        self.tx.subscribe()
    }

    /// Replaces the published state. The last call to complete wins.
    pub fn publish(&self, state: PlayerState) {
        self.tx.send_replace(state);
    }

    /// Changes only the status of whatever state is published at this moment.
    ///
    /// The read and the write happen under the channel's lock, so a state
    /// published concurrently is never overwritten with stale metadata.
    pub fn update_status(&self, status: PlaybackStatus) {
        self.tx.send_modify(|state| {
            state.status = status;
            if let Some(snapshot) = state.snapshot.as_mut() {
                snapshot.is_playing = status == PlaybackStatus::Playing;
            }
        });
    }
}
