//! Player events
//!
//! Only user-facing side effects travel here. Everything observable about
//! the player state is published through [`crate::PlayerSnapshot`] instead.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events pushed to UI-owned layers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerEvent {
    /// The backend needs a logged-in session for a track
    ShowLoginPrompt {
        /// Message suitable for display
        message: String,
    },

    /// Playback stopped or paused because of an error
    ShowError {
        /// Message suitable for display
        message: String,
    },
}

impl PlayerEvent {
    pub fn login_prompt(message: impl Into<String>) -> Self {
        Self::ShowLoginPrompt {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::ShowError {
            message: message.into(),
        }
    }
}

/// Fire-and-forget fan-out of [`PlayerEvent`]s
///
/// Emitting never blocks; slow subscribers lose the oldest events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn emit(&self, event: PlayerEvent) {
        tracing::debug!(?event, "Emitting player event");
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }
}
