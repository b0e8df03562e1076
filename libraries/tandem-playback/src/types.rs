//! Core types for playback orchestration

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tandem_core::Track;

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No queue
    Idle,

    /// Resolution in flight for the cursor
    Resolving,

    /// Sink has a prepared item and is playing
    Playing,

    /// Queue present but not producing output
    ///
    /// The sink may or may not hold a prepared item; see
    /// [`PlayerSnapshot::prepared`].
    Paused,
}

/// Repeat mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop when queue ends
    #[default]
    Off,

    /// Loop entire queue
    All,

    /// Loop current track only
    One,
}

impl RepeatMode {
    /// Next mode in the Off -> All -> One -> Off cycle
    pub fn cycle(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }
}

/// Observable player state, published after every change
#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub state: PlaybackState,
    pub current: Option<Track>,
    pub queue: Arc<[Track]>,
    pub cursor: Option<usize>,
    pub is_playing: bool,
    pub prepared: bool,
    pub position_ms: u64,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub media_url: Option<String>,
    pub consecutive_failures: u32,
}

impl Default for PlayerSnapshot {
    fn default() -> Self {
        Self {
            state: PlaybackState::Idle,
            current: None,
            queue: Arc::from(Vec::new()),
            cursor: None,
            is_playing: false,
            prepared: false,
            position_ms: 0,
            shuffle: false,
            repeat: RepeatMode::Off,
            media_url: None,
            consecutive_failures: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_cycle_visits_all_modes() {
        let mut mode = RepeatMode::default();
        assert_eq!(mode, RepeatMode::Off);
        mode = mode.cycle();
        assert_eq!(mode, RepeatMode::All);
        mode = mode.cycle();
        assert_eq!(mode, RepeatMode::One);
        mode = mode.cycle();
        assert_eq!(mode, RepeatMode::Off);
    }

    #[test]
    fn default_snapshot_is_idle() {
        let snapshot = PlayerSnapshot::default();
        assert_eq!(snapshot.state, PlaybackState::Idle);
        assert!(snapshot.queue.is_empty());
        assert_eq!(snapshot.cursor, None);
    }
}
