/// Durable queue snapshot
use crate::types::track::Track;
use serde::{Deserialize, Serialize};

/// Queue and cursor as written to durable storage
///
/// An empty `tracks` list means "no session"; stores delete their backing
/// data instead of writing it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedQueue {
    pub tracks: Vec<Track>,
    pub cursor: Option<usize>,
}

impl PersistedQueue {
    pub fn new(tracks: Vec<Track>, cursor: Option<usize>) -> Self {
        Self { tracks, cursor }
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Cursor, dropped when it does not point into `tracks`
    pub fn valid_cursor(&self) -> Option<usize> {
        self.cursor.filter(|&index| index < self.tracks.len())
    }
}
