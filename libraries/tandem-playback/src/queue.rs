//! Queue store
//!
//! Holds the ordered tracks and the play cursor. Structural edits return an
//! [`IndexRemap`] so index-based bookkeeping (shuffle history, bag) can
//! follow the tracks to their new positions.

use crate::error::{PlaybackError, Result};
use std::sync::Arc;
use tandem_core::{PersistedQueue, Track, TrackKey};

/// Old-index to new-index mapping produced by a structural queue edit
///
/// Indices of removed tracks map to `None`. Tracks that did not exist before
/// the edit have no old index and therefore never appear as a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRemap {
    mapping: Vec<Option<usize>>,
    new_len: usize,
}

impl IndexRemap {
    /// Mapping for an edit that moved nothing
    pub fn identity(len: usize) -> Self {
        Self {
            mapping: (0..len).map(Some).collect(),
            new_len: len,
        }
    }

    /// New position of the track previously at `old`
    pub fn map(&self, old: usize) -> Option<usize> {
        self.mapping.get(old).copied().flatten()
    }

    /// Queue length after the edit
    pub fn new_len(&self) -> usize {
        self.new_len
    }

    /// New indices that no old index maps to (freshly added tracks)
    pub fn added(&self) -> Vec<usize> {
        let mut covered = vec![false; self.new_len];
        for new in self.mapping.iter().flatten() {
            covered[*new] = true;
        }
        covered
            .iter()
            .enumerate()
            .filter(|(_, seen)| !**seen)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_identity(&self) -> bool {
        self.mapping.len() == self.new_len
            && self
                .mapping
                .iter()
                .enumerate()
                .all(|(i, new)| *new == Some(i))
    }
}

/// Ordered play queue with a cursor
#[derive(Debug, Clone, Default)]
pub struct Queue {
    tracks: Vec<Track>,

    /// `None` when nothing is selected
    cursor: Option<usize>,

    /// Keys of the list the queue was last built from
    source: Vec<TrackKey>,
}

impl Queue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Track under the cursor
    pub fn current(&self) -> Option<&Track> {
        self.cursor.and_then(|i| self.tracks.get(i))
    }

    pub fn position_of(&self, key: &TrackKey) -> Option<usize> {
        self.tracks.iter().position(|t| t.matches(key))
    }

    /// Immutable copy for observers
    pub fn shared(&self) -> Arc<[Track]> {
        Arc::from(self.tracks.as_slice())
    }

    /// Replace the whole queue and select `start`
    ///
    /// `start` is clamped into bounds. An empty list leaves the queue
    /// untouched and returns `None`.
    pub fn replace(&mut self, tracks: Vec<Track>, start: usize) -> Option<usize> {
        if tracks.is_empty() {
            tracing::warn!("Ignoring request to play an empty list");
            return None;
        }

        let cursor = start.min(tracks.len() - 1);
        if cursor != start {
            tracing::debug!(start, clamped = cursor, "Clamped start index");
        }

        self.source = tracks.iter().map(Track::key).collect();
        self.tracks = tracks;
        self.cursor = Some(cursor);
        Some(cursor)
    }

    /// Place `track` right after the cursor
    ///
    /// A track already in the queue is moved rather than duplicated. Inserting
    /// the current track is a no-op.
    pub fn insert_next(&mut self, track: Track) -> IndexRemap {
        let existing = self.position_of(&track.key());
        if existing.is_some() && existing == self.cursor {
            return IndexRemap::identity(self.len());
        }

        let insert_at = self.cursor.map_or(0, |c| c + 1).min(self.len());

        self.edit(|entries| {
            let target = match existing {
                Some(from) => {
                    entries.remove(from);
                    if from < insert_at {
                        insert_at - 1
                    } else {
                        insert_at
                    }
                }
                None => insert_at,
            };
            entries.insert(target, (existing, track));
        })
    }

    /// Append `track` at the end, moving it there if already queued
    pub fn append_end(&mut self, track: Track) -> IndexRemap {
        let existing = self.position_of(&track.key());
        if existing.is_some() && existing == self.len().checked_sub(1) {
            return IndexRemap::identity(self.len());
        }

        self.edit(|entries| {
            if let Some(from) = existing {
                entries.remove(from);
            }
            entries.push((existing, track));
        })
    }

    /// Remove the track at `index`
    ///
    /// If the current track is removed, the cursor stays on the same position
    /// (clamped), or becomes `None` when the queue empties.
    pub fn remove(&mut self, index: usize) -> Result<(Track, IndexRemap)> {
        if self.is_empty() {
            return Err(PlaybackError::QueueEmpty);
        }
        if index >= self.len() {
            return Err(PlaybackError::IndexOutOfBounds {
                index,
                len: self.len(),
            });
        }

        let was_current = self.cursor == Some(index);
        let mut removed = None;
        let remap = self.edit(|entries| {
            removed = Some(entries.remove(index).1);
        });

        if was_current {
            self.cursor = if self.is_empty() {
                None
            } else {
                Some(index.min(self.len() - 1))
            };
        }

        let track = removed.ok_or(PlaybackError::IndexOutOfBounds {
            index,
            len: self.len(),
        })?;
        Ok((track, remap))
    }

    /// Move the track at `from` so that it ends up at `to`
    pub fn move_track(&mut self, from: usize, to: usize) -> Result<IndexRemap> {
        let len = self.len();
        if from >= len || to >= len {
            return Err(PlaybackError::IndexOutOfBounds {
                index: from.max(to),
                len,
            });
        }

        if from == to {
            return Ok(IndexRemap::identity(len));
        }

        Ok(self.edit(|entries| {
            let entry = entries.remove(from);
            entries.insert(to, entry);
        }))
    }

    /// Drop every track and the cursor
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.source.clear();
        self.cursor = None;
    }

    /// Point the cursor at `index`
    pub fn move_cursor(&mut self, index: usize) -> Result<()> {
        if self.is_empty() {
            return Err(PlaybackError::QueueEmpty);
        }
        if index >= self.len() {
            return Err(PlaybackError::IndexOutOfBounds {
                index,
                len: self.len(),
            });
        }
        self.cursor = Some(index);
        Ok(())
    }

    /// Edit the queued track matching `key` in place
    ///
    /// Returns the index of the edited track.
    pub fn update(&mut self, key: &TrackKey, f: impl FnOnce(&mut Track)) -> Option<usize> {
        let index = self.position_of(key)?;
        f(&mut self.tracks[index]);
        Some(index)
    }

    /// Whether the queue was built from exactly this list
    pub fn is_from(&self, tracks: &[Track]) -> bool {
        !self.source.is_empty()
            && self.source.len() == tracks.len()
            && self.source.iter().zip(tracks).all(|(key, t)| t.matches(key))
    }

    /// Load a persisted snapshot
    ///
    /// An out-of-range cursor is dropped.
    pub fn restore(&mut self, persisted: PersistedQueue) {
        self.cursor = persisted.valid_cursor();
        self.source = persisted.tracks.iter().map(Track::key).collect();
        self.tracks = persisted.tracks;
    }

    pub fn to_persisted(&self) -> PersistedQueue {
        PersistedQueue::new(self.tracks.clone(), self.cursor)
    }

    /// Apply a structural edit and compute where every old index went
    ///
    /// Entries carry their old index (`None` for new tracks) through the edit.
    fn edit(&mut self, f: impl FnOnce(&mut Vec<(Option<usize>, Track)>)) -> IndexRemap {
        let old_len = self.tracks.len();
        let mut entries: Vec<(Option<usize>, Track)> = self
            .tracks
            .drain(..)
            .enumerate()
            .map(|(i, t)| (Some(i), t))
            .collect();

        f(&mut entries);

        let mut mapping = vec![None; old_len];
        for (new, (origin, _)) in entries.iter().enumerate() {
            if let Some(old) = origin {
                mapping[*old] = Some(new);
            }
        }

        self.tracks = entries.into_iter().map(|(_, t)| t).collect();
        self.cursor = self.cursor.and_then(|c| mapping.get(c).copied().flatten());

        IndexRemap {
            mapping,
            new_len: self.tracks.len(),
        }
    }
}
