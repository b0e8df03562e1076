//! Shuffle sequencing over queue indices
//!
//! Shuffle never reorders the queue. Instead the sequencer keeps three pools
//! of queue indices:
//!
//! ```text
//! history  [a, b, c]   played, oldest first; `retreat` pops from here
//! cursor    d
//! future   [e]         stepped back past; `advance` redoes these first
//! bag      {f, g, h}   not yet played this round, picked at random
//! ```
//!
//! While enabled, the pools and the cursor partition the queue indices.

use crate::queue::IndexRemap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Outcome of [`ShuffleSequencer::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleStep {
    /// Move the cursor to this index
    Moved(usize),

    /// Every track was played and refilling is not allowed
    EndOfShuffle,
}

/// History / future / bag bookkeeping for shuffled playback
#[derive(Debug)]
pub struct ShuffleSequencer {
    enabled: bool,
    history: Vec<usize>,
    future: Vec<usize>,
    bag: Vec<usize>,
    rng: StdRng,
}

impl Default for ShuffleSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl ShuffleSequencer {
    /// Create a disabled sequencer seeded from the OS
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create a disabled sequencer with a fixed seed (deterministic picks)
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            enabled: false,
            history: Vec::new(),
            future: Vec::new(),
            bag: Vec::new(),
            rng,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn history(&self) -> &[usize] {
        &self.history
    }

    pub fn future(&self) -> &[usize] {
        &self.future
    }

    pub fn bag(&self) -> &[usize] {
        &self.bag
    }

    /// Turn shuffle on, starting a fresh round from `cursor`
    pub fn enable(&mut self, len: usize, cursor: Option<usize>) {
        self.enabled = true;
        self.reset(len, cursor);
    }

    /// Turn shuffle off; linear order resumes from the cursor
    pub fn disable(&mut self) {
        self.enabled = false;
        self.clear();
    }

    /// Start a fresh round if enabled (new queue)
    pub fn reset(&mut self, len: usize, cursor: Option<usize>) {
        self.clear();
        if self.enabled {
            self.refill(len, cursor);
        }
    }

    /// Drop all bookkeeping, keeping the enabled flag
    pub fn clear(&mut self) {
        self.history.clear();
        self.future.clear();
        self.bag.clear();
    }

    /// Whether `advance` can move without refilling
    pub fn has_pending(&self) -> bool {
        !self.future.is_empty() || !self.bag.is_empty()
    }

    /// Pick the next index
    ///
    /// Redo entries in `future` win over fresh picks. When the bag is empty
    /// and `refill_allowed` is set, a new round starts that excludes only the
    /// current index; a one-track queue therefore replays its only track.
    pub fn advance(&mut self, cursor: Option<usize>, len: usize, refill_allowed: bool) -> ShuffleStep {
        if let Some(next) = self.future.pop() {
            self.push_history(cursor);
            return ShuffleStep::Moved(next);
        }

        if self.bag.is_empty() {
            if !refill_allowed {
                tracing::debug!("Shuffle round finished");
                return ShuffleStep::EndOfShuffle;
            }

            tracing::debug!(len, "Refilling shuffle bag");
            self.history.clear();
            self.refill(len, cursor);

            if self.bag.is_empty() {
                return match cursor {
                    Some(current) => ShuffleStep::Moved(current),
                    None => ShuffleStep::EndOfShuffle,
                };
            }
        }

        self.push_history(cursor);
        self.future.clear();
        let pick = self.rng.gen_range(0..self.bag.len());
        ShuffleStep::Moved(self.bag.swap_remove(pick))
    }

    /// Step back through history
    ///
    /// Returns `None` when there is nothing to go back to.
    pub fn retreat(&mut self, cursor: Option<usize>) -> Option<usize> {
        let previous = self.history.pop()?;
        if let Some(current) = cursor {
            self.future.push(current);
        }
        Some(previous)
    }

    /// Record a direct selection of `to` (e.g. tapping a queue row)
    ///
    /// Entries waiting in `future` go back into the bag.
    pub fn jump(&mut self, from: Option<usize>, to: usize) {
        if !self.enabled || from == Some(to) {
            return;
        }

        self.history.retain(|&i| i != to);
        self.bag.retain(|&i| i != to);
        self.future.retain(|&i| i != to);
        self.bag.append(&mut self.future);
        self.push_history(from);
    }

    /// Follow a structural queue edit
    ///
    /// Removed indices disappear, moved ones are translated and freshly added
    /// tracks join the bag.
    pub fn apply_remap(&mut self, remap: &IndexRemap, cursor: Option<usize>) {
        if !self.enabled {
            return;
        }

        let translate = |pool: &mut Vec<usize>| {
            *pool = pool
                .iter()
                .filter_map(|&old| remap.map(old))
                .filter(|&new| Some(new) != cursor)
                .collect();
        };
        translate(&mut self.history);
        translate(&mut self.future);
        translate(&mut self.bag);

        self.bag
            .extend(remap.added().into_iter().filter(|&i| Some(i) != cursor));
    }

    /// Whether the pools and `cursor` partition `0..len`
    pub fn is_consistent(&self, cursor: Option<usize>, len: usize) -> bool {
        let mut seen = vec![false; len];
        let all = self
            .history
            .iter()
            .chain(&self.future)
            .chain(&self.bag)
            .chain(cursor.as_ref());
        for &i in all {
            if i >= len || seen[i] {
                return false;
            }
            seen[i] = true;
        }
        seen.into_iter().all(|s| s)
    }

    fn push_history(&mut self, cursor: Option<usize>) {
        if let Some(current) = cursor {
            self.history.push(current);
        }
    }

    fn refill(&mut self, len: usize, exclude: Option<usize>) {
        self.bag = (0..len).filter(|&i| Some(i) != exclude).collect();
    }
}
