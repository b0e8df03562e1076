//! Property-based tests for queue and shuffle bookkeeping
//!
//! Drives [`Queue`] and [`ShuffleSequencer`] together the way the player does
//! and checks the invariants after every step.

use proptest::prelude::*;
use std::collections::HashSet;
use tandem_core::{PersistedQueue, PersistenceStore, Track};
use tandem_playback::{JsonFileStore, Queue, ShuffleSequencer, ShuffleStep};

// ===== Helpers =====

fn track(id: i64) -> Track {
    Track::new(id, format!("Track {id}"), "Artist", "Album")
}

fn distinct_tracks() -> impl Strategy<Value = Vec<Track>> {
    (1usize..12).prop_map(|n| (1..=n as i64).map(track).collect())
}

#[derive(Debug, Clone)]
enum Op {
    Advance { wrap: bool },
    Retreat,
    Jump(usize),
    InsertNext(i64),
    AppendEnd(i64),
    Remove(usize),
    Move(usize, usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<bool>().prop_map(|wrap| Op::Advance { wrap }),
        2 => Just(Op::Retreat),
        1 => (0usize..32).prop_map(Op::Jump),
        1 => (1i64..16).prop_map(Op::InsertNext),
        1 => (1i64..16).prop_map(Op::AppendEnd),
        1 => (0usize..32).prop_map(Op::Remove),
        1 => (0usize..32, 0usize..32).prop_map(|(a, b)| Op::Move(a, b)),
    ]
}

/// Apply `op` to the pair the way the player would
fn apply(queue: &mut Queue, shuffle: &mut ShuffleSequencer, op: Op) {
    let len = queue.len();
    match op {
        Op::Advance { wrap } => match shuffle.advance(queue.cursor(), len, wrap) {
            ShuffleStep::Moved(index) => queue.move_cursor(index).unwrap(),
            ShuffleStep::EndOfShuffle => {}
        },
        Op::Retreat => {
            if let Some(index) = shuffle.retreat(queue.cursor()) {
                queue.move_cursor(index).unwrap();
            }
        }
        Op::Jump(index) => {
            let index = index % len;
            shuffle.jump(queue.cursor(), index);
            queue.move_cursor(index).unwrap();
        }
        Op::InsertNext(id) => {
            let remap = queue.insert_next(track(id));
            shuffle.apply_remap(&remap, queue.cursor());
        }
        Op::AppendEnd(id) => {
            let remap = queue.append_end(track(id));
            shuffle.apply_remap(&remap, queue.cursor());
        }
        Op::Remove(index) => {
            let (_, remap) = queue.remove(index % len).unwrap();
            if queue.is_empty() {
                shuffle.clear();
            } else {
                shuffle.apply_remap(&remap, queue.cursor());
            }
        }
        Op::Move(from, to) => {
            let remap = queue.move_track(from % len, to % len).unwrap();
            shuffle.apply_remap(&remap, queue.cursor());
        }
    }
}

fn ids(queue: &Queue) -> Vec<i64> {
    queue.tracks().iter().map(|t| t.id).collect()
}

// ===== Property Tests =====

proptest! {
    /// Property: the start index is always clamped into the queue
    #[test]
    fn start_index_is_clamped(tracks in distinct_tracks(), start in 0usize..64) {
        let len = tracks.len();
        let mut queue = Queue::new();

        let cursor = queue.replace(tracks, start);
        prop_assert_eq!(cursor, Some(start.min(len - 1)));
        prop_assert_eq!(queue.cursor(), cursor);
    }

    /// Property: history, future, bag and the cursor partition the queue
    /// after any sequence of navigation and edits
    #[test]
    fn shuffle_pools_stay_disjoint(
        tracks in distinct_tracks(),
        start in 0usize..16,
        seed in any::<u64>(),
        ops in prop::collection::vec(op(), 1..60)
    ) {
        let mut queue = Queue::new();
        queue.replace(tracks.clone(), start);
        let mut shuffle = ShuffleSequencer::with_seed(seed);
        shuffle.enable(queue.len(), queue.cursor());
        prop_assert!(shuffle.is_consistent(queue.cursor(), queue.len()));

        for op in ops {
            if queue.is_empty() {
                queue.replace(tracks.clone(), 0);
                shuffle.reset(queue.len(), queue.cursor());
            }

            apply(&mut queue, &mut shuffle, op.clone());
            prop_assert!(
                shuffle.is_consistent(queue.cursor(), queue.len()),
                "pools broken after {:?}: cursor {:?} history {:?} future {:?} bag {:?}",
                op,
                queue.cursor(),
                shuffle.history(),
                shuffle.future(),
                shuffle.bag()
            );
        }
    }

    /// Property: a round without refill visits every track exactly once
    #[test]
    fn shuffle_round_visits_each_track_once(
        tracks in distinct_tracks(),
        start in 0usize..16,
        seed in any::<u64>()
    ) {
        let mut queue = Queue::new();
        queue.replace(tracks, start);
        let mut shuffle = ShuffleSequencer::with_seed(seed);
        shuffle.enable(queue.len(), queue.cursor());

        let mut visited: HashSet<usize> = queue.cursor().into_iter().collect();
        while let ShuffleStep::Moved(index) = shuffle.advance(queue.cursor(), queue.len(), false) {
            prop_assert!(visited.insert(index), "index {} played twice", index);
            queue.move_cursor(index).unwrap();
        }

        prop_assert_eq!(visited.len(), queue.len());
    }

    /// Property: retreating k steps then advancing k steps returns to the
    /// same track
    #[test]
    fn retreat_then_advance_is_symmetric(
        tracks in distinct_tracks(),
        seed in any::<u64>(),
        forward in 1usize..12,
        back in 1usize..12
    ) {
        let mut queue = Queue::new();
        queue.replace(tracks, 0);
        let mut shuffle = ShuffleSequencer::with_seed(seed);
        shuffle.enable(queue.len(), queue.cursor());

        for _ in 0..forward {
            match shuffle.advance(queue.cursor(), queue.len(), false) {
                ShuffleStep::Moved(index) => queue.move_cursor(index).unwrap(),
                ShuffleStep::EndOfShuffle => break,
            }
        }
        let before = queue.cursor();

        let mut retreated = 0;
        for _ in 0..back {
            match shuffle.retreat(queue.cursor()) {
                Some(index) => {
                    queue.move_cursor(index).unwrap();
                    retreated += 1;
                }
                None => break,
            }
        }

        for _ in 0..retreated {
            match shuffle.advance(queue.cursor(), queue.len(), false) {
                ShuffleStep::Moved(index) => queue.move_cursor(index).unwrap(),
                ShuffleStep::EndOfShuffle => prop_assert!(false, "redo stack ran dry"),
            }
        }

        prop_assert_eq!(queue.cursor(), before);
    }

    /// Property: insert and append never duplicate a track and keep the
    /// cursor on the same track
    #[test]
    fn edits_keep_identity(
        tracks in distinct_tracks(),
        start in 0usize..16,
        edits in prop::collection::vec((any::<bool>(), 1i64..16), 1..30)
    ) {
        let mut queue = Queue::new();
        queue.replace(tracks, start);
        let current = queue.current().map(|t| t.id);

        for (next, id) in edits {
            if next {
                queue.insert_next(track(id));
            } else {
                queue.append_end(track(id));
            }

            let ids = ids(&queue);
            let unique: HashSet<_> = ids.iter().collect();
            prop_assert_eq!(unique.len(), ids.len(), "duplicate in {:?}", ids);
            prop_assert_eq!(queue.current().map(|t| t.id), current);
        }
    }

    /// Property: inserted tracks land right after the cursor
    #[test]
    fn insert_next_lands_after_cursor(
        tracks in distinct_tracks(),
        start in 0usize..16,
        id in 1i64..16
    ) {
        let mut queue = Queue::new();
        queue.replace(tracks, start);
        let cursor = queue.cursor().unwrap();

        queue.insert_next(track(id));

        if queue.tracks()[cursor].id != id {
            prop_assert_eq!(queue.tracks()[cursor + 1].id, id);
        }
    }

    /// Property: whatever is saved loads back unchanged, and an empty queue
    /// leaves nothing behind
    #[test]
    fn snapshot_round_trips(
        tracks in prop::collection::vec((1i64..1000, "[A-Za-z ]{1,20}", -5000i64..5000), 0..20),
        cursor in proptest::option::of(0usize..20)
    ) {
        let tracks: Vec<Track> = tracks
            .into_iter()
            .map(|(id, name, offset)| {
                let mut t = Track::new(id, name, "Artist", "Album");
                t.user_lyric_offset_ms = offset;
                t
            })
            .collect();
        let snapshot = PersistedQueue::new(tracks, cursor);

        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("last_playlist.json"));
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let loaded = runtime.block_on(async {
            store.save(&snapshot).await.unwrap();
            store.load().await.unwrap()
        });

        if snapshot.is_empty() {
            prop_assert_eq!(loaded, None);
            prop_assert!(!store.path().exists());
        } else {
            prop_assert_eq!(loaded, Some(snapshot));
        }
    }
}
