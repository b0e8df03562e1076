//! Playback orchestration
//!
//! [`PlaybackManager`] is the state machine behind the player. It is owned by
//! the actor task in [`crate::player`] and only ever touched from there, so
//! none of its methods need locking. Anything slow (resolution) runs in a
//! spawned task that reports back through [`Command::Resolved`].

use crate::breaker::CircuitBreaker;
use crate::config::PlaybackConfig;
use crate::events::{EventBus, PlayerEvent};
use crate::persistence::PersistenceWriter;
use crate::queue::Queue;
use crate::resolver::ResolutionPipeline;
use crate::shuffle::{ShuffleSequencer, ShuffleStep};
use crate::types::{PlaybackState, PlayerSnapshot, RepeatMode};
use std::sync::Arc;
use tandem_core::{
    ErrorClass, PersistedQueue, PlaybackSink, Resolution, SinkEvent, Track, TrackKey,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const LOGIN_PROMPT: &str = "Playback failed. Try logging in to the track's platform";

/// Messages processed by the player actor, in order
#[derive(Debug)]
pub(crate) enum Command {
    PlayQueue { tracks: Vec<Track>, start: usize },
    PlayAtIndex(usize),
    Next { force: bool },
    Previous,
    TogglePlayPause,
    Play,
    Pause,
    Stop,
    Seek(u64),
    SetShuffle(bool),
    CycleRepeat,
    InsertNext(Track),
    AppendEnd(Track),
    Remove(usize),
    MoveTrack { from: usize, to: usize },
    UpdateLyricOffset { key: TrackKey, offset_ms: i64 },
    ReplaceMetadata { key: TrackKey, track: Track },
    Sink(SinkEvent),
    Resolved {
        generation: u64,
        key: TrackKey,
        resolution: Resolution,
    },
    Shutdown,
}

/// Collaborators and channels handed to the manager by the player
pub(crate) struct ManagerParts {
    pub sink: Arc<dyn PlaybackSink>,
    pub pipeline: Arc<ResolutionPipeline>,
    pub events: EventBus,
    pub state_tx: watch::Sender<PlayerSnapshot>,
    pub writer: PersistenceWriter,
    pub commands: mpsc::WeakUnboundedSender<Command>,
}

/// Queue, shuffle, repeat and failure bookkeeping plus the resolution
/// lifecycle
pub(crate) struct PlaybackManager {
    queue: Queue,
    shuffle: ShuffleSequencer,
    breaker: CircuitBreaker,
    repeat: RepeatMode,

    state: PlaybackState,
    is_playing: bool,
    prepared: bool,
    position_ms: u64,
    media_url: Option<String>,
    last_failure: Option<ErrorClass>,

    /// Bumped on every resolution start; results carrying an older value
    /// are dropped
    generation: u64,
    in_flight: Option<JoinHandle<()>>,

    sink: Arc<dyn PlaybackSink>,
    pipeline: Arc<ResolutionPipeline>,
    events: EventBus,
    state_tx: watch::Sender<PlayerSnapshot>,
    writer: PersistenceWriter,
    commands: mpsc::WeakUnboundedSender<Command>,
}

impl PlaybackManager {
    pub fn new(parts: ManagerParts, config: &PlaybackConfig, shuffle: ShuffleSequencer) -> Self {
        let mut manager = Self {
            queue: Queue::new(),
            shuffle,
            breaker: CircuitBreaker::new(config.max_consecutive_failures),
            repeat: config.repeat,
            state: PlaybackState::Idle,
            is_playing: false,
            prepared: false,
            position_ms: 0,
            media_url: None,
            last_failure: None,
            generation: 0,
            in_flight: None,
            sink: parts.sink,
            pipeline: parts.pipeline,
            events: parts.events,
            state_tx: parts.state_tx,
            writer: parts.writer,
            commands: parts.commands,
        };

        if config.shuffle {
            manager.shuffle.enable(0, None);
        }
        manager
    }

    /// Dispatch one command
    pub fn handle(&mut self, command: Command) {
        match command {
            Command::PlayQueue { tracks, start } => self.play_queue(tracks, start),
            Command::PlayAtIndex(index) => self.play_at_index(index),
            Command::Next { force } => {
                self.next(force);
            }
            Command::Previous => self.previous(),
            Command::TogglePlayPause => self.toggle_play_pause(),
            Command::Play => self.play(),
            Command::Pause => self.pause(),
            Command::Stop => self.stop_and_clear(),
            Command::Seek(position_ms) => self.seek(position_ms),
            Command::SetShuffle(enabled) => self.set_shuffle(enabled),
            Command::CycleRepeat => self.cycle_repeat_mode(),
            Command::InsertNext(track) => self.insert_next(track),
            Command::AppendEnd(track) => self.append_end(track),
            Command::Remove(index) => self.remove(index),
            Command::MoveTrack { from, to } => self.move_track(from, to),
            Command::UpdateLyricOffset { key, offset_ms } => {
                self.update_lyric_offset(&key, offset_ms);
            }
            Command::ReplaceMetadata { key, track } => self.replace_track_metadata(&key, track),
            Command::Sink(event) => self.on_sink_event(event),
            Command::Resolved {
                generation,
                key,
                resolution,
            } => self.on_resolved(generation, &key, resolution),
            // Handled by the actor loop
            Command::Shutdown => {}
        }
    }

    /// Load a persisted queue without starting playback
    pub fn restore(&mut self, persisted: PersistedQueue) {
        if persisted.is_empty() {
            return;
        }

        self.queue.restore(persisted);
        self.shuffle.reset(self.queue.len(), self.queue.cursor());
        self.state = PlaybackState::Paused;
        info!(
            tracks = self.queue.len(),
            cursor = ?self.queue.cursor(),
            "Restored queue"
        );
        self.publish();
    }

    /// Abort background work and flush persistence
    pub async fn shutdown(mut self) {
        self.cancel_in_flight();
        self.writer.close().await;
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            state: self.state,
            current: self.queue.current().cloned(),
            queue: self.queue.shared(),
            cursor: self.queue.cursor(),
            is_playing: self.is_playing,
            prepared: self.prepared,
            position_ms: self.position_ms,
            shuffle: self.shuffle.is_enabled(),
            repeat: self.repeat,
            media_url: self.media_url.clone(),
            consecutive_failures: self.breaker.count(),
        }
    }

    pub fn publish(&self) {
        self.state_tx.send_replace(self.snapshot());
    }

    fn persist(&self) {
        self.writer.publish(self.queue.to_persisted());
    }

    // ===== Queue entry points =====

    fn play_queue(&mut self, tracks: Vec<Track>, start: usize) {
        if tracks.is_empty() {
            warn!("play_queue called with an empty list");
            return;
        }

        let clamped = start.min(tracks.len() - 1);
        if self.queue.is_from(&tracks)
            && self.queue.cursor() == Some(clamped)
            && matches!(self.state, PlaybackState::Playing | PlaybackState::Resolving)
        {
            debug!(index = clamped, "Already playing this position");
            return;
        }

        info!(tracks = tracks.len(), start = clamped, "Playing new queue");
        self.breaker.reset();
        self.last_failure = None;
        self.queue.replace(tracks, clamped);
        self.shuffle.reset(self.queue.len(), self.queue.cursor());
        self.persist();
        self.start_current();
    }

    fn play_at_index(&mut self, index: usize) {
        if index >= self.queue.len() {
            warn!(index, len = self.queue.len(), "play_at_index out of range");
            return;
        }

        self.shuffle.jump(self.queue.cursor(), index);
        self.move_to(index);
    }

    // ===== Navigation =====

    /// Move forward; returns `false` when there was nowhere to go
    fn next(&mut self, force: bool) -> bool {
        if self.queue.is_empty() {
            return false;
        }

        let len = self.queue.len();
        let cursor = self.queue.cursor();
        let wrap = force || self.repeat == RepeatMode::All;

        if self.shuffle.is_enabled() {
            return match self.shuffle.advance(cursor, len, wrap) {
                ShuffleStep::Moved(index) => {
                    self.move_to(index);
                    true
                }
                ShuffleStep::EndOfShuffle => {
                    debug!("Shuffle finished with repeat off, stopping");
                    self.stop_and_clear();
                    true
                }
            };
        }

        let target = match cursor {
            None => 0,
            Some(c) if c + 1 < len => c + 1,
            Some(_) if wrap => 0,
            Some(_) => {
                debug!("Already at the end of the queue");
                return false;
            }
        };
        self.move_to(target);
        true
    }

    fn previous(&mut self) {
        if self.queue.is_empty() {
            return;
        }

        let cursor = self.queue.cursor();
        if self.shuffle.is_enabled() {
            match self.shuffle.retreat(cursor) {
                Some(index) => self.move_to(index),
                None => debug!("No previous track in shuffle history"),
            }
            return;
        }

        match cursor {
            Some(c) if c > 0 => self.move_to(c - 1),
            _ if self.repeat == RepeatMode::All => self.move_to(self.queue.len() - 1),
            _ => debug!("Already at the start of the queue"),
        }
    }

    fn move_to(&mut self, index: usize) {
        if let Err(e) = self.queue.move_cursor(index) {
            warn!(error = %e, "Cannot move cursor");
            return;
        }
        self.start_current();
    }

    // ===== Transport =====

    fn toggle_play_pause(&mut self) {
        if self.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    fn play(&mut self) {
        if self.state == PlaybackState::Resolving {
            return;
        }

        if self.prepared {
            if let Err(e) = self.sink.play() {
                warn!(error = %e, "Sink refused to play");
                return;
            }
            self.is_playing = true;
            self.state = PlaybackState::Playing;
            self.publish();
        } else if self.queue.cursor().is_some() {
            self.start_current();
        } else if !self.queue.is_empty() {
            self.play_at_index(0);
        }
    }

    fn pause(&mut self) {
        match self.state {
            PlaybackState::Resolving => {
                debug!("Pausing before the track was ready");
                self.cancel_in_flight();
                self.state = PlaybackState::Paused;
            }
            PlaybackState::Playing | PlaybackState::Paused if self.prepared => {
                if let Err(e) = self.sink.pause() {
                    warn!(error = %e, "Sink refused to pause");
                }
                self.state = PlaybackState::Paused;
            }
            _ => return,
        }
        self.is_playing = false;
        self.publish();
    }

    fn seek(&mut self, position_ms: u64) {
        if !self.prepared {
            return;
        }
        if let Err(e) = self.sink.seek(position_ms) {
            warn!(error = %e, position_ms, "Sink refused to seek");
            return;
        }
        self.position_ms = position_ms;
        self.publish();
    }

    fn set_shuffle(&mut self, enabled: bool) {
        if self.shuffle.is_enabled() == enabled {
            return;
        }

        if enabled {
            self.shuffle.enable(self.queue.len(), self.queue.cursor());
        } else {
            self.shuffle.disable();
        }
        debug!(enabled, "Shuffle changed");
        self.publish();
    }

    fn cycle_repeat_mode(&mut self) {
        self.repeat = self.repeat.cycle();
        debug!(repeat = ?self.repeat, "Repeat mode changed");
        self.publish();
    }

    /// Cancel everything and forget the queue
    fn stop_and_clear(&mut self) {
        self.cancel_in_flight();
        self.generation += 1;
        if let Err(e) = self.sink.stop() {
            warn!(error = %e, "Sink refused to stop");
        }

        self.queue.clear();
        self.shuffle.clear();
        self.breaker.reset();
        self.last_failure = None;
        self.state = PlaybackState::Idle;
        self.is_playing = false;
        self.prepared = false;
        self.media_url = None;
        self.position_ms = 0;

        info!("Playback stopped, queue cleared");
        self.persist();
        self.publish();
    }

    // ===== Queue mutations =====

    fn insert_next(&mut self, track: Track) {
        if self.queue.is_empty() {
            self.play_queue(vec![track], 0);
            return;
        }

        let remap = self.queue.insert_next(track);
        self.shuffle.apply_remap(&remap, self.queue.cursor());
        self.after_mutation();
    }

    fn append_end(&mut self, track: Track) {
        if self.queue.is_empty() {
            self.play_queue(vec![track], 0);
            return;
        }

        let remap = self.queue.append_end(track);
        self.shuffle.apply_remap(&remap, self.queue.cursor());
        self.after_mutation();
    }

    fn remove(&mut self, index: usize) {
        let was_current = self.queue.cursor() == Some(index);
        let remap = match self.queue.remove(index) {
            Ok((removed, remap)) => {
                debug!(index, track_id = removed.id, "Removed track");
                remap
            }
            Err(e) => {
                warn!(error = %e, "Cannot remove track");
                return;
            }
        };

        if self.queue.is_empty() {
            self.stop_and_clear();
            return;
        }

        self.shuffle.apply_remap(&remap, self.queue.cursor());

        if !was_current {
            self.after_mutation();
            return;
        }

        self.persist();
        if matches!(self.state, PlaybackState::Playing | PlaybackState::Resolving) {
            self.start_current();
        } else {
            self.drop_prepared();
            self.publish();
        }
    }

    fn move_track(&mut self, from: usize, to: usize) {
        match self.queue.move_track(from, to) {
            Ok(remap) => {
                self.shuffle.apply_remap(&remap, self.queue.cursor());
                self.after_mutation();
            }
            Err(e) => warn!(error = %e, "Cannot move track"),
        }
    }

    fn update_lyric_offset(&mut self, key: &TrackKey, offset_ms: i64) {
        if self
            .queue
            .update(key, |track| track.user_lyric_offset_ms = offset_ms)
            .is_none()
        {
            debug!(track = %key, "Lyric offset update for a track not in the queue");
            return;
        }
        self.persist();
        self.publish();
    }

    fn replace_track_metadata(&mut self, key: &TrackKey, replacement: Track) {
        let updated = self.queue.update(key, |track| {
            track.name = replacement.name;
            track.artist = replacement.artist;
            track.cover_url = replacement.cover_url;
            track.matched_lyric = replacement.matched_lyric;
        });
        if updated.is_none() {
            debug!(track = %key, "Metadata update for a track not in the queue");
            return;
        }
        self.persist();
        self.publish();
    }

    /// Persist and publish after a structural edit
    ///
    /// An in-flight resolution was started for an index that may have moved,
    /// so it is restarted for the track now under the cursor.
    fn after_mutation(&mut self) {
        self.persist();
        if self.state == PlaybackState::Resolving {
            self.start_current();
        } else {
            self.publish();
        }
    }

    // ===== Resolution lifecycle =====

    fn start_current(&mut self) {
        let Some(track) = self.queue.current().cloned() else {
            warn!("No track under the cursor");
            return;
        };

        if self.breaker.is_open() {
            self.trip_breaker();
            return;
        }

        self.cancel_in_flight();
        self.generation += 1;
        let generation = self.generation;

        self.drop_prepared();
        self.state = PlaybackState::Resolving;

        debug!(
            track_id = track.id,
            discriminator = %track.discriminator,
            index = ?self.queue.cursor(),
            generation,
            "Dispatching resolution"
        );

        let pipeline = Arc::clone(&self.pipeline);
        let commands = self.commands.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let resolution = pipeline.resolve(&track).await;
            if let Some(tx) = commands.upgrade() {
                // Actor gone means nobody cares about the result
                let _ = tx.send(Command::Resolved {
                    generation,
                    key: track.key(),
                    resolution,
                });
            }
        }));

        self.persist();
        self.publish();
    }

    fn on_resolved(&mut self, generation: u64, key: &TrackKey, resolution: Resolution) {
        if generation != self.generation || self.state != PlaybackState::Resolving {
            debug!(generation, current = self.generation, track = %key, "Discarding stale resolution");
            return;
        }
        self.in_flight = None;

        match resolution {
            Resolution::Success { url, cache_key, .. } => {
                self.breaker.record_success();
                self.last_failure = None;

                if let Err(e) = self.sink.prepare(&url, &cache_key) {
                    self.on_sink_failure(None, &e.to_string());
                    return;
                }
                self.prepared = true;
                self.media_url = Some(url);

                if let Err(e) = self.sink.play() {
                    self.on_sink_failure(None, &e.to_string());
                    return;
                }
                self.is_playing = true;
                self.state = PlaybackState::Playing;
                debug!(track = %key, cache_key = %cache_key, "Track prepared");
                self.persist();
                self.publish();
            }
            Resolution::RequiresAuthentication => {
                warn!(track = %key, "Track requires login, skipping");
                self.events.emit(PlayerEvent::login_prompt(LOGIN_PROMPT));
                self.skip_failed();
            }
            Resolution::Failure { class, detail } => {
                self.last_failure = Some(class);
                let opened = self.breaker.record_failure();
                warn!(
                    track = %key,
                    class = ?class,
                    failures = self.breaker.count(),
                    detail = %detail,
                    "Resolution failed"
                );
                if opened {
                    self.trip_breaker();
                } else {
                    self.skip_failed();
                }
            }
        }
    }

    /// Stop everything after too many consecutive failures
    fn trip_breaker(&mut self) {
        let class = self.last_failure.unwrap_or(ErrorClass::Other);
        error!(
            failures = self.breaker.count(),
            class = ?class,
            "Too many consecutive failures, stopping playback"
        );
        self.events.emit(PlayerEvent::error(format!(
            "Several tracks could not be played, playback stopped. {}",
            class.describe()
        )));
        self.stop_and_clear();
    }

    /// Auto-advance past a track that could not be played
    fn skip_failed(&mut self) {
        if !self.next(false) {
            self.state = PlaybackState::Paused;
            self.publish();
        }
    }

    fn cancel_in_flight(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }

    fn drop_prepared(&mut self) {
        if self.prepared {
            if let Err(e) = self.sink.stop() {
                warn!(error = %e, "Sink refused to stop");
            }
        }
        self.prepared = false;
        self.is_playing = false;
        self.media_url = None;
        self.position_ms = 0;
    }

    // ===== Sink feedback =====

    fn on_sink_event(&mut self, event: SinkEvent) {
        match event {
            SinkEvent::Position { position_ms } => {
                if self.prepared {
                    self.position_ms = position_ms;
                    self.publish();
                }
            }
            SinkEvent::PlayingChanged(playing) => {
                // The engine may pause on its own (audio focus loss)
                if self.prepared && self.is_playing != playing {
                    self.is_playing = playing;
                    self.state = if playing {
                        PlaybackState::Playing
                    } else {
                        PlaybackState::Paused
                    };
                    self.publish();
                }
            }
            SinkEvent::Ended => {
                if self.prepared {
                    self.on_track_ended();
                } else {
                    debug!("Ignoring end of a superseded item");
                }
            }
            SinkEvent::Error { code, message } => {
                if self.prepared {
                    self.on_sink_failure(code.as_deref(), &message);
                } else {
                    debug!(%message, "Ignoring error of a superseded item");
                }
            }
        }
    }

    fn on_track_ended(&mut self) {
        self.position_ms = 0;
        match self.repeat {
            RepeatMode::One => self.start_current(),
            RepeatMode::All => {
                self.next(true);
            }
            RepeatMode::Off => {
                let more = if self.shuffle.is_enabled() {
                    self.shuffle.has_pending()
                } else {
                    self.queue
                        .cursor()
                        .is_some_and(|c| c + 1 < self.queue.len())
                };

                if more {
                    self.next(false);
                } else {
                    debug!("Reached the end of the queue");
                    self.stop_and_clear();
                }
            }
        }
    }

    /// The sink failed to render the current item
    fn on_sink_failure(&mut self, code: Option<&str>, message: &str) {
        let (class, text) = describe_sink_error(code, message);
        let opened = self.breaker.record_failure();
        self.last_failure = Some(class);
        warn!(code = ?code, %message, class = ?class, failures = self.breaker.count(), "Sink error");

        if opened {
            self.trip_breaker();
            return;
        }

        self.events.emit(PlayerEvent::error(text));

        if self.prepared {
            if let Err(e) = self.sink.pause() {
                warn!(error = %e, "Sink refused to pause");
            }
        }
        // The failed item has to be resolved again before it can play
        self.prepared = false;
        self.is_playing = false;
        self.state = PlaybackState::Paused;
        self.publish();
    }
}

/// Classify a sink failure and build the user-facing message
pub(crate) fn describe_sink_error(code: Option<&str>, message: &str) -> (ErrorClass, String) {
    let mut class = ErrorClass::classify_message(message);
    if class == ErrorClass::Other {
        let network_code = code.is_some_and(|c| {
            let c = c.to_ascii_uppercase();
            c.contains("NETWORK") || c.contains("CONNECTION")
        });
        if network_code {
            class = ErrorClass::NetworkUnreachable;
        }
    }

    let text = match class {
        ErrorClass::Other => format!("{}: {}", class.describe(), code.unwrap_or(message)),
        _ => class.describe().to_string(),
    };
    (class, text)
}
