//! Player lifecycle and the public handle
//!
//! [`Player::start`] wires the collaborators together, restores the last
//! queue and spawns the actor task that owns the [`PlaybackManager`].
//! Callers talk to it through cloneable [`PlayerHandle`]s; every call is a
//! message, so mutations are applied strictly in the order they were made.

use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, Result};
use crate::events::{EventBus, PlayerEvent};
use crate::manager::{Command, ManagerParts, PlaybackManager};
use crate::persistence::PersistenceWriter;
use crate::resolver::{tracks_from_video_parts, BiliVideoInfo, ResolutionPipeline};
use crate::shuffle::ShuffleSequencer;
use crate::types::PlayerSnapshot;
use std::sync::Arc;
use tandem_core::{
    BackendResolver, LocalCache, PersistenceStore, PlaybackSink, SinkEvent, Track, TrackKey,
};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// External collaborators of the player
pub struct PlayerDeps {
    pub sink: Arc<dyn PlaybackSink>,
    pub cache: Arc<dyn LocalCache>,
    pub resolvers: Vec<Arc<dyn BackendResolver>>,
    pub store: Arc<dyn PersistenceStore>,

    /// Seed for shuffle picks; `None` seeds from the OS
    pub shuffle_seed: Option<u64>,
}

/// Running player
///
/// Dropping the player and every handle also stops the actor, but only
/// [`Player::shutdown`] waits for the last snapshot to be written.
pub struct Player {
    handle: PlayerHandle,
    actor: JoinHandle<()>,
}

impl Player {
    /// Start the player
    ///
    /// Loads the persisted queue once. A stored queue is restored paused,
    /// without resolving anything; a missing or unreadable one starts idle.
    pub async fn start(deps: PlayerDeps, config: PlaybackConfig) -> Result<Self> {
        config.validate()?;

        let restored = match deps.store.load().await {
            Ok(restored) => restored,
            Err(e) => {
                warn!(error = %e, "Could not load persisted queue, starting empty");
                None
            }
        };

        let (commands, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(PlayerSnapshot::default());
        let events = EventBus::new(config.event_capacity);

        let pipeline = Arc::new(ResolutionPipeline::new(
            deps.cache,
            deps.resolvers,
            config.quality(),
        ));
        let shuffle = match deps.shuffle_seed {
            Some(seed) => ShuffleSequencer::with_seed(seed),
            None => ShuffleSequencer::new(),
        };

        let parts = ManagerParts {
            sink: deps.sink,
            pipeline,
            events: events.clone(),
            state_tx,
            writer: PersistenceWriter::spawn(deps.store),
            commands: commands.downgrade(),
        };
        let mut manager = PlaybackManager::new(parts, &config, shuffle);
        if let Some(persisted) = restored {
            manager.restore(persisted);
        }
        manager.publish();

        let actor = tokio::spawn(run(manager, rx));
        info!(
            netease = %config.netease_quality,
            bili = %config.bili_quality,
            max_failures = config.max_consecutive_failures,
            "Player started"
        );

        Ok(Self {
            handle: PlayerHandle {
                commands,
                state: state_rx,
                events,
            },
            actor,
        })
    }

    /// New handle to the running player
    pub fn handle(&self) -> PlayerHandle {
        self.handle.clone()
    }

    /// Stop the actor and flush pending persistence
    pub async fn shutdown(self) {
        let Self { handle, actor } = self;
        // Already stopped when every handle was dropped
        let _ = handle.commands.send(Command::Shutdown);
        drop(handle);

        if let Err(e) = actor.await {
            warn!(error = %e, "Player actor ended abnormally");
        }
    }
}

async fn run(mut manager: PlaybackManager, mut rx: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = rx.recv().await {
        if matches!(command, Command::Shutdown) {
            break;
        }
        manager.handle(command);
    }

    manager.shutdown().await;
    info!("Player stopped");
}

/// Cloneable control surface of a running [`Player`]
///
/// Commands are fire-and-forget; the outcome is observed through
/// [`PlayerHandle::watch_state`] and [`PlayerHandle::subscribe_events`].
#[derive(Clone)]
pub struct PlayerHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<PlayerSnapshot>,
    events: EventBus,
}

impl PlayerHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| PlaybackError::NotRunning)
    }

    /// Replace the queue and start playing at `start` (clamped)
    pub fn play_queue(&self, tracks: Vec<Track>, start: usize) -> Result<()> {
        self.send(Command::PlayQueue { tracks, start })
    }

    /// Play every part of a Bilibili video, starting at `start`
    pub fn play_video_parts(&self, info: &BiliVideoInfo, start: usize, cover_url: &str) -> Result<()> {
        self.play_queue(tracks_from_video_parts(info, cover_url), start)
    }

    /// Jump to a queue position
    pub fn play_at_index(&self, index: usize) -> Result<()> {
        self.send(Command::PlayAtIndex(index))
    }

    /// Skip forward; `force` wraps around even with repeat off
    pub fn play_next(&self, force: bool) -> Result<()> {
        self.send(Command::Next { force })
    }

    pub fn play_previous(&self) -> Result<()> {
        self.send(Command::Previous)
    }

    pub fn toggle_play_pause(&self) -> Result<()> {
        self.send(Command::TogglePlayPause)
    }

    /// Resume, or start the cursor (or the first track) if nothing is
    /// prepared
    pub fn play(&self) -> Result<()> {
        self.send(Command::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    /// Stop playback and clear the queue
    pub fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }

    pub fn seek(&self, position_ms: u64) -> Result<()> {
        self.send(Command::Seek(position_ms))
    }

    pub fn set_shuffle(&self, enabled: bool) -> Result<()> {
        self.send(Command::SetShuffle(enabled))
    }

    /// Off -> All -> One -> Off
    pub fn cycle_repeat_mode(&self) -> Result<()> {
        self.send(Command::CycleRepeat)
    }

    pub fn insert_next(&self, track: Track) -> Result<()> {
        self.send(Command::InsertNext(track))
    }

    pub fn append_end(&self, track: Track) -> Result<()> {
        self.send(Command::AppendEnd(track))
    }

    pub fn remove(&self, index: usize) -> Result<()> {
        self.send(Command::Remove(index))
    }

    pub fn move_track(&self, from: usize, to: usize) -> Result<()> {
        self.send(Command::MoveTrack { from, to })
    }

    pub fn update_lyric_offset(&self, key: TrackKey, offset_ms: i64) -> Result<()> {
        self.send(Command::UpdateLyricOffset { key, offset_ms })
    }

    /// Replace display metadata (name, artist, cover, lyric) of a queued
    /// track, keeping its identity
    pub fn replace_track_metadata(&self, key: TrackKey, track: Track) -> Result<()> {
        self.send(Command::ReplaceMetadata { key, track })
    }

    /// Feed a sink event into the player
    pub fn report(&self, event: SinkEvent) -> Result<()> {
        self.send(Command::Sink(event))
    }

    /// Latest published state
    pub fn snapshot(&self) -> PlayerSnapshot {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<PlayerSnapshot> {
        self.state.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }
}
