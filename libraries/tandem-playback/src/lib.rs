//! Tandem Player - Playback Orchestration
//!
//! Turns a queue of tracks from Netease, Bilibili and local downloads into
//! continuous playback.
//!
//! This crate provides:
//! - Queue store with dedup-on-insert and stable cursor
//! - Shuffle sequencing with back/forward history and a random bag
//! - Repeat modes (Off, All, One)
//! - Resolution pipeline: local download, then backend resolver with its
//!   quality ladder
//! - Cancellation of stale resolutions when the user skips quickly
//! - Consecutive-failure circuit breaker
//! - Queue persistence and restore
//!
//! # Architecture
//!
//! A single actor task owns all playback state. [`PlayerHandle`] methods
//! enqueue commands; resolution runs in spawned tasks and reports back with a
//! generation token so late results for skipped tracks are dropped. State is
//! published on a `watch` channel ([`PlayerSnapshot`]), user-facing side
//! effects on a `broadcast` channel ([`PlayerEvent`]).
//!
//! The media engine, backend HTTP clients and storage are supplied through
//! the traits in `tandem-core` and the API traits in [`resolver`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tandem_core::{PlaybackSink, Result, SinkEvent, Track};
//! use tandem_playback::resolver::DownloadDirCache;
//! use tandem_playback::{JsonFileStore, PlaybackConfig, Player, PlayerDeps};
//!
//! struct Engine;
//!
//! impl PlaybackSink for Engine {
//!     fn prepare(&self, _url: &str, _cache_key: &str) -> Result<()> { Ok(()) }
//!     fn play(&self) -> Result<()> { Ok(()) }
//!     fn pause(&self) -> Result<()> { Ok(()) }
//!     fn seek(&self, _position_ms: u64) -> Result<()> { Ok(()) }
//!     fn stop(&self) -> Result<()> { Ok(()) }
//! }
//!
//! # async fn example() -> tandem_playback::Result<()> {
//! let config = PlaybackConfig::load(None)?;
//! let player = Player::start(
//!     PlayerDeps {
//!         sink: Arc::new(Engine),
//!         cache: Arc::new(DownloadDirCache::new(&config.download_dir)),
//!         resolvers: Vec::new(),
//!         store: Arc::new(JsonFileStore::new(&config.state_file)),
//!         shuffle_seed: None,
//!     },
//!     config,
//! )
//! .await?;
//!
//! let handle = player.handle();
//! handle.play_queue(vec![Track::new(33894312, "Song", "Artist", "Album")], 0)?;
//! handle.report(SinkEvent::Ended)?;
//!
//! player.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod breaker;
pub mod config;
mod error;
mod events;
mod manager;
mod persistence;
mod player;
pub mod queue;
pub mod resolver;
pub mod shuffle;
pub mod types;

// Public exports
pub use breaker::CircuitBreaker;
pub use config::PlaybackConfig;
pub use error::{PlaybackError, Result};
pub use events::{EventBus, PlayerEvent};
pub use persistence::{JsonFileStore, PersistenceWriter};
pub use player::{Player, PlayerDeps, PlayerHandle};
pub use queue::{IndexRemap, Queue};
pub use resolver::ResolutionPipeline;
pub use shuffle::{ShuffleSequencer, ShuffleStep};
pub use types::{PlaybackState, PlayerSnapshot, RepeatMode};
