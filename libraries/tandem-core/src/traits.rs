/// Collaborator traits consumed by the playback core
use crate::error::Result;
use crate::types::{BackendKind, PersistedQueue, QualityPreference, Resolution, Track};
use async_trait::async_trait;
use std::path::PathBuf;

/// Lookup for tracks already downloaded to the device
#[async_trait]
pub trait LocalCache: Send + Sync {
    /// Return the local file for `track`, if one exists
    async fn locate(&self, track: &Track) -> Option<PathBuf>;
}

/// Backend-specific stream resolver
///
/// Implementations apply their own quality ladder and map the backend's
/// "login required" answer to [`Resolution::RequiresAuthentication`].
/// Transport-level problems are returned as `Err` and classified by the
/// caller.
#[async_trait]
pub trait BackendResolver: Send + Sync {
    /// Backend family this resolver serves
    fn backend(&self) -> BackendKind;

    /// Resolve `track` into a playable stream
    ///
    /// # Errors
    /// Returns an error when the backend could not be reached or answered
    /// with something unparseable
    async fn resolve(&self, track: &Track, quality: &QualityPreference) -> Result<Resolution>;
}

/// Media engine that renders a URL
///
/// At most one item is prepared at a time; preparing a new item supersedes
/// the previous one. The sink never touches queue state; it reports back
/// through [`SinkEvent`]s.
pub trait PlaybackSink: Send + Sync {
    /// Load `url` as the current media item
    ///
    /// # Errors
    /// Returns an error if the engine rejects the item
    fn prepare(&self, url: &str, cache_key: &str) -> Result<()>;

    /// Start or resume output
    fn play(&self) -> Result<()>;

    /// Pause output
    fn pause(&self) -> Result<()>;

    /// Seek within the current item
    fn seek(&self, position_ms: u64) -> Result<()>;

    /// Stop and drop the current item
    fn stop(&self) -> Result<()>;
}

/// Events reported by a [`PlaybackSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    /// Periodic position update
    Position { position_ms: u64 },

    /// The engine started or stopped producing output
    PlayingChanged(bool),

    /// The current item played to the end
    Ended,

    /// The engine failed to render the current item
    Error { code: Option<String>, message: String },
}

/// Durable storage for the queue snapshot
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Write `snapshot`, replacing any previous one
    ///
    /// Saving an empty snapshot deletes the stored state.
    async fn save(&self, snapshot: &PersistedQueue) -> Result<()>;

    /// Read the stored snapshot, `None` if nothing was saved
    async fn load(&self) -> Result<Option<PersistedQueue>>;
}
