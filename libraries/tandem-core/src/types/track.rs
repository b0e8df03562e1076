/// Track domain type
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Discriminator prefix carried by every Bilibili-sourced track
pub const BILI_SOURCE_TAG: &str = "Bilibili";

/// A playable item in the queue
///
/// The `discriminator` tells which backend the track came from. Netease
/// tracks carry their album name there; Bilibili tracks carry
/// `"Bilibili"` or `"Bilibili|<cid>"` when a specific video part is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Backend-specific numeric id (Netease song id or Bilibili avid)
    pub id: i64,

    /// Display name
    pub name: String,

    /// Artist or uploader
    pub artist: String,

    /// Backend discriminator (see type docs)
    pub discriminator: String,

    /// Track duration in milliseconds
    pub duration_ms: u64,

    /// Cover art reference
    #[serde(default)]
    pub cover_url: Option<String>,

    /// Lyric payload attached ahead of time (LRC text)
    #[serde(default)]
    pub matched_lyric: Option<String>,

    /// User-adjusted lyric offset in milliseconds
    #[serde(default)]
    pub user_lyric_offset_ms: i64,
}

impl Track {
    /// Create a track with minimal metadata
    pub fn new(
        id: i64,
        name: impl Into<String>,
        artist: impl Into<String>,
        discriminator: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            artist: artist.into(),
            discriminator: discriminator.into(),
            duration_ms: 0,
            cover_url: None,
            matched_lyric: None,
            user_lyric_offset_ms: 0,
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    /// Set the cover reference
    pub fn with_cover(mut self, cover_url: impl Into<String>) -> Self {
        self.cover_url = Some(cover_url.into());
        self
    }

    /// Get the track duration as a Duration
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Identity used for queue membership
    pub fn key(&self) -> TrackKey {
        TrackKey {
            id: self.id,
            discriminator: self.discriminator.clone(),
        }
    }

    /// Whether this track matches the given key
    pub fn matches(&self, key: &TrackKey) -> bool {
        self.id == key.id && self.discriminator == key.discriminator
    }

    /// Parse the discriminator into a backend selector
    pub fn backend(&self) -> Backend {
        Backend::parse(&self.discriminator)
    }
}

/// Queue-membership identity: (id, discriminator)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackKey {
    pub id: i64,
    pub discriminator: String,
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.discriminator)
    }
}

/// Which streaming backend a track resolves through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Music-streaming service
    Netease,

    /// Video platform used as an audio source
    Bilibili {
        /// Sub-resource (video part) id, when known
        cid: Option<u64>,
    },
}

impl Backend {
    /// Parse a discriminator string
    ///
    /// Anything not tagged as Bilibili is treated as Netease. A malformed or
    /// zero cid is treated as missing.
    pub fn parse(discriminator: &str) -> Self {
        if !discriminator.starts_with(BILI_SOURCE_TAG) {
            return Backend::Netease;
        }

        let cid = discriminator
            .split('|')
            .nth(1)
            .and_then(|part| part.trim().parse::<u64>().ok())
            .filter(|cid| *cid != 0);

        Backend::Bilibili { cid }
    }

    /// Backend family, ignoring sub-resource ids
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Netease => BackendKind::Netease,
            Backend::Bilibili { .. } => BackendKind::Bilibili,
        }
    }
}

/// Backend family used to select a resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Netease,
    Bilibili,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Netease => write!(f, "netease"),
            BackendKind::Bilibili => write!(f, "bilibili"),
        }
    }
}

/// Build the discriminator for a Bilibili video part
pub fn bili_discriminator(cid: Option<u64>) -> String {
    match cid {
        Some(cid) => format!("{BILI_SOURCE_TAG}|{cid}"),
        None => BILI_SOURCE_TAG.to_string(),
    }
}
