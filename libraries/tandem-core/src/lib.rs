//! Tandem Player Core
//!
//! Platform-agnostic types, collaborator traits, and error handling shared
//! by the playback crates.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `TrackKey`, quality tiers, `Resolution`,
//!   `PersistedQueue`
//! - **Collaborator Traits**: `LocalCache`, `BackendResolver`,
//!   `PlaybackSink`, `PersistenceStore`
//! - **Error Handling**: Unified `TandemError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use tandem_core::{Backend, Track};
//! use std::time::Duration;
//!
//! let song = Track::new(33894312, "Song", "Artist", "Album")
//!     .with_duration(Duration::from_secs(215));
//! assert_eq!(song.backend(), Backend::Netease);
//!
//! let part = Track::new(170001, "Part 2", "Uploader", "Bilibili|279786");
//! assert_eq!(part.backend(), Backend::Bilibili { cid: Some(279786) });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{Result, TandemError};
pub use traits::{BackendResolver, LocalCache, PersistenceStore, PlaybackSink, SinkEvent};

pub use types::{
    bili_discriminator, cache_key, Backend, BackendKind, BiliQuality, ErrorClass, NeteaseQuality,
    PersistedQueue, QualityPreference, Resolution, Track, TrackKey, BILI_SOURCE_TAG,
};
