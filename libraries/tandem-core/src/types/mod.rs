mod quality;
mod resolution;
mod snapshot;
mod track;

pub use quality::{BiliQuality, NeteaseQuality, QualityPreference};
pub use resolution::{cache_key, ErrorClass, Resolution};
pub use snapshot::PersistedQueue;
pub use track::{bili_discriminator, Backend, BackendKind, Track, TrackKey, BILI_SOURCE_TAG};
