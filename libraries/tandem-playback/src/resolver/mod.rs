//! Track to stream resolution
//!
//! The pipeline checks local downloads first, then hands the track to the
//! resolver registered for its backend. Backend-specific quality ladders
//! live in the resolver modules.

pub mod bili;
pub mod local;
pub mod netease;

use std::collections::HashMap;
use std::sync::Arc;
use tandem_core::{
    BackendKind, BackendResolver, ErrorClass, LocalCache, QualityPreference, Resolution,
    TandemError, Track,
};
use tracing::{debug, warn};

pub use bili::{
    select_stream_by_preference, tracks_from_video_parts, BiliApi, BiliAudioStream, BiliPage,
    BiliPlayUrl, BiliResolver, BiliVideoInfo,
};
pub use local::{sanitize_file_name, DownloadDirCache};
pub use netease::{NeteaseApi, NeteaseResolver, NeteaseSongUrl, NeteaseUrlEntry};

/// Cache-then-backend resolution
#[derive(Clone)]
pub struct ResolutionPipeline {
    cache: Arc<dyn LocalCache>,
    resolvers: HashMap<BackendKind, Arc<dyn BackendResolver>>,
    quality: QualityPreference,
}

impl ResolutionPipeline {
    pub fn new(
        cache: Arc<dyn LocalCache>,
        resolvers: impl IntoIterator<Item = Arc<dyn BackendResolver>>,
        quality: QualityPreference,
    ) -> Self {
        let resolvers = resolvers
            .into_iter()
            .map(|resolver| (resolver.backend(), resolver))
            .collect();

        Self {
            cache,
            resolvers,
            quality,
        }
    }

    pub fn quality(&self) -> QualityPreference {
        self.quality
    }

    /// Turn `track` into a playable stream
    ///
    /// Never fails: transport errors become [`Resolution::Failure`] with a
    /// classified [`ErrorClass`].
    pub async fn resolve(&self, track: &Track) -> Resolution {
        let cache_key = tandem_core::cache_key(track, &self.quality);

        if let Some(path) = self.cache.locate(track).await {
            debug!(track_id = track.id, path = %path.display(), "Playing local download");
            return Resolution::Success {
                url: format!("file://{}", path.display()),
                mime: None,
                cache_key,
            };
        }

        let kind = track.backend().kind();
        let Some(resolver) = self.resolvers.get(&kind) else {
            warn!(track_id = track.id, backend = %kind, "No resolver registered");
            return Resolution::failure(ErrorClass::Other, format!("No resolver for {kind}"));
        };

        match resolver.resolve(track, &self.quality).await {
            Ok(resolution) => resolution,
            Err(TandemError::AuthRequired) => Resolution::RequiresAuthentication,
            Err(e) => {
                let class = ErrorClass::classify(&e);
                debug!(track_id = track.id, backend = %kind, error = %e, ?class, "Resolver failed");
                Resolution::failure(class, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use std::path::PathBuf;
    use tandem_core::Result;

    mock! {
        Cache {}

        #[async_trait]
        impl LocalCache for Cache {
            async fn locate(&self, track: &Track) -> Option<PathBuf>;
        }
    }

    struct Fixed {
        kind: BackendKind,
        outcome: fn() -> Result<Resolution>,
    }

    #[async_trait]
    impl BackendResolver for Fixed {
        fn backend(&self) -> BackendKind {
            self.kind
        }

        async fn resolve(&self, _track: &Track, _quality: &QualityPreference) -> Result<Resolution> {
            (self.outcome)()
        }
    }

    fn no_cache() -> Arc<dyn LocalCache> {
        let mut cache = MockCache::new();
        cache.expect_locate().returning(|_| None);
        Arc::new(cache)
    }

    fn netease(outcome: fn() -> Result<Resolution>) -> Arc<dyn BackendResolver> {
        Arc::new(Fixed {
            kind: BackendKind::Netease,
            outcome,
        })
    }

    fn song() -> Track {
        Track::new(1, "Song", "Artist", "Album")
    }

    #[tokio::test]
    async fn local_download_wins() {
        let mut cache = MockCache::new();
        cache
            .expect_locate()
            .returning(|_| Some(PathBuf::from("/music/Artist - Song.flac")));

        let pipeline = ResolutionPipeline::new(
            Arc::new(cache),
            [netease(|| panic!("backend must not be called"))],
            QualityPreference::default(),
        );

        match pipeline.resolve(&song()).await {
            Resolution::Success { url, cache_key, .. } => {
                assert_eq!(url, "file:///music/Artist - Song.flac");
                assert_eq!(cache_key, "netease-1-exhigh");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_error_is_classified() {
        let pipeline = ResolutionPipeline::new(
            no_cache(),
            [netease(|| Err(TandemError::network("connection refused")))],
            QualityPreference::default(),
        );

        assert!(matches!(
            pipeline.resolve(&song()).await,
            Resolution::Failure {
                class: ErrorClass::NetworkUnreachable,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn auth_error_maps_to_login() {
        let pipeline = ResolutionPipeline::new(
            no_cache(),
            [netease(|| Err(TandemError::AuthRequired))],
            QualityPreference::default(),
        );
        assert_eq!(pipeline.resolve(&song()).await, Resolution::RequiresAuthentication);
    }

    #[tokio::test]
    async fn missing_resolver_fails() {
        let pipeline = ResolutionPipeline::new(
            no_cache(),
            [netease(|| Ok(Resolution::RequiresAuthentication))],
            QualityPreference::default(),
        );
        let bili = Track::new(2, "Video", "Uploader", "Bilibili");
        assert!(matches!(
            pipeline.resolve(&bili).await,
            Resolution::Failure {
                class: ErrorClass::Other,
                ..
            }
        ));
    }
}
