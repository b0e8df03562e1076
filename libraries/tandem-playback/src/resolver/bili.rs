//! Bilibili audio stream resolution
//!
//! Videos are played as audio: the resolver looks up the video, picks a
//! page (cid) and selects one of the DASH audio streams according to the
//! preferred [`BiliQuality`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;
use tandem_core::{
    bili_discriminator, cache_key, Backend, BackendKind, BackendResolver, BiliQuality,
    ErrorClass, QualityPreference, Resolution, Result, Track,
};
use tracing::debug;

/// Play-url code for "not logged in"
pub const CODE_NOT_LOGGED_IN: i64 = -101;

/// Basic video metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiliVideoInfo {
    pub bvid: String,
    pub aid: i64,
    pub title: String,
    pub owner_name: String,
    pub pages: Vec<BiliPage>,
}

/// One part of a multi-part video
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiliPage {
    pub cid: u64,
    pub part: String,
    pub duration_sec: u64,
}

/// Parsed play-url response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiliPlayUrl {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub streams: Vec<BiliAudioStream>,
}

/// A DASH audio stream offered for a page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiliAudioStream {
    pub id: Option<u32>,
    pub mime_type: String,
    pub bitrate_kbps: u32,

    /// `dolby` or `hires` for the special tracks
    pub quality_tag: Option<String>,
    pub url: String,
}

/// Client for the Bilibili video and play-url endpoints
#[async_trait]
pub trait BiliApi: Send + Sync {
    /// Fetch video metadata by avid
    async fn video_info(&self, avid: i64) -> Result<BiliVideoInfo>;

    /// Fetch the audio streams of one page
    async fn audio_streams(&self, bvid: &str, cid: u64) -> Result<BiliPlayUrl>;
}

/// Pick a stream for `preferred`, degrading through lower tiers
///
/// Tag tiers match on the stream tag. Bitrate tiers take the lowest bitrate
/// that still meets the tier minimum. With no match the highest bitrate wins.
pub fn select_stream_by_preference(
    available: &[BiliAudioStream],
    preferred: BiliQuality,
) -> Option<&BiliAudioStream> {
    let mut sorted: Vec<&BiliAudioStream> = available.iter().collect();
    sorted.sort_by_key(|s| Reverse(s.bitrate_kbps));

    for tier in preferred.degrade_chain() {
        let hit = match tier.tag() {
            Some(tag) => sorted
                .iter()
                .find(|s| s.quality_tag.as_deref() == Some(tag))
                .copied(),
            None => sorted
                .iter()
                .rev()
                .find(|s| s.bitrate_kbps >= tier.min_bitrate_kbps())
                .copied(),
        };
        if hit.is_some() {
            return hit;
        }
    }

    sorted.first().copied()
}

/// One track per page of a multi-part video
pub fn tracks_from_video_parts(info: &BiliVideoInfo, cover_url: &str) -> Vec<Track> {
    info.pages
        .iter()
        .map(|page| {
            Track::new(
                info.aid,
                page.part.clone(),
                info.owner_name.clone(),
                bili_discriminator(Some(page.cid)),
            )
            .with_duration(Duration::from_secs(page.duration_sec))
            .with_cover(cover_url)
        })
        .collect()
}

/// Resolves Bilibili tracks to an audio stream
pub struct BiliResolver {
    api: Arc<dyn BiliApi>,
}

impl BiliResolver {
    pub fn new(api: Arc<dyn BiliApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl BackendResolver for BiliResolver {
    fn backend(&self) -> BackendKind {
        BackendKind::Bilibili
    }

    async fn resolve(&self, track: &Track, quality: &QualityPreference) -> Result<Resolution> {
        let known_cid = match track.backend() {
            Backend::Bilibili { cid } => cid,
            Backend::Netease => None,
        };

        // bvid is only available from the video info
        let info = self.api.video_info(track.id).await?;
        let Some(cid) = known_cid.or_else(|| info.pages.first().map(|p| p.cid)) else {
            return Ok(Resolution::failure(
                ErrorClass::Other,
                format!("Video av{} has no playable parts", track.id),
            ));
        };

        let play = self.api.audio_streams(&info.bvid, cid).await?;
        if play.code == CODE_NOT_LOGGED_IN {
            debug!(avid = track.id, cid, "Bilibili requires login");
            return Ok(Resolution::RequiresAuthentication);
        }
        if play.code != 0 {
            return Ok(Resolution::failure(
                ErrorClass::Other,
                format!("Bilibili answered code {}: {}", play.code, play.message),
            ));
        }

        let Some(stream) = select_stream_by_preference(&play.streams, quality.bili) else {
            return Ok(Resolution::failure(
                ErrorClass::InvalidAddress,
                format!("No audio stream for av{} cid {cid}", track.id),
            ));
        };

        debug!(
            avid = track.id,
            cid,
            bitrate_kbps = stream.bitrate_kbps,
            tag = ?stream.quality_tag,
            "Selected Bilibili audio stream"
        );

        Ok(Resolution::Success {
            url: stream.url.clone(),
            mime: Some(stream.mime_type.clone()).filter(|m| !m.is_empty()),
            cache_key: cache_key(track, quality),
        })
    }
}
