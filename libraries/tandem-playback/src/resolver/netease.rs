//! Netease stream resolution

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tandem_core::{
    cache_key, BackendKind, BackendResolver, ErrorClass, NeteaseQuality, QualityPreference,
    Resolution, Result, Track,
};
use tracing::{debug, warn};

/// Backend code for "login required"
pub const CODE_LOGIN_REQUIRED: i64 = 301;

/// Backend code for success
pub const CODE_OK: i64 = 200;

/// Parsed `song/url` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeteaseSongUrl {
    pub code: i64,
    #[serde(default)]
    pub data: Vec<NeteaseUrlEntry>,
}

/// One entry of the `data` array
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeteaseUrlEntry {
    #[serde(default)]
    pub url: Option<String>,

    /// Level actually served
    #[serde(default)]
    pub level: Option<String>,

    #[serde(default)]
    pub br: u64,

    /// Container format, e.g. `flac` or `mp3`
    #[serde(default, rename = "type")]
    pub format: Option<String>,
}

impl NeteaseUrlEntry {
    fn playable_url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Client for the Netease song URL endpoint
#[async_trait]
pub trait NeteaseApi: Send + Sync {
    /// Request a stream URL for `song_id` at `level`
    async fn song_url(&self, song_id: i64, level: NeteaseQuality) -> Result<NeteaseSongUrl>;
}

/// Resolves Netease tracks, degrading through the quality ladder
pub struct NeteaseResolver {
    api: Arc<dyn NeteaseApi>,
}

impl NeteaseResolver {
    pub fn new(api: Arc<dyn NeteaseApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl BackendResolver for NeteaseResolver {
    fn backend(&self) -> BackendKind {
        BackendKind::Netease
    }

    async fn resolve(&self, track: &Track, quality: &QualityPreference) -> Result<Resolution> {
        for level in quality.netease.ladder() {
            let response = self.api.song_url(track.id, level).await?;

            match response.code {
                CODE_OK => {}
                CODE_LOGIN_REQUIRED => {
                    debug!(track_id = track.id, "Netease requires login");
                    return Ok(Resolution::RequiresAuthentication);
                }
                code => {
                    return Ok(Resolution::failure(
                        ErrorClass::Other,
                        format!("Netease answered code {code}"),
                    ));
                }
            }

            let Some((entry, url)) = response
                .data
                .iter()
                .find_map(|e| e.playable_url().map(|url| (e, url)))
            else {
                debug!(track_id = track.id, level = %level, "No URL at this level, degrading");
                continue;
            };

            let served = entry.level.as_deref().and_then(NeteaseQuality::from_key);
            if let Some(served) = served.filter(|s| *s > level) {
                warn!(
                    track_id = track.id,
                    requested = %level,
                    served = %served,
                    "Netease served a higher level than requested"
                );
            }

            return Ok(Resolution::Success {
                url: ensure_https(url),
                mime: entry.format.as_deref().and_then(mime_for_format),
                cache_key: cache_key(track, quality),
            });
        }

        Ok(Resolution::failure(
            ErrorClass::InvalidAddress,
            "No playable URL at any quality (login or copyright restriction)",
        ))
    }
}

fn ensure_https(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

fn mime_for_format(format: &str) -> Option<String> {
    let mime = match format.to_ascii_lowercase().as_str() {
        "flac" => "audio/flac",
        "mp3" => "audio/mpeg",
        "m4a" | "aac" => "audio/mp4",
        _ => return None,
    };
    Some(mime.to_string())
}
