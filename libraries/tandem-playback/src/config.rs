/// Playback configuration
use crate::error::{PlaybackError, Result};
use crate::types::RepeatMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tandem_core::{BiliQuality, NeteaseQuality, QualityPreference};

/// Configuration for the player
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackConfig {
    /// Consecutive failures before playback stops (default: 10)
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Preferred Netease level (default: exhigh)
    #[serde(default)]
    pub netease_quality: NeteaseQuality,

    /// Preferred Bilibili tier (default: high)
    #[serde(default)]
    pub bili_quality: BiliQuality,

    /// Where the queue snapshot is kept
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// Directory holding downloaded tracks
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Buffered events per subscriber before the oldest are dropped
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Initial shuffle flag
    #[serde(default)]
    pub shuffle: bool,

    /// Initial repeat mode
    #[serde(default)]
    pub repeat: RepeatMode,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: default_max_consecutive_failures(),
            netease_quality: NeteaseQuality::default(),
            bili_quality: BiliQuality::default(),
            state_file: default_state_file(),
            download_dir: default_download_dir(),
            event_capacity: default_event_capacity(),
            shuffle: false,
            repeat: RepeatMode::Off,
        }
    }
}

impl PlaybackConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// Environment variables prefixed with `TANDEM_` override file values,
    /// e.g. `TANDEM_NETEASE_QUALITY=lossless`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            if path.exists() {
                settings = settings.add_source(config::File::from(path));
            } else {
                tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            }
        }

        settings = settings.add_source(config::Environment::with_prefix("TANDEM").try_parsing(true));

        let config: PlaybackConfig = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_consecutive_failures == 0 {
            return Err(PlaybackError::Config(
                "max_consecutive_failures must be at least 1".to_string(),
            ));
        }

        if self.event_capacity == 0 {
            return Err(PlaybackError::Config(
                "event_capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Quality preference handed to resolvers
    pub fn quality(&self) -> QualityPreference {
        QualityPreference {
            netease: self.netease_quality,
            bili: self.bili_quality,
        }
    }
}

// Default values
fn default_max_consecutive_failures() -> u32 {
    10
}

fn default_state_file() -> PathBuf {
    PathBuf::from("last_playlist.json")
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_event_capacity() -> usize {
    64
}
