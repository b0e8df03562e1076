//! Lookup of downloaded tracks in the download directory

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tandem_core::{LocalCache, Track};

/// Extensions a download may carry, probed in this order
pub const DOWNLOAD_EXTENSIONS: [&str; 4] = ["flac", "m4a", "mp3", "eac3"];

/// Replace characters that are not allowed in file names
///
/// A name that ends up blank becomes `audio`.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect();

    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "audio".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Base file name (without extension) used for a downloaded track
pub fn download_base_name(track: &Track) -> String {
    sanitize_file_name(&format!("{} - {}", track.artist, track.name))
}

/// [`LocalCache`] backed by a flat download directory
#[derive(Debug, Clone)]
pub struct DownloadDirCache {
    dir: PathBuf,
}

impl DownloadDirCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl LocalCache for DownloadDirCache {
    async fn locate(&self, track: &Track) -> Option<PathBuf> {
        let base = download_base_name(track);

        for ext in DOWNLOAD_EXTENSIONS {
            let candidate = self.dir.join(format!("{base}.{ext}"));
            match tokio::fs::try_exists(&candidate).await {
                Ok(true) => {
                    tracing::debug!(path = %candidate.display(), "Found downloaded track");
                    return Some(candidate);
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(path = %candidate.display(), error = %e, "Failed to probe download");
                }
            }
        }

        None
    }
}
