//! Outcome of turning a track into a playable URL

use crate::error::TandemError;
use crate::types::quality::QualityPreference;
use crate::types::track::{Backend, Track};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of a single resolution attempt. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A playable stream was found
    Success {
        url: String,
        mime: Option<String>,
        cache_key: String,
    },

    /// The backend wants a logged-in session for this track
    RequiresAuthentication,

    /// No stream could be obtained
    Failure { class: ErrorClass, detail: String },
}

impl Resolution {
    /// Shorthand for a failure
    pub fn failure(class: ErrorClass, detail: impl Into<String>) -> Self {
        Resolution::Failure {
            class,
            detail: detail.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Resolution::Success { .. })
    }
}

/// User-facing classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    /// URL missing, malformed, or not permitted for this account
    InvalidAddress,

    /// Could not reach the network or the backend
    NetworkUnreachable,

    /// Anything else
    Other,
}

impl ErrorClass {
    /// Classify a collaborator error
    pub fn classify(err: &TandemError) -> Self {
        match err {
            TandemError::Network(_) => ErrorClass::NetworkUnreachable,
            TandemError::Io(io) => match io.kind() {
                std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::NotConnected
                | std::io::ErrorKind::TimedOut => ErrorClass::NetworkUnreachable,
                _ => ErrorClass::Other,
            },
            TandemError::InvalidInput(msg) | TandemError::Sink(msg) => {
                Self::classify_message(msg)
            }
            _ => ErrorClass::Other,
        }
    }

    /// Classify a free-form engine error message
    pub fn classify_message(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("no protocol") || lower.contains("invalid url") {
            ErrorClass::InvalidAddress
        } else if lower.contains("connection")
            || lower.contains("unreachable")
            || lower.contains("timed out")
        {
            ErrorClass::NetworkUnreachable
        } else {
            ErrorClass::Other
        }
    }

    /// Human-readable explanation shown to the user
    pub fn describe(&self) -> &'static str {
        match self {
            ErrorClass::InvalidAddress => {
                "Invalid playback address. Try logging in, switching quality, or check access to this track"
            }
            ErrorClass::NetworkUnreachable => {
                "Network connection failed. Check your network and try again"
            }
            ErrorClass::Other => "Playback failed",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Cache key handed to the sink alongside the URL
///
/// Keys include the preferred quality so that switching quality never
/// plays a stale cached stream.
pub fn cache_key(track: &Track, quality: &QualityPreference) -> String {
    match track.backend() {
        Backend::Bilibili { cid: Some(cid) } => {
            format!("bili-{}-{}-{}", track.id, cid, quality.bili)
        }
        Backend::Bilibili { cid: None } => format!("bili-{}-{}", track.id, quality.bili),
        Backend::Netease => format!("netease-{}-{}", track.id, quality.netease),
    }
}
