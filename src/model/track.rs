// ABOUTME: Track payloads shared by REST responses and track events
// ABOUTME: Encoded tracks compare by their opaque encoded form only

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::time::Duration;

use crate::protocol::serde_ext::millis;

/// A playable item produced by the node
///
/// `encoded` is opaque to the client; only the node can decode it. Two tracks
/// are equal when their encoded forms are equal, whatever `info` says.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Base64 serialization of the track, produced by the node
    pub encoded: String,
    /// Decoded metadata
    pub info: TrackInfo,
}

impl Track {
    /// Create a track from its parts
    pub fn new(encoded: impl Into<String>, info: TrackInfo) -> Self {
        Self {
            encoded: encoded.into(),
            info,
        }
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.encoded == other.encoded
    }
}

impl Eq for Track {}

impl Hash for Track {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.encoded.hash(state);
    }
}

/// Track metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    /// Source-specific identifier
    pub identifier: String,
    /// Whether the track supports seeking
    pub is_seekable: bool,
    /// Author or uploader
    pub author: String,
    /// Track length
    #[serde(with = "millis")]
    pub length: Duration,
    /// Whether the track is a live stream
    pub is_stream: bool,
    /// Playback position the track starts at
    #[serde(with = "millis")]
    pub position: Duration,
    /// Track title
    pub title: String,
    /// Source URI, when there is one
    pub uri: Option<String>,
    /// Name of the source manager that produced the track
    pub source_name: String,
}

/// Why a track stopped playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackEndReason {
    /// Played to the end
    Finished,
    /// Failed to load
    LoadFailed,
    /// Stopped by a player update
    Stopped,
    /// Replaced by another track
    Replaced,
    /// Player was cleaned up
    Cleanup,
}

impl TrackEndReason {
    /// Whether the next track may be started in response to this reason
    pub fn may_start_next(&self) -> bool {
        matches!(self, TrackEndReason::Finished)
    }
}

/// Severity of a track exception
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Known cause, e.g. an unavailable video
    Common,
    /// Unknown cause, possibly a source bug
    Suspicious,
    /// Unrecoverable node-side failure
    Fatal,
}

/// Failure reported while loading or playing a track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackError {
    /// Human-readable message, if any
    pub message: Option<String>,
    /// How bad it is
    pub severity: Severity,
    /// Underlying cause
    pub cause: String,
}

#[cfg(test)]
pub(crate) fn sample_track(encoded: &str) -> Track {
    Track::new(
        encoded,
        TrackInfo {
            identifier: format!("id-{encoded}"),
            is_seekable: true,
            author: "author".to_string(),
            length: Duration::from_secs(180),
            is_stream: false,
            position: Duration::ZERO,
            title: format!("title {encoded}"),
            uri: None,
            source_name: "youtube".to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_decode() {
        let json = r#"{
            "encoded": "QAAAjQIAJVJpY2sgQXN0bGV5",
            "info": {
                "identifier": "dQw4w9WgXcQ",
                "isSeekable": true,
                "author": "RickAstleyVEVO",
                "length": 212000,
                "isStream": false,
                "position": 0,
                "title": "Rick Astley - Never Gonna Give You Up",
                "uri": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
                "sourceName": "youtube"
            }
        }"#;

        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.info.length, Duration::from_millis(212_000));
        assert_eq!(track.info.source_name, "youtube");
        assert!(track.info.is_seekable);
    }

    #[test]
    fn test_equality_by_encoded() {
        let a = sample_track("A");
        let mut also_a = sample_track("A");
        also_a.info.title = "something else".to_string();

        assert_eq!(a, also_a);
        assert_ne!(a, sample_track("B"));
    }

    #[test]
    fn test_end_reason_wire_names() {
        let reason: TrackEndReason = serde_json::from_str("\"LOAD_FAILED\"").unwrap();
        assert_eq!(reason, TrackEndReason::LoadFailed);
        assert!(!reason.may_start_next());
        assert!(TrackEndReason::Finished.may_start_next());
    }
}
