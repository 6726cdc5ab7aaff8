// ABOUTME: Result of GET loadtracks as a sum type
// ABOUTME: The flat wire payload is folded into one variant per load type

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::track::{Track, TrackError};

/// Outcome of loading an identifier
#[derive(Debug, Clone, PartialEq)]
pub enum LoadResult {
    /// A single track was loaded
    Track(Track),
    /// A playlist was loaded
    Playlist {
        /// Playlist metadata
        info: PlaylistInfo,
        /// Tracks in playlist order
        tracks: Vec<Track>,
    },
    /// A search returned these tracks
    Search(Vec<Track>),
    /// Nothing matched the identifier
    NoMatches,
    /// Loading failed
    Failed(TrackError),
}

/// Playlist metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistInfo {
    /// Playlist name
    #[serde(default)]
    pub name: Option<String>,
    /// Index of the track selected by the identifier, if any
    #[serde(default)]
    pub selected_track: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum LoadType {
    TrackLoaded,
    PlaylistLoaded,
    SearchResult,
    NoMatches,
    LoadFailed,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawLoadResult {
    load_type: LoadType,
    #[serde(default)]
    playlist_info: Option<PlaylistInfo>,
    #[serde(default)]
    tracks: Vec<Track>,
    #[serde(default)]
    exception: Option<TrackError>,
}

impl TryFrom<RawLoadResult> for LoadResult {
    type Error = Error;

    fn try_from(raw: RawLoadResult) -> Result<Self, Self::Error> {
        match raw.load_type {
            LoadType::TrackLoaded => raw
                .tracks
                .into_iter()
                .next()
                .map(LoadResult::Track)
                .ok_or_else(|| Error::Protocol("TRACK_LOADED result without a track".into())),
            LoadType::PlaylistLoaded => Ok(LoadResult::Playlist {
                info: raw.playlist_info.unwrap_or_default(),
                tracks: raw.tracks,
            }),
            LoadType::SearchResult => Ok(LoadResult::Search(raw.tracks)),
            LoadType::NoMatches => Ok(LoadResult::NoMatches),
            LoadType::LoadFailed => raw
                .exception
                .map(LoadResult::Failed)
                .ok_or_else(|| Error::Protocol("LOAD_FAILED result without an exception".into())),
        }
    }
}
