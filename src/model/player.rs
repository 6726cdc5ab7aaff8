// ABOUTME: Player payloads: remote player snapshots, live state and update requests
// ABOUTME: UpdatePlayer distinguishes absent, explicit-null and set fields

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::time::Duration;

use crate::model::filters::Filters;
use crate::model::track::Track;
use crate::protocol::serde_ext::{millis_opt, ping, snowflake};
use crate::voice::VoiceState;

/// Snapshot of a node-side player
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Guild the player belongs to
    #[serde(with = "snowflake")]
    pub guild_id: u64,
    /// Currently playing track
    pub track: Option<Track>,
    /// Volume, 0 to 1000
    pub volume: u16,
    /// Whether playback is paused
    pub paused: bool,
    /// Voice connection the player uses
    pub voice: VoiceState,
    /// Active filter chain
    pub filters: Filters,
}

/// Live player position, reported through `playerUpdate` frames
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    /// Node time of the report
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub time: DateTime<Utc>,
    /// Position in the current track, if one is playing
    #[serde(default, with = "millis_opt")]
    pub position: Option<Duration>,
    /// Whether the node is connected to the voice gateway
    pub connected: bool,
    /// Voice gateway round trip; `None` when not connected
    #[serde(deserialize_with = "ping::deserialize")]
    pub ping: Option<Duration>,
}

/// Partial player update sent with `PATCH sessions/{session}/players/{guild}`
///
/// Unset fields are left out of the request body entirely. `encoded_track`
/// and `end_time` can also be sent as an explicit `null`, which stops the
/// current track or clears the end time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlayer {
    /// Do not replace a track that is already playing
    #[serde(skip)]
    pub no_replace: bool,
    /// Track to play; `Some(None)` stops the player
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoded_track: Option<Option<String>>,
    /// Identifier to load and play instead of an encoded track
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Position to seek to
    #[serde(skip_serializing_if = "Option::is_none", with = "millis_opt")]
    pub position: Option<Duration>,
    /// Where to end the track; `Some(None)` clears it
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "end_time")]
    pub end_time: Option<Option<Duration>>,
    /// Volume, 0 to 1000
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u16>,
    /// Pause state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
    /// Replacement filter chain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Filters>,
    /// Voice credentials for the node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceState>,
}

impl UpdatePlayer {
    /// Empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// Play an encoded track
    pub fn encoded_track(mut self, encoded: impl Into<String>) -> Self {
        self.encoded_track = Some(Some(encoded.into()));
        self
    }

    /// Stop the current track
    pub fn stop(mut self) -> Self {
        self.encoded_track = Some(None);
        self
    }

    /// Load and play an identifier
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Seek to a position
    pub fn position(mut self, position: Duration) -> Self {
        self.position = Some(position);
        self
    }

    /// Set (or clear with `None`) the end time
    pub fn end_time(mut self, end_time: Option<Duration>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    /// Set the volume, clamped to 1000
    pub fn volume(mut self, volume: u16) -> Self {
        self.volume = Some(volume.min(1000));
        self
    }

    /// Pause or resume
    pub fn paused(mut self, paused: bool) -> Self {
        self.paused = Some(paused);
        self
    }

    /// Replace the filter chain
    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Attach voice credentials
    pub fn voice(mut self, voice: VoiceState) -> Self {
        self.voice = Some(voice);
        self
    }

    /// Keep the current track if one is already playing
    pub fn no_replace(mut self, no_replace: bool) -> Self {
        self.no_replace = no_replace;
        self
    }

    /// Whether the update asks the node to start a track
    pub fn starts_track(&self) -> bool {
        matches!(self.encoded_track, Some(Some(_))) || self.identifier.is_some()
    }
}

fn end_time<S>(end_time: &Option<Option<Duration>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match end_time {
        Some(Some(duration)) => serializer.serialize_u64(duration.as_millis() as u64),
        _ => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_omits_unset_fields() {
        let body = serde_json::to_value(UpdatePlayer::new().paused(true)).unwrap();
        assert_eq!(body, json!({ "paused": true }));
    }

    #[test]
    fn test_stop_sends_explicit_null() {
        let body = serde_json::to_value(UpdatePlayer::new().stop()).unwrap();
        assert_eq!(body, json!({ "encodedTrack": null }));
    }

    #[test]
    fn test_update_durations_in_millis() {
        let update = UpdatePlayer::new()
            .encoded_track("abc")
            .position(Duration::from_secs(2))
            .end_time(None)
            .volume(4000);

        let body = serde_json::to_value(&update).unwrap();
        assert_eq!(
            body,
            json!({
                "encodedTrack": "abc",
                "position": 2000,
                "endTime": null,
                "volume": 1000
            })
        );
        assert!(update.starts_track());
    }

    #[test]
    fn test_player_state_decode() {
        let state: PlayerState = serde_json::from_value(json!({
            "time": 1500467109000i64,
            "position": 60000,
            "connected": true,
            "ping": 50
        }))
        .unwrap();

        assert_eq!(state.time.timestamp(), 1500467109);
        assert_eq!(state.position, Some(Duration::from_secs(60)));
        assert_eq!(state.ping, Some(Duration::from_millis(50)));
    }

    #[test]
    fn test_player_decode() {
        let player: Player = serde_json::from_value(json!({
            "guildId": "817327181659111454",
            "track": null,
            "volume": 100,
            "paused": false,
            "voice": {
                "token": "abc",
                "endpoint": "us-east1.discord.media",
                "sessionId": "xyz",
                "connected": true,
                "ping": -1
            },
            "filters": {}
        }))
        .unwrap();

        assert_eq!(player.guild_id, 817327181659111454);
        assert!(player.track.is_none());
        assert_eq!(player.voice.connected, Some(true));
        assert_eq!(player.voice.ping, None);
        assert_eq!(player.filters, Filters::default());
    }
}
