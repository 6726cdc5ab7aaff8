// ABOUTME: Per-guild Discord voice credentials forwarded to the node
// ABOUTME: Records are filled in by two independent gateway events in any order

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use crate::protocol::serde_ext::ping;

/// Voice connection credentials for one guild
///
/// `connected` and `ping` are only ever reported by the node and are never
/// sent back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceState {
    /// Voice token from the voice server update
    pub token: String,
    /// Voice server endpoint, without a `wss://` prefix
    pub endpoint: String,
    /// Discord voice session id from the voice state update
    pub session_id: String,
    /// Whether the node is connected to the voice gateway
    #[serde(default, skip_serializing)]
    pub connected: Option<bool>,
    /// Node's voice gateway round trip
    #[serde(default, deserialize_with = "ping::deserialize", skip_serializing)]
    pub ping: Option<Duration>,
}

impl VoiceState {
    /// Create a voice state from the three Discord credentials
    pub fn new(
        token: impl Into<String>,
        endpoint: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            endpoint: endpoint.into(),
            session_id: session_id.into(),
            connected: None,
            ping: None,
        }
    }
}

/// What a voice server update did to the guild's record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceServerOutcome {
    /// The record is complete and should be sent to the node
    Ready(VoiceState),
    /// The record still waits for the voice state update
    Incomplete,
    /// Discord sent no endpoint (voice server migration); the existing
    /// endpoint was kept and a later update is expected to supply one
    EndpointPending,
}

#[derive(Debug, Clone, Default)]
struct PartialVoiceState {
    token: Option<String>,
    endpoint: Option<String>,
    session_id: Option<String>,
}

impl PartialVoiceState {
    fn complete(&self) -> Option<VoiceState> {
        match (&self.token, &self.endpoint, &self.session_id) {
            (Some(token), Some(endpoint), Some(session_id)) => {
                Some(VoiceState::new(token, endpoint, session_id))
            }
            _ => None,
        }
    }
}

/// Tracks voice credentials per guild
#[derive(Debug, Default)]
pub struct VoiceStateTracker {
    bot_id: OnceLock<u64>,
    states: RwLock<HashMap<u64, PartialVoiceState>>,
}

impl VoiceStateTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bot user id whose voice state updates are tracked
    ///
    /// Only the first call has an effect.
    pub fn set_bot_id(&self, bot_id: u64) {
        if self.bot_id.set(bot_id).is_err() {
            log::debug!("Bot id already set, ignoring {}", bot_id);
        }
    }

    /// Handle a Discord voice server update
    pub fn handle_voice_server_update(
        &self,
        guild_id: u64,
        endpoint: Option<&str>,
        token: &str,
    ) -> VoiceServerOutcome {
        let mut states = self.states.write();
        let state = states.entry(guild_id).or_default();
        state.token = Some(token.to_string());

        let Some(endpoint) = endpoint else {
            log::warn!(
                "Voice server update for guild {} has no endpoint, keeping the previous one",
                guild_id
            );
            return VoiceServerOutcome::EndpointPending;
        };

        let endpoint = endpoint.strip_prefix("wss://").unwrap_or(endpoint);
        state.endpoint = Some(endpoint.to_string());

        match state.complete() {
            Some(voice) => VoiceServerOutcome::Ready(voice),
            None => VoiceServerOutcome::Incomplete,
        }
    }

    /// Handle a Discord voice state update
    ///
    /// Updates for other users are ignored. Returns the complete voice state
    /// when this update was the last missing piece.
    pub fn handle_voice_state_update(
        &self,
        guild_id: u64,
        user_id: u64,
        session_id: &str,
    ) -> Option<VoiceState> {
        if self.bot_id.get() != Some(&user_id) {
            log::trace!("Ignoring voice state update for user {}", user_id);
            return None;
        }

        let mut states = self.states.write();
        let state = states.entry(guild_id).or_default();
        let was_complete = state.complete().is_some();
        state.session_id = Some(session_id.to_string());

        if was_complete {
            None
        } else {
            state.complete()
        }
    }

    /// Complete voice state for a guild, if all credentials have arrived
    pub fn get(&self, guild_id: u64) -> Option<VoiceState> {
        self.states.read().get(&guild_id).and_then(PartialVoiceState::complete)
    }

    /// Forget a guild's voice state
    pub fn remove(&self, guild_id: u64) {
        self.states.write().remove(&guild_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BOT: u64 = 1000;
    const GUILD: u64 = 42;

    fn tracker() -> VoiceStateTracker {
        let tracker = VoiceStateTracker::new();
        tracker.set_bot_id(BOT);
        tracker
    }

    #[test]
    fn test_state_then_server() {
        let tracker = tracker();
        assert_eq!(tracker.handle_voice_state_update(GUILD, BOT, "sess"), None);
        assert_eq!(tracker.get(GUILD), None);

        let outcome =
            tracker.handle_voice_server_update(GUILD, Some("wss://us-east1.discord.media"), "tok");
        let expected = VoiceState::new("tok", "us-east1.discord.media", "sess");
        assert_eq!(outcome, VoiceServerOutcome::Ready(expected.clone()));
        assert_eq!(tracker.get(GUILD), Some(expected));
    }

    #[test]
    fn test_server_then_state() {
        let tracker = tracker();
        assert_eq!(
            tracker.handle_voice_server_update(GUILD, Some("eu.discord.media"), "tok"),
            VoiceServerOutcome::Incomplete
        );

        let voice = tracker.handle_voice_state_update(GUILD, BOT, "sess");
        assert_eq!(voice, Some(VoiceState::new("tok", "eu.discord.media", "sess")));

        // A repeated state update for an already complete record is not re-pushed
        assert_eq!(tracker.handle_voice_state_update(GUILD, BOT, "sess2"), None);
        assert_eq!(tracker.get(GUILD).unwrap().session_id, "sess2");
    }

    #[test]
    fn test_other_users_are_ignored() {
        let tracker = tracker();
        tracker.handle_voice_server_update(GUILD, Some("eu.discord.media"), "tok");
        assert_eq!(tracker.handle_voice_state_update(GUILD, 7, "sess"), None);
        assert_eq!(tracker.get(GUILD), None);

        // Before the bot id is known nothing is tracked
        let unset = VoiceStateTracker::new();
        assert_eq!(unset.handle_voice_state_update(GUILD, BOT, "sess"), None);
        unset.handle_voice_server_update(GUILD, Some("eu.discord.media"), "tok");
        assert_eq!(unset.get(GUILD), None);
    }

    #[test]
    fn test_missing_endpoint_keeps_previous() {
        let tracker = tracker();
        tracker.handle_voice_state_update(GUILD, BOT, "sess");
        tracker.handle_voice_server_update(GUILD, Some("old.discord.media"), "tok");

        let outcome = tracker.handle_voice_server_update(GUILD, None, "tok2");
        assert_eq!(outcome, VoiceServerOutcome::EndpointPending);

        let voice = tracker.get(GUILD).unwrap();
        assert_eq!(voice.endpoint, "old.discord.media");
        assert_eq!(voice.token, "tok2");
    }

    #[test]
    fn test_remove() {
        let tracker = tracker();
        tracker.handle_voice_state_update(GUILD, BOT, "sess");
        tracker.handle_voice_server_update(GUILD, Some("eu.discord.media"), "tok");
        tracker.remove(GUILD);
        assert_eq!(tracker.get(GUILD), None);
    }

    #[test]
    fn test_serialize_omits_node_fields() {
        let mut voice = VoiceState::new("tok", "eu.discord.media", "sess");
        voice.connected = Some(true);
        voice.ping = Some(Duration::from_millis(20));

        assert_eq!(
            serde_json::to_value(&voice).unwrap(),
            json!({ "token": "tok", "endpoint": "eu.discord.media", "sessionId": "sess" })
        );
    }
}
