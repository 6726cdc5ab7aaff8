// ABOUTME: Typed client for the node's REST API
// ABOUTME: Adds credentials to every request and maps node error bodies to Error::Node

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, NodeError};
use crate::model::info::NodeInfo;
use crate::model::load::{LoadResult, RawLoadResult};
use crate::model::player::{Player, UpdatePlayer};
use crate::model::route_planner::RoutePlannerStatus;
use crate::model::stats::Stats;
use crate::model::track::Track;
use crate::session::Shared;
use crate::Result;

/// Body of `PATCH sessions/{session}`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    resuming_key: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
}

/// REST client bound to one session
///
/// Cheap to clone. Requests fail with [`Error::NotStarted`] before the
/// session is started and with [`Error::NoSession`] while no node session
/// exists for session-scoped endpoints.
#[derive(Clone, Debug)]
pub struct RestClient {
    http: reqwest::Client,
    shared: Arc<Shared>,
}

impl RestClient {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            http: reqwest::Client::new(),
            shared,
        }
    }

    /// Build a request with credentials and `trace=true`
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let credentials = self.shared.credentials.get().ok_or(Error::NotStarted)?;
        let url = format!("{}/{}", self.shared.config.rest_url(), path);

        let mut request = self
            .http
            .request(method, url)
            .header("Authorization", &credentials.password)
            .header("User-Id", credentials.bot_id.to_string())
            .header("Client-Name", &self.shared.config.client_name)
            .query(&[("trace", "true")]);

        if let Some(key) = &credentials.resume_key {
            request = request.header("Resume-Key", key);
        }

        Ok(request)
    }

    fn versioned(&self, path: &str) -> String {
        format!("{}/{}", self.shared.config.api_version, path)
    }

    fn session_path(&self, path: &str) -> Result<String> {
        let session_id = self.shared.current_session_id()?;
        if path.is_empty() {
            Ok(self.versioned(&format!("sessions/{}", session_id)))
        } else {
            Ok(self.versioned(&format!("sessions/{}/{}", session_id, path)))
        }
    }

    /// Send a request, turning non-2xx responses into errors
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        log::trace!("{} {}", status, response.url().path());

        if !status.is_success() && is_json(&response) {
            let bytes = response.bytes().await?;
            let err: NodeError = serde_json::from_slice(&bytes)?;
            log::debug!("Node returned an error: {}", err);
            return Err(err.into());
        }

        Ok(response.error_for_status()?)
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// All players of this session
    pub async fn get_players(&self) -> Result<Vec<Player>> {
        let path = self.session_path("players")?;
        self.json(self.request(Method::GET, &path)?).await
    }

    /// The player for one guild
    pub async fn get_player(&self, guild_id: u64) -> Result<Player> {
        let path = self.session_path(&format!("players/{}", guild_id))?;
        self.json(self.request(Method::GET, &path)?).await
    }

    /// Create or update a guild's player
    ///
    /// Starting a track requires a complete voice state for the guild.
    pub async fn update_player(&self, guild_id: u64, update: &UpdatePlayer) -> Result<Player> {
        if update.starts_track() && self.shared.voice.get(guild_id).is_none() {
            return Err(Error::MissingVoiceState(guild_id));
        }

        let path = self.session_path(&format!("players/{}", guild_id))?;
        let mut request = self.request(Method::PATCH, &path)?.json(update);
        if update.no_replace {
            request = request.query(&[("noReplace", "true")]);
        }

        self.json(request).await
    }

    /// Destroy a guild's player
    pub async fn destroy_player(&self, guild_id: u64) -> Result<()> {
        let path = self.session_path(&format!("players/{}", guild_id))?;
        self.send(self.request(Method::DELETE, &path)?).await?;
        Ok(())
    }

    /// Configure resuming for this session
    ///
    /// `resuming_key` of `Some(None)` disables resuming; `timeout` is how long
    /// the node keeps the session after a disconnect.
    pub async fn update_session(
        &self,
        resuming_key: Option<Option<&str>>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let path = self.session_path("")?;
        let body = SessionUpdate {
            resuming_key: resuming_key.map(|key| key.map(str::to_string)),
            timeout: timeout.map(|t| t.as_secs()),
        };
        self.send(self.request(Method::PATCH, &path)?.json(&body))
            .await?;
        Ok(())
    }

    /// Resolve an identifier (URL or search query) into tracks
    pub async fn load_tracks(&self, identifier: &str) -> Result<LoadResult> {
        let request = self
            .request(Method::GET, &self.versioned("loadtracks"))?
            .query(&[("identifier", identifier)]);
        let raw: RawLoadResult = self.json(request).await?;
        LoadResult::try_from(raw)
    }

    /// Decode one encoded track
    pub async fn decode_track(&self, encoded: &str) -> Result<Track> {
        let request = self
            .request(Method::GET, &self.versioned("decodetrack"))?
            .query(&[("encodedTrack", encoded)]);
        self.json(request).await
    }

    /// Decode several encoded tracks
    pub async fn decode_tracks(&self, encoded: &[String]) -> Result<Vec<Track>> {
        let request = self
            .request(Method::GET, &self.versioned("decodetracks"))?
            .json(encoded);
        self.json(request).await
    }

    /// Node build and capability information
    pub async fn info(&self) -> Result<NodeInfo> {
        self.json(self.request(Method::GET, &self.versioned("info"))?)
            .await
    }

    /// Node statistics
    pub async fn stats(&self) -> Result<Stats> {
        self.json(self.request(Method::GET, &self.versioned("stats"))?)
            .await
    }

    /// Node version string
    pub async fn version(&self) -> Result<String> {
        let response = self.send(self.request(Method::GET, "version")?).await?;
        Ok(response.text().await?)
    }

    /// Route planner status
    pub async fn routeplanner_status(&self) -> Result<RoutePlannerStatus> {
        let path = self.versioned("routeplanner/status");
        self.json(self.request(Method::GET, &path)?).await
    }

    /// Unmark one failed address
    pub async fn free_address(&self, address: &str) -> Result<()> {
        let path = self.versioned("routeplanner/free/address");
        let body = serde_json::json!({ "address": address });
        self.send(self.request(Method::POST, &path)?.json(&body))
            .await?;
        Ok(())
    }

    /// Unmark every failed address
    pub async fn free_all_addresses(&self) -> Result<()> {
        let path = self.versioned("routeplanner/free/all");
        self.send(self.request(Method::POST, &path)?).await?;
        Ok(())
    }
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Credentials, SessionConfig};

    fn client(started: bool) -> RestClient {
        let shared = Arc::new(Shared::new(SessionConfig::new("127.0.0.1", 1)));
        if started {
            let _ = shared.credentials.set(Credentials::new("pw", 1));
        }
        RestClient::new(shared)
    }

    #[tokio::test]
    async fn test_not_started() {
        let rest = client(false);
        assert!(matches!(rest.stats().await, Err(Error::NotStarted)));
    }

    #[tokio::test]
    async fn test_no_session() {
        let rest = client(true);
        assert!(matches!(rest.get_players().await, Err(Error::NoSession)));
    }

    #[tokio::test]
    async fn test_play_requires_voice_state() {
        let rest = client(true);
        let update = UpdatePlayer::new().encoded_track("QA");
        assert!(matches!(
            rest.update_player(5, &update).await,
            Err(Error::MissingVoiceState(5))
        ));
    }

    #[test]
    fn test_session_update_body() {
        let body = SessionUpdate {
            resuming_key: Some(Some("key".to_string())),
            timeout: Some(60),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "resumingKey": "key", "timeout": 60 })
        );

        let disable = SessionUpdate {
            resuming_key: Some(None),
            timeout: None,
        };
        assert_eq!(
            serde_json::to_value(&disable).unwrap(),
            serde_json::json!({ "resumingKey": null })
        );
    }
}
