// ABOUTME: Node session: one authenticated WebSocket with reconnect and resume
// ABOUTME: Owns the listener registry, voice tracker and REST client of the connection

mod config;
mod connection;

pub use config::SessionConfig;

use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::Error;
use crate::events::{BoxError, EventDispatcher, EventVariant};
use crate::model::player::UpdatePlayer;
use crate::rest::RestClient;
use crate::voice::{VoiceServerOutcome, VoiceState, VoiceStateTracker};
use crate::Result;

/// Connection lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected; waiting to (re)connect
    Disconnected,
    /// Connection attempt in progress
    Connecting,
    /// WebSocket open and receiving
    Connected,
    /// Stopped with [`Session::stop`]; terminal
    Stopped,
}

/// Credentials presented to the node
#[derive(Clone)]
pub struct Credentials {
    /// Node password, sent as `Authorization`
    pub password: String,
    /// Bot user id, sent as `User-Id`
    pub bot_id: u64,
    /// Key for resuming a previous session, sent as `Resume-Key`
    pub resume_key: Option<String>,
}

impl Credentials {
    /// Credentials without a resume key
    pub fn new(password: impl Into<String>, bot_id: u64) -> Self {
        Self {
            password: password.into(),
            bot_id,
            resume_key: None,
        }
    }

    /// Set the resume key
    pub fn resume_key(mut self, key: impl Into<String>) -> Self {
        self.resume_key = Some(key.into());
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("password", &"<redacted>")
            .field("bot_id", &self.bot_id)
            .field("resume_key", &self.resume_key)
            .finish()
    }
}

/// State shared by the session handle, its connection task and the REST client
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) config: SessionConfig,
    pub(crate) credentials: OnceLock<Credentials>,
    pub(crate) voice: VoiceStateTracker,
    pub(crate) dispatcher: EventDispatcher,
    session: RwLock<SessionSlot>,
    state: RwLock<ConnectionState>,
}

/// Node session id, tagged with the connection it arrived on
#[derive(Debug, Default)]
struct SessionSlot {
    connection: u64,
    id: Option<String>,
}

impl Shared {
    pub(crate) fn new(config: SessionConfig) -> Self {
        Self {
            config,
            credentials: OnceLock::new(),
            voice: VoiceStateTracker::new(),
            dispatcher: EventDispatcher::new(),
            session: RwLock::new(SessionSlot::default()),
            state: RwLock::new(ConnectionState::Disconnected),
        }
    }

    pub(crate) fn current_session_id(&self) -> Result<String> {
        self.session.read().id.clone().ok_or(Error::NoSession)
    }

    /// Id of the current (or next) WebSocket connection
    pub(crate) fn connection_id(&self) -> u64 {
        self.session.read().connection
    }

    /// Record the session id from a `ready` frame
    ///
    /// Returns false, storing nothing, when `connection` has already ended.
    pub(crate) fn set_session_id(&self, connection: u64, session_id: &str) -> bool {
        let mut slot = self.session.write();
        if slot.connection != connection {
            return false;
        }
        slot.id = Some(session_id.to_string());
        true
    }

    /// Forget the session id and retire the current connection id
    pub(crate) fn end_connection(&self) {
        let mut slot = self.session.write();
        slot.connection += 1;
        slot.id = None;
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        let mut current = self.state.write();
        if *current != state {
            log::debug!("Connection state {:?} -> {:?}", *current, state);
            *current = state;
        }
    }
}

struct Running {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// A session against one node
///
/// Cheap to clone; clones share the same connection, listeners and voice
/// state.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
    rest: RestClient,
    running: Arc<Mutex<Option<Running>>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.shared.config)
            .field("state", &self.shared.state())
            .finish()
    }
}

impl Session {
    /// Create a session; nothing connects until [`Session::start`]
    pub fn new(config: SessionConfig) -> Self {
        let shared = Arc::new(Shared::new(config));
        Self {
            rest: RestClient::new(shared.clone()),
            shared,
            running: Arc::new(Mutex::new(None)),
        }
    }

    /// Start connecting and listening in a background task
    ///
    /// Returns immediately. Connection failures are logged and retried
    /// after the configured delay until [`Session::stop`] is called. Must be
    /// called from within a tokio runtime, and only once per session.
    pub fn start(&self, credentials: Credentials) -> Result<()> {
        let bot_id = credentials.bot_id;
        self.shared
            .credentials
            .set(credentials)
            .map_err(|_| Error::AlreadyStarted)?;
        self.shared.voice.set_bot_id(bot_id);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(connection::run(
            self.shared.clone(),
            self.rest.clone(),
            shutdown_rx,
        ));

        *self.running.lock() = Some(Running { shutdown_tx, task });
        log::info!("Session started for {}", self.shared.config.websocket_url());
        Ok(())
    }

    /// Close the connection and stop reconnecting
    ///
    /// Listener tasks already spawned keep running to completion.
    pub async fn stop(&self) -> Result<()> {
        let running = self.running.lock().take();
        let Some(Running { shutdown_tx, task }) = running else {
            return match self.shared.state() {
                ConnectionState::Stopped => Ok(()),
                _ => Err(Error::NotStarted),
            };
        };

        let _ = shutdown_tx.send(true);
        if let Err(e) = task.await {
            log::error!("Connection task ended abnormally: {}", e);
        }

        self.shared.end_connection();
        self.shared.set_state(ConnectionState::Stopped);
        log::info!("Session stopped");
        Ok(())
    }

    /// Register a listener for one event type
    pub fn listen<E, F, Fut>(&self, callback: F)
    where
        E: EventVariant,
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
    {
        self.shared.dispatcher.listen(callback);
    }

    /// The session's listener registry
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.shared.dispatcher
    }

    /// REST client bound to this session
    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// Voice credentials tracked for this session
    pub fn voice(&self) -> &VoiceStateTracker {
        &self.shared.voice
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Current connection state
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Session id assigned by the node in its last `ready` frame
    pub fn session_id(&self) -> Result<String> {
        self.shared.current_session_id()
    }

    /// Feed a Discord voice server update
    ///
    /// Once the guild's voice state is complete it is sent to the node in the
    /// background.
    pub fn handle_voice_server_update(
        &self,
        guild_id: u64,
        endpoint: Option<&str>,
        token: &str,
    ) -> VoiceServerOutcome {
        let outcome = self
            .shared
            .voice
            .handle_voice_server_update(guild_id, endpoint, token);
        if let VoiceServerOutcome::Ready(voice) = &outcome {
            self.push_voice(guild_id, voice.clone());
        }
        outcome
    }

    /// Feed a Discord voice state update
    pub fn handle_voice_state_update(&self, guild_id: u64, user_id: u64, session_id: &str) {
        if let Some(voice) = self
            .shared
            .voice
            .handle_voice_state_update(guild_id, user_id, session_id)
        {
            self.push_voice(guild_id, voice);
        }
    }

    fn push_voice(&self, guild_id: u64, voice: VoiceState) {
        if self.shared.current_session_id().is_err() {
            log::debug!("No node session yet, voice state for guild {} kept locally", guild_id);
            return;
        }

        let rest = self.rest.clone();
        tokio::spawn(async move {
            if let Err(e) = rest
                .update_player(guild_id, &UpdatePlayer::new().voice(voice))
                .await
            {
                log::error!("Failed to send voice state for guild {}: {}", guild_id, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials::new("hunter2", 1).resume_key("key");
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("key"));
    }

    #[tokio::test]
    async fn test_lifecycle_preconditions() {
        let session = Session::new(SessionConfig::new("127.0.0.1", 1));
        assert_eq!(session.connection_state(), ConnectionState::Disconnected);
        assert!(matches!(session.session_id(), Err(Error::NoSession)));
        assert!(matches!(session.stop().await, Err(Error::NotStarted)));

        session.start(Credentials::new("pw", 1)).unwrap();
        assert!(matches!(
            session.start(Credentials::new("pw", 1)),
            Err(Error::AlreadyStarted)
        ));

        session.stop().await.unwrap();
        assert_eq!(session.connection_state(), ConnectionState::Stopped);
        // Stopping twice is harmless
        session.stop().await.unwrap();
    }

    #[test]
    fn test_ready_for_ended_connection_is_dropped() {
        let shared = Shared::new(SessionConfig::default());
        let first = shared.connection_id();
        assert!(shared.set_session_id(first, "first"));
        assert_eq!(shared.current_session_id().unwrap(), "first");

        shared.end_connection();
        assert!(matches!(shared.current_session_id(), Err(Error::NoSession)));

        // A late ready from the closed socket must not resurrect its id
        assert!(!shared.set_session_id(first, "first"));
        assert!(matches!(shared.current_session_id(), Err(Error::NoSession)));

        let second = shared.connection_id();
        assert_ne!(first, second);
        assert!(shared.set_session_id(second, "second"));
        assert_eq!(shared.current_session_id().unwrap(), "second");
    }
}
