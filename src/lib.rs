// ABOUTME: Main library entry point for novalink
// ABOUTME: Exports the session, event, REST and queue APIs for audio nodes

//! # novalink
//!
//! Async client for Lavalink-style audio nodes.
//!
//! A [`Session`] keeps one authenticated WebSocket open against a node,
//! reconnecting on failure, decodes the node's frames into typed [`Event`]s and
//! fans them out to registered listeners. REST commands go through the
//! [`RestClient`], and [`PlayerManager`] layers ordered per-guild play queues on
//! top, advancing automatically when tracks finish.
//!
//! ## Features
//!
//! - **Session**: connect-with-retry, heartbeats, session resumption
//! - **Events**: tagged wire frames decoded into a closed set of event variants
//! - **Queue**: per-guild playlists with repeat modes and shuffling
//!
//! ## Example
//!
//! ```no_run
//! use novalink::events::TrackStart;
//! use novalink::{Credentials, Session, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> novalink::Result<()> {
//!     let session = Session::new(SessionConfig::new("localhost", 2333));
//!
//!     session.listen(|event: TrackStart| async move {
//!         log::info!("guild {} started a track", event.guild_id);
//!         Ok(())
//!     });
//!
//!     session.start(Credentials::new("youshallnotpass", 1234567890))?;
//!     # Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Command line arguments for the monitor binary
pub mod cli;
/// Event dispatching to registered listeners
pub mod events;
/// Typed payloads exchanged with the node's REST API
pub mod model;
/// Wire codec for the node's WebSocket frames
pub mod protocol;
/// Per-guild play queues and the player manager
pub mod queue;
/// REST API client
pub mod rest;
/// WebSocket session lifecycle
pub mod session;
/// Discord voice credential tracking
pub mod voice;

pub use error::{Error, NodeError};
pub use events::{Event, EventDispatcher, EventKind};
pub use model::track::{Track, TrackInfo};
pub use queue::{PlayerController, PlayerManager, Queue, RepeatMode, ShuffleMode};
pub use rest::RestClient;
pub use session::{ConnectionState, Credentials, Session, SessionConfig};
pub use voice::{VoiceServerOutcome, VoiceState, VoiceStateTracker};

/// Result type for novalink operations
pub type Result<T> = std::result::Result<T, error::Error>;

/// Error types for novalink
pub mod error {
    use chrono::{DateTime, Utc};
    use serde::Deserialize;
    use thiserror::Error;

    /// Error types for novalink operations
    #[derive(Error, Debug)]
    pub enum Error {
        /// WebSocket-related error
        #[error("WebSocket error: {0}")]
        WebSocket(String),

        /// Frame did not match the shape the protocol requires
        #[error("Protocol error: {0}")]
        Protocol(String),

        /// JSON encoding or decoding failed
        #[error("JSON error: {0}")]
        Json(#[from] serde_json::Error),

        /// HTTP transport error or non-JSON error response
        #[error("HTTP error: {0}")]
        Http(#[from] reqwest::Error),

        /// Error reported by the node in a JSON response body
        #[error("Node error: {0}")]
        Node(NodeError),

        /// `Session::start` has not been called yet
        #[error("Session has not been started")]
        NotStarted,

        /// `Session::start` was called more than once
        #[error("Session has already been started")]
        AlreadyStarted,

        /// No node session id exists (not ready yet, or the socket dropped)
        #[error("No active node session")]
        NoSession,

        /// A track was sent for a guild without complete voice credentials
        #[error("Missing voice state for guild {0}; join a voice channel first")]
        MissingVoiceState(u64),

        /// Queue operation on a guild without a queue
        #[error("Queue not found for guild {0}")]
        QueueNotFound(u64),

        /// A queue already exists for the guild
        #[error("A queue already exists for guild {0}")]
        QueueAlreadyExists(u64),

        /// Queue index outside `0..=len`
        #[error("Index {index} out of range for queue of length {len}")]
        IndexOutOfRange {
            /// Requested index
            index: usize,
            /// Queue length at the time of the call
            len: usize,
        },

        /// Track to remove is not in the queue
        #[error("Track is not in the queue")]
        TrackNotQueued,
    }

    /// Error body returned by the node for failed REST calls
    #[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
    pub struct NodeError {
        /// When the error occurred
        #[serde(with = "chrono::serde::ts_milliseconds")]
        pub timestamp: DateTime<Utc>,
        /// HTTP status code
        pub status: u16,
        /// HTTP status reason phrase
        pub error: String,
        /// Stack trace, present when requested with `trace=true`
        #[serde(default)]
        pub trace: Option<String>,
        /// Error message
        pub message: String,
        /// Request path
        pub path: String,
    }

    impl std::fmt::Display for NodeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(
                f,
                "{} {} for '{}'. Message: {}",
                self.status, self.error, self.path, self.message
            )
        }
    }

    impl std::error::Error for NodeError {}

    impl From<NodeError> for Error {
        fn from(err: NodeError) -> Self {
            Error::Node(err)
        }
    }

    impl From<tokio_tungstenite::tungstenite::Error> for Error {
        fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
            Error::WebSocket(err.to_string())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_node_error_from_body() {
            let body = r#"{
                "timestamp": 1667857581613,
                "status": 404,
                "error": "Not Found",
                "trace": null,
                "message": "Session not found",
                "path": "/v3/sessions/xtaug914v9k5032f/players/817327181659111454"
            }"#;

            let err: NodeError = serde_json::from_str(body).unwrap();
            assert_eq!(err.status, 404);
            assert_eq!(err.timestamp.timestamp_millis(), 1667857581613);
            assert!(err.trace.is_none());
            assert_eq!(
                err.to_string(),
                "404 Not Found for '/v3/sessions/xtaug914v9k5032f/players/817327181659111454'. Message: Session not found"
            );
        }

        #[test]
        fn test_precondition_messages() {
            let err = Error::IndexOutOfRange { index: 7, len: 3 };
            assert!(err.to_string().contains('7'));
            assert!(Error::QueueNotFound(42).to_string().contains("42"));
        }
    }
}
