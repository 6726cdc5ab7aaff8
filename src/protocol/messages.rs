// ABOUTME: Inbound WebSocket frame and event type definitions
// ABOUTME: Frames are tagged by "op"; event frames carry a nested "type" tag

use serde::Deserialize;
use std::time::Duration;

use crate::model::player::PlayerState;
use crate::model::stats::Stats;
use crate::model::track::{TrackEndReason, TrackError};
use crate::protocol::serde_ext::{millis, snowflake};

/// Top-level frame envelope, tagged by `op`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub(crate) enum Frame {
    /// Session established
    Ready(Ready),

    /// Player position report
    PlayerUpdate(PlayerUpdate),

    /// Node statistics
    Stats(Stats),

    /// Player event, tagged by `type`
    Event(EventFrame),

    /// An op this client does not understand
    #[serde(other)]
    Unknown,
}

/// Player event envelope, tagged by `type`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum EventFrame {
    #[serde(rename = "TrackStartEvent")]
    TrackStart(TrackStart),

    #[serde(rename = "TrackEndEvent")]
    TrackEnd(TrackEnd),

    #[serde(rename = "TrackExceptionEvent")]
    TrackException(TrackException),

    #[serde(rename = "TrackStuckEvent")]
    TrackStuck(TrackStuck),

    #[serde(rename = "WebSocketClosedEvent")]
    WebSocketClosed(WebSocketClosed),

    #[serde(other)]
    Unknown,
}

/// The node accepted the connection
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ready {
    /// Whether a previous session was resumed
    pub resumed: bool,
    /// Session id to use for REST calls
    pub session_id: String,
}

/// Periodic player position report
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerUpdate {
    /// Guild of the player
    #[serde(with = "snowflake")]
    pub guild_id: u64,
    /// Reported state
    pub state: PlayerState,
}

/// A track started playing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStart {
    /// Guild of the player
    #[serde(with = "snowflake")]
    pub guild_id: u64,
    /// The track that started
    pub encoded_track: String,
}

/// A track stopped playing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEnd {
    /// Guild of the player
    #[serde(with = "snowflake")]
    pub guild_id: u64,
    /// The track that ended
    pub encoded_track: String,
    /// Why it ended
    pub reason: TrackEndReason,
}

/// A track failed while playing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackException {
    /// Guild of the player
    #[serde(with = "snowflake")]
    pub guild_id: u64,
    /// The failing track
    pub encoded_track: String,
    /// What went wrong
    pub exception: TrackError,
}

/// A track produced no audio for longer than the threshold
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStuck {
    /// Guild of the player
    #[serde(with = "snowflake")]
    pub guild_id: u64,
    /// The stuck track
    pub encoded_track: String,
    /// Threshold that was exceeded
    #[serde(rename = "thresholdMs", with = "millis")]
    pub threshold: Duration,
}

/// The node's voice connection to Discord was closed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketClosed {
    /// Guild of the player
    #[serde(with = "snowflake")]
    pub guild_id: u64,
    /// Discord close code
    pub code: u16,
    /// Close reason
    pub reason: String,
    /// Whether Discord closed the connection
    pub by_remote: bool,
}

/// A decoded event from the node
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Session established
    Ready(Ready),
    /// Player position report
    PlayerUpdate(PlayerUpdate),
    /// Node statistics
    Stats(Stats),
    /// A track started
    TrackStart(TrackStart),
    /// A track ended
    TrackEnd(TrackEnd),
    /// A track failed
    TrackException(TrackException),
    /// A track got stuck
    TrackStuck(TrackStuck),
    /// Discord voice connection closed
    WebSocketClosed(WebSocketClosed),
}

/// Discriminant of an [`Event`], used as the listener registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// [`Event::Ready`]
    Ready,
    /// [`Event::PlayerUpdate`]
    PlayerUpdate,
    /// [`Event::Stats`]
    Stats,
    /// [`Event::TrackStart`]
    TrackStart,
    /// [`Event::TrackEnd`]
    TrackEnd,
    /// [`Event::TrackException`]
    TrackException,
    /// [`Event::TrackStuck`]
    TrackStuck,
    /// [`Event::WebSocketClosed`]
    WebSocketClosed,
}

impl Event {
    /// Which variant this is
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Ready(_) => EventKind::Ready,
            Event::PlayerUpdate(_) => EventKind::PlayerUpdate,
            Event::Stats(_) => EventKind::Stats,
            Event::TrackStart(_) => EventKind::TrackStart,
            Event::TrackEnd(_) => EventKind::TrackEnd,
            Event::TrackException(_) => EventKind::TrackException,
            Event::TrackStuck(_) => EventKind::TrackStuck,
            Event::WebSocketClosed(_) => EventKind::WebSocketClosed,
        }
    }

    /// Guild the event concerns, for player-scoped events
    pub fn guild_id(&self) -> Option<u64> {
        match self {
            Event::Ready(_) | Event::Stats(_) => None,
            Event::PlayerUpdate(e) => Some(e.guild_id),
            Event::TrackStart(e) => Some(e.guild_id),
            Event::TrackEnd(e) => Some(e.guild_id),
            Event::TrackException(e) => Some(e.guild_id),
            Event::TrackStuck(e) => Some(e.guild_id),
            Event::WebSocketClosed(e) => Some(e.guild_id),
        }
    }
}

/// An event payload type that listeners can subscribe to
pub trait EventVariant: Clone + Send + Sync + 'static {
    /// Registry key for this payload type
    const KIND: EventKind;

    /// Extract this payload from an event of the matching kind
    fn from_event(event: &Event) -> Option<&Self>;
}

macro_rules! event_variant {
    ($($name:ident),* $(,)?) => {
        $(
            impl EventVariant for $name {
                const KIND: EventKind = EventKind::$name;

                fn from_event(event: &Event) -> Option<&Self> {
                    match event {
                        Event::$name(inner) => Some(inner),
                        _ => None,
                    }
                }
            }

            impl From<$name> for Event {
                fn from(inner: $name) -> Self {
                    Event::$name(inner)
                }
            }
        )*
    };
}

event_variant!(
    Ready,
    PlayerUpdate,
    Stats,
    TrackStart,
    TrackEnd,
    TrackException,
    TrackStuck,
    WebSocketClosed,
);
