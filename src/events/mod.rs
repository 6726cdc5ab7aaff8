// ABOUTME: Event types and their dispatch to registered listeners
// ABOUTME: Re-exports the decoded event payloads for listener signatures

mod dispatcher;

pub use crate::protocol::messages::{
    Event, EventKind, EventVariant, PlayerUpdate, Ready, TrackEnd, TrackException, TrackStart,
    TrackStuck, WebSocketClosed,
};
pub use crate::model::stats::Stats;
pub use dispatcher::{BoxError, EventDispatcher};
