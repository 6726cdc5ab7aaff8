// ABOUTME: Wire protocol for the node's WebSocket
// ABOUTME: Frame definitions, frame decoding and wire-format serde helpers

/// Frame decoding
pub mod codec;
/// Frame and event type definitions
pub mod messages;
/// Serde helpers for the node's wire conventions
pub mod serde_ext;

pub use codec::decode_frame;
pub use messages::{Event, EventKind, EventVariant};
