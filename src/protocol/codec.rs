// ABOUTME: Decoding of raw WebSocket text frames into typed events
// ABOUTME: Unknown ops and event types decode to nothing; malformed frames are errors

use crate::error::Error;
use crate::protocol::messages::{Event, EventFrame, Frame};

/// Decode one text frame
///
/// Returns `Ok(None)` when the frame's `op` or nested `type` is not one this
/// client knows about, so newer nodes can add events without breaking it.
pub fn decode_frame(text: &str) -> Result<Option<Event>, Error> {
    let frame: Frame = serde_json::from_str(text)?;

    let event = match frame {
        Frame::Ready(ready) => Event::Ready(ready),
        Frame::PlayerUpdate(update) => Event::PlayerUpdate(update),
        Frame::Stats(stats) => Event::Stats(stats),
        Frame::Event(EventFrame::TrackStart(e)) => Event::TrackStart(e),
        Frame::Event(EventFrame::TrackEnd(e)) => Event::TrackEnd(e),
        Frame::Event(EventFrame::TrackException(e)) => Event::TrackException(e),
        Frame::Event(EventFrame::TrackStuck(e)) => Event::TrackStuck(e),
        Frame::Event(EventFrame::WebSocketClosed(e)) => Event::WebSocketClosed(e),
        Frame::Event(EventFrame::Unknown) | Frame::Unknown => return Ok(None),
    };

    Ok(Some(event))
}
