// ABOUTME: Per-guild play queues driven by track lifecycle events
// ABOUTME: Queue state, the command seam to the node and the player manager

mod controller;
mod manager;
mod state;

pub use controller::PlayerController;
pub use manager::{PlayerManager, QueueHandle};
pub use state::Queue;

use crate::model::track::Track;

/// How the queue continues after a track finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RepeatMode {
    /// Advance and stop at the end
    #[default]
    None,
    /// Replay the track that just ended
    One,
    /// Advance and wrap to the start at the end
    All,
}

/// How [`Queue::shuffle`] treats played and upcoming tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleMode {
    /// Shuffle history and upcoming tracks independently (mode 0)
    Split,
    /// Shuffle history and upcoming tracks together (mode 1)
    Whole,
}

/// Command a queue operation asks to send to the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackCommand {
    /// Play this encoded track
    Play(String),
    /// Stop the current track
    Stop,
}

/// Result of moving a queue's cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Step {
    /// Track under the cursor afterwards
    pub now_playing: Option<Track>,
    /// Command to send, if any
    pub command: Option<PlaybackCommand>,
}
