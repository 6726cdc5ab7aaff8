// ABOUTME: Node resource statistics
// ABOUTME: Delivered periodically over the WebSocket and via GET stats

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::protocol::serde_ext::millis;

/// Node load and resource usage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Players on the node
    pub players: u32,
    /// Players currently playing
    pub playing_players: u32,
    /// Node uptime
    #[serde(with = "millis")]
    pub uptime: Duration,
    /// Memory usage in bytes
    pub memory: Memory,
    /// CPU usage
    pub cpu: Cpu,
    /// Audio frame statistics; absent on REST responses
    #[serde(default)]
    pub frame_stats: Option<FrameStats>,
}

/// Memory usage in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    /// Free memory
    pub free: u64,
    /// Used memory
    pub used: u64,
    /// Allocated memory
    pub allocated: u64,
    /// Reservable memory
    pub reservable: u64,
}

/// CPU usage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cpu {
    /// Number of cores
    pub cores: u32,
    /// System-wide load
    pub system_load: f64,
    /// Load caused by the node process
    pub lavalink_load: f64,
}

/// Audio frames sent to Discord during the last minute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameStats {
    /// Frames sent
    pub sent: i64,
    /// Frames nulled
    pub nulled: i64,
    /// Difference between expected and sent frames
    pub deficit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stats_without_frame_stats() {
        let stats: Stats = serde_json::from_value(json!({
            "players": 1,
            "playingPlayers": 1,
            "uptime": 123456789,
            "memory": { "free": 1, "used": 2, "allocated": 3, "reservable": 4 },
            "cpu": { "cores": 4, "systemLoad": 0.5, "lavalinkLoad": 0 }
        }))
        .unwrap();

        assert_eq!(stats.uptime, Duration::from_millis(123_456_789));
        assert_eq!(stats.cpu.lavalink_load, 0.0);
        assert!(stats.frame_stats.is_none());
    }
}
