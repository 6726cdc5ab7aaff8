// ABOUTME: Route planner (IP rotation) status
// ABOUTME: Returned by GET routeplanner/status; empty when no planner is configured

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Route planner status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePlannerStatus {
    /// Planner implementation, `None` when disabled
    #[serde(rename = "type", default)]
    pub kind: Option<RoutePlannerType>,
    /// Planner details, `None` when disabled
    #[serde(default)]
    pub details: Option<RoutePlannerDetails>,
}

/// Route planner implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutePlannerType {
    /// Switches IP on ban
    RotatingIpRoutePlanner,
    /// Switches IP on every clock update
    NanoIpRoutePlanner,
    /// Switches IP on every clock update and on ban
    RotatingNanoIpRoutePlanner,
    /// Picks a random IP for every request
    BalancingIpRoutePlanner,
}

/// Route planner details
///
/// The index fields only exist for some planner types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlannerDetails {
    /// Configured IP block
    pub ip_block: IpBlock,
    /// Addresses currently marked as failing
    pub failing_addresses: Vec<FailingAddress>,
    /// Number of rotations
    #[serde(default)]
    pub rotate_index: Option<String>,
    /// Current offset in the block
    #[serde(default)]
    pub ip_index: Option<String>,
    /// Current address
    #[serde(default)]
    pub current_address: Option<String>,
    /// Current offset in the block
    #[serde(default)]
    pub current_address_index: Option<String>,
    /// Information about the current block
    #[serde(default)]
    pub block_index: Option<String>,
}

/// IP block used for rotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpBlock {
    /// Address family
    #[serde(rename = "type")]
    pub kind: IpBlockType,
    /// Block size
    pub size: String,
}

/// Address family of an IP block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpBlockType {
    /// IPv4
    Inet4Address,
    /// IPv6
    Inet6Address,
}

/// An address marked as failing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailingAddress {
    /// The address
    pub address: String,
    /// When it was marked as failing
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub failing_time: DateTime<Utc>,
}
