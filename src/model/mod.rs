// ABOUTME: Typed payloads for the node's REST API
// ABOUTME: Decoded once into immutable records with explicit optionality

pub mod filters;
pub mod info;
pub mod load;
pub mod player;
pub mod route_planner;
pub mod stats;
pub mod track;

pub use filters::Filters;
pub use info::NodeInfo;
pub use load::{LoadResult, PlaylistInfo};
pub use player::{Player, PlayerState, UpdatePlayer};
pub use route_planner::RoutePlannerStatus;
pub use stats::Stats;
pub use track::{Severity, Track, TrackEndReason, TrackError, TrackInfo};
