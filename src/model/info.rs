// ABOUTME: Node build and capability information
// ABOUTME: Returned by GET info

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Node build and capability information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    /// Node version
    pub version: Version,
    /// Build time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub build_time: DateTime<Utc>,
    /// Git revision the node was built from
    pub git: Git,
    /// JVM version
    pub jvm: String,
    /// Lavaplayer version
    pub lavaplayer: String,
    /// Enabled source managers
    pub source_managers: Vec<String>,
    /// Enabled filters
    pub filters: Vec<String>,
    /// Loaded plugins
    pub plugins: Vec<Plugin>,
}

/// Semantic version of the node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    /// Full version string
    pub semver: String,
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
    /// Patch version
    pub patch: u32,
    /// Pre-release suffix
    pub pre_release: Option<String>,
}

/// Git revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Git {
    /// Branch
    pub branch: String,
    /// Commit hash
    pub commit: String,
    /// Commit time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub commit_time: DateTime<Utc>,
}

/// Plugin loaded by the node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plugin {
    /// Plugin name
    pub name: String,
    /// Plugin version
    pub version: String,
}
