// ABOUTME: Serde helpers for the node's wire conventions
// ABOUTME: Millisecond durations, the -1 "not connected" ping and string guild ids

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Durations carried as integer milliseconds.
pub mod millis {
    use super::*;

    /// Deserialize a millisecond count into a [`Duration`]
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }

    /// Serialize a [`Duration`] as whole milliseconds
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}

/// Optional durations carried as integer milliseconds or `null`.
pub mod millis_opt {
    use super::*;

    /// Deserialize a nullable millisecond count
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }

    /// Serialize as milliseconds, or `null` for `None`
    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(duration) => serializer.serialize_u64(duration.as_millis() as u64),
            None => serializer.serialize_none(),
        }
    }
}

/// Round-trip ping in milliseconds where `-1` means "not connected".
pub mod ping {
    use super::*;

    /// Deserialize a ping, mapping `-1` (or `null`) to `None`
    ///
    /// Any other negative value is rejected.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<i64>::deserialize(deserializer)? {
            None | Some(-1) => Ok(None),
            Some(ms) => u64::try_from(ms)
                .map(|ms| Some(Duration::from_millis(ms)))
                .map_err(|_| D::Error::custom(format!("invalid ping: {ms}"))),
        }
    }
}

/// Snowflake ids that the node sends as decimal strings.
pub mod snowflake {
    use super::*;

    /// Parse a decimal string into a `u64` id
    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(D::Error::custom(format!("invalid snowflake id: {raw:?}")));
        }
        raw.parse().map_err(D::Error::custom)
    }

    /// Write an id back out as a decimal string
    pub fn serialize<S>(id: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(id)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(with = "super::millis")]
        length: Duration,
        #[serde(deserialize_with = "super::ping::deserialize")]
        ping: Option<Duration>,
        #[serde(with = "super::snowflake")]
        guild_id: u64,
    }

    #[test]
    fn test_ping_minus_one_is_none() {
        let sample: Sample =
            serde_json::from_str(r#"{"length": 1500, "ping": -1, "guild_id": "42"}"#).unwrap();
        assert_eq!(sample.length, Duration::from_millis(1500));
        assert_eq!(sample.ping, None);
        assert_eq!(sample.guild_id, 42);
    }

    #[test]
    fn test_ping_value_is_millis() {
        let sample: Sample =
            serde_json::from_str(r#"{"length": 0, "ping": 38, "guild_id": "7"}"#).unwrap();
        assert_eq!(sample.ping, Some(Duration::from_millis(38)));
    }

    #[test]
    fn test_ping_other_negative_rejected() {
        let result =
            serde_json::from_str::<Sample>(r#"{"length": 0, "ping": -5, "guild_id": "7"}"#);
        assert!(result.is_err());

        let sample: Sample =
            serde_json::from_str(r#"{"length": 0, "ping": null, "guild_id": "7"}"#).unwrap();
        assert_eq!(sample.ping, None);
    }

    #[test]
    fn test_snowflake_rejects_non_digits() {
        let result =
            serde_json::from_str::<Sample>(r#"{"length": 0, "ping": 0, "guild_id": "12a"}"#);
        assert!(result.is_err());

        let result = serde_json::from_str::<Sample>(r#"{"length": 0, "ping": 0, "guild_id": 12}"#);
        assert!(result.is_err());
    }
}
