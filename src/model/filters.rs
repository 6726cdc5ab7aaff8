// ABOUTME: Audio filter chain applied by the node to a player
// ABOUTME: Every filter is optional; unset filters are omitted from requests

use serde::{Deserialize, Serialize};

/// Filter chain for a player
///
/// Sending filters replaces every previously applied filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    /// Overall volume multiplier (1.0 is unchanged)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    /// Equalizer bands
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equalizer: Option<Vec<Equalizer>>,
    /// Vocal removal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub karaoke: Option<Karaoke>,
    /// Speed, pitch and rate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timescale: Option<Timescale>,
    /// Volume oscillation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tremolo: Option<Tremolo>,
    /// Pitch oscillation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibrato: Option<Vibrato>,
    /// Stereo panning rotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Rotation>,
    /// Waveform distortion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distortion: Option<Distortion>,
    /// Left/right channel mixing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_mix: Option<ChannelMix>,
    /// High frequency suppression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_pass: Option<LowPass>,
}

/// One equalizer band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Equalizer {
    /// Band index, 0 to 14
    pub band: u8,
    /// Gain, -0.25 to 1.0
    pub gain: f64,
}

/// Karaoke filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Karaoke {
    /// Effect level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<f64>,
    /// Mono level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mono_level: Option<f64>,
    /// Filter band in Hz
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_band: Option<f64>,
    /// Filter width
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_width: Option<f64>,
}

/// Timescale filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Timescale {
    /// Playback speed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Pitch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f64>,
    /// Rate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
}

/// Tremolo filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Tremolo {
    /// Oscillation frequency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    /// Oscillation depth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
}

/// Vibrato filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vibrato {
    /// Oscillation frequency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    /// Oscillation depth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
}

/// Rotation filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rotation {
    /// Rotation frequency in Hz
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_hz: Option<f64>,
}

/// Distortion filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distortion {
    /// Sine offset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sin_offset: Option<f64>,
    /// Sine scale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sin_scale: Option<f64>,
    /// Cosine offset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cos_offset: Option<f64>,
    /// Cosine scale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cos_scale: Option<f64>,
    /// Tangent offset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tan_offset: Option<f64>,
    /// Tangent scale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tan_scale: Option<f64>,
    /// Offset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
    /// Scale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

/// Channel mix filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMix {
    /// Left channel into left output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_to_left: Option<f64>,
    /// Left channel into right output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_to_right: Option<f64>,
    /// Right channel into left output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_to_left: Option<f64>,
    /// Right channel into right output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_to_right: Option<f64>,
}

/// Low pass filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LowPass {
    /// Smoothing factor; values above 1.0 enable the filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothing: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filters_wire_names() {
        let filters = Filters {
            equalizer: Some(vec![Equalizer { band: 0, gain: 0.2 }]),
            channel_mix: Some(ChannelMix {
                left_to_right: Some(0.5),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&filters).unwrap(),
            json!({
                "equalizer": [{ "band": 0, "gain": 0.2 }],
                "channelMix": { "leftToRight": 0.5 }
            })
        );
    }
}
