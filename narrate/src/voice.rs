// Voice style presets and synthesis parameters

use serde::{Deserialize, Serialize};

/// Style used when neither the segment nor the document names one
pub const DEFAULT_VOICE_STYLE: &str = "neutral";

/// Styles cycled through during auto-ingestion
pub const DEFAULT_VOICE_PATTERN: [&str; 3] = ["neutral", "calm", "neutral"];

/// Names accepted by [`preset`] without falling back
pub const KNOWN_STYLES: [&str; 2] = ["neutral", "calm"];

/// Parameters handed to the TTS backend for one synthesis call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthesisParams {
    /// Emotional intensity; higher is more expressive
    pub exaggeration: f32,
    /// Classifier-free guidance weight; higher follows the prompt more closely
    pub cfg_weight: f32,
    /// Sampling temperature
    pub temperature: f32,
}

const NEUTRAL: SynthesisParams = SynthesisParams {
    exaggeration: 0.5,
    cfg_weight: 0.5,
    temperature: 0.8,
};

const CALM: SynthesisParams = SynthesisParams {
    exaggeration: 0.3,
    cfg_weight: 0.7,
    temperature: 0.8,
};

/// Per-segment overrides, as stored under `tts_params` in a story document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TtsParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exaggeration: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cfg_weight: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl TtsParams {
    pub fn is_empty(&self) -> bool {
        self.exaggeration.is_none() && self.cfg_weight.is_none() && self.temperature.is_none()
    }
}

impl SynthesisParams {
    /// Return a copy with any set override applied
    pub fn with_overrides(self, overrides: &TtsParams) -> Self {
        Self {
            exaggeration: overrides.exaggeration.unwrap_or(self.exaggeration),
            cfg_weight: overrides.cfg_weight.unwrap_or(self.cfg_weight),
            temperature: overrides.temperature.unwrap_or(self.temperature),
        }
    }
}

/// Look up the preset for a style name.
///
/// Unknown names fall back to the neutral preset.
pub fn preset(style: &str) -> SynthesisParams {
    match style {
        "neutral" => NEUTRAL,
        "calm" => CALM,
        other => {
            log::warn!(
                "Unknown voice style '{}', using '{}'. Available: {}",
                other,
                DEFAULT_VOICE_STYLE,
                KNOWN_STYLES.join(", ")
            );
            NEUTRAL
        }
    }
}
