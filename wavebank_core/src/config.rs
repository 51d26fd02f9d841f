//! Bank configuration, loaded from JSON.
//!
//! ```json
//! {
//!   "waveform": { "left": "sine", "right": "triangle" },
//!   "amplitude": { "left": 0.4, "right": 0.4 },
//!   "notes": { "low": 48, "high": 72 }
//! }
//! ```
//!
//! Either `frequencies` (explicit list) or `notes` (MIDI range) selects the
//! frequency table; an explicit list wins when both are present.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::frequency::FrequencyTable;

/// Built-in waveform shapes selectable from a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WaveformKind {
    #[default]
    Sine,
    Triangle,
    Sawtooth,
    Square,
    Noise,
}

/// Waveform per output channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ChannelWaveforms {
    #[serde(default)]
    pub left: WaveformKind,
    #[serde(default)]
    pub right: WaveformKind,
}

/// Peak amplitude per output channel, each within 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelAmplitudes {
    pub left: f32,
    pub right: f32,
}

impl Default for ChannelAmplitudes {
    fn default() -> Self {
        Self { left: 0.5, right: 0.5 }
    }
}

/// Inclusive MIDI note range used when no explicit frequency list is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRange {
    pub low: u8,
    pub high: u8,
}

impl Default for NoteRange {
    /// C3 to C5.
    fn default() -> Self {
        Self { low: 48, high: 72 }
    }
}

/// Everything needed to build and run one bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankConfig {
    #[serde(default)]
    pub waveform: ChannelWaveforms,
    #[serde(default)]
    pub amplitude: ChannelAmplitudes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequencies: Option<FrequencyTable>,
    #[serde(default)]
    pub notes: NoteRange,
    /// Capacity of the producer command queue.
    #[serde(default = "default_queue_depth")]
    pub refill_queue_depth: usize,
}

fn default_queue_depth() -> usize {
    4
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            waveform: ChannelWaveforms::default(),
            amplitude: ChannelAmplitudes::default(),
            frequencies: None,
            notes: NoteRange::default(),
            refill_queue_depth: default_queue_depth(),
        }
    }
}

impl BankConfig {
    /// Parse and validate.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Pretty-printed JSON, as accepted by [`from_json_str`](Self::from_json_str).
    pub fn to_json_pretty(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check amplitudes and that the frequency table is buildable and non-empty.
    pub fn validate(&self) -> ConfigResult<()> {
        for value in [self.amplitude.left, self.amplitude.right] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidAmplitude { value });
            }
        }
        if self.frequency_table()?.is_empty() {
            return Err(ConfigError::EmptyFrequencyTable);
        }
        Ok(())
    }

    /// The table this config describes.
    pub fn frequency_table(&self) -> ConfigResult<FrequencyTable> {
        match &self.frequencies {
            Some(table) => Ok(table.clone()),
            None => FrequencyTable::from_midi_range(self.notes.low, self.notes.high),
        }
    }
}
