//! Frequency keys and the table of frequencies a bank precomputes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Quantization step for keys: one millihertz.
const KEY_STEPS_PER_HZ: f64 = 1000.0;

/// Stable integer key for a frequency, in millihertz.
///
/// Cache lookups go through this key instead of comparing floats bit for bit,
/// so `440.0` and `440.0000001` address the same entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrequencyKey(u64);

impl FrequencyKey {
    /// Quantize `hz`. Returns `None` for NaN, infinities and negative values.
    #[inline]
    pub fn from_hz(hz: f32) -> Option<Self> {
        if !hz.is_finite() || hz < 0.0 {
            return None;
        }
        Some(Self((hz as f64 * KEY_STEPS_PER_HZ).round() as u64))
    }

    /// Raw key value.
    #[inline]
    pub fn millihertz(self) -> u64 {
        self.0
    }

    /// The quantized frequency this key stands for.
    #[inline]
    pub fn hz(self) -> f32 {
        (self.0 as f64 / KEY_STEPS_PER_HZ) as f32
    }
}

impl fmt::Display for FrequencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03} Hz", self.0 / 1000, self.0 % 1000)
    }
}

/// Equal-tempered frequency of a MIDI note (A4 = note 69 = 440 Hz).
#[inline]
pub fn midi_to_hz(note: u8) -> f32 {
    440.0 * 2f32.powf((note as f32 - 69.0) / 12.0)
}

/// Ordered, duplicate-free list of frequencies.
///
/// Duplicates are detected by [`FrequencyKey`], and the first occurrence wins.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct FrequencyTable {
    frequencies: Vec<f32>,
}

impl FrequencyTable {
    /// Build a table from arbitrary input, dropping duplicates.
    pub fn new<I>(frequencies: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = f32>,
    {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for hz in frequencies {
            if hz <= 0.0 {
                return Err(ConfigError::InvalidFrequency { hz });
            }
            let key = FrequencyKey::from_hz(hz).ok_or(ConfigError::InvalidFrequency { hz })?;
            if seen.insert(key) {
                out.push(hz);
            }
        }
        Ok(Self { frequencies: out })
    }

    /// Equal-tempered table covering MIDI notes `low..=high`.
    pub fn from_midi_range(low: u8, high: u8) -> ConfigResult<Self> {
        if low > high || high > 127 {
            return Err(ConfigError::InvalidNoteRange { low, high });
        }
        Self::new((low..=high).map(midi_to_hz))
    }

    /// Number of distinct frequencies.
    #[inline]
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Frequencies in table order.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.frequencies
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.frequencies.iter().copied()
    }

    /// Frequency at `index` in table order.
    pub fn get(&self, index: usize) -> Option<f32> {
        self.frequencies.get(index).copied()
    }

    /// Whether a frequency with the same key is in the table.
    pub fn contains(&self, hz: f32) -> bool {
        match FrequencyKey::from_hz(hz) {
            Some(key) => self.frequencies.iter().any(|&f| FrequencyKey::from_hz(f) == Some(key)),
            None => false,
        }
    }
}

impl TryFrom<Vec<f32>> for FrequencyTable {
    type Error = ConfigError;

    fn try_from(value: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FrequencyTable> for Vec<f32> {
    fn from(table: FrequencyTable) -> Self {
        table.frequencies
    }
}

impl<'a> IntoIterator for &'a FrequencyTable {
    type Item = &'a f32;
    type IntoIter = std::slice::Iter<'a, f32>;

    fn into_iter(self) -> Self::IntoIter {
        self.frequencies.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_quantizes_to_millihertz() {
        let a = FrequencyKey::from_hz(440.0).unwrap();
        let b = FrequencyKey::from_hz(440.000_01).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.millihertz(), 440_000);
        assert_ne!(a, FrequencyKey::from_hz(440.5).unwrap());
    }

    #[test]
    fn test_key_hz_is_the_quantized_frequency() {
        let key = FrequencyKey::from_hz(440.0004).unwrap();
        assert_eq!(key.hz(), 440.0);
        assert_eq!(FrequencyKey::from_hz(key.hz()), Some(key));
        assert_eq!(FrequencyKey::from_hz(27.5).unwrap().hz(), 27.5);
    }

    #[test]
    fn test_key_rejects_invalid() {
        assert!(FrequencyKey::from_hz(f32::NAN).is_none());
        assert!(FrequencyKey::from_hz(f32::INFINITY).is_none());
        assert!(FrequencyKey::from_hz(-1.0).is_none());
    }

    #[test]
    fn test_key_display() {
        let key = FrequencyKey::from_hz(261.6256).unwrap();
        assert_eq!(key.to_string(), "261.626 Hz");
    }

    #[test]
    fn test_table_dedup_keeps_first_occurrence_order() {
        let table = FrequencyTable::new([220.0, 110.0, 220.0, 330.0, 110.0]).unwrap();
        assert_eq!(table.as_slice(), &[220.0, 110.0, 330.0]);
        assert!(table.contains(330.0));
        assert!(!table.contains(440.0));
    }

    #[test]
    fn test_table_rejects_bad_values() {
        assert!(matches!(
            FrequencyTable::new([100.0, 0.0]),
            Err(ConfigError::InvalidFrequency { .. })
        ));
        assert!(matches!(
            FrequencyTable::new([f32::NAN]),
            Err(ConfigError::InvalidFrequency { .. })
        ));
    }

    #[test]
    fn test_midi_range() {
        let table = FrequencyTable::from_midi_range(57, 69).unwrap();
        assert_eq!(table.len(), 13);
        assert!((table.get(0).unwrap() - 220.0).abs() < 0.001);
        assert!((table.get(12).unwrap() - 440.0).abs() < 0.001);

        assert!(FrequencyTable::from_midi_range(70, 60).is_err());
        assert!(FrequencyTable::from_midi_range(0, 128).is_err());
    }

    #[test]
    fn test_table_serde_roundtrip_validates() {
        let table: FrequencyTable = serde_json::from_str("[110.0, 110.0, 220.0]").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(serde_json::to_string(&table).unwrap(), "[110.0,220.0]");
        assert!(serde_json::from_str::<FrequencyTable>("[-3.0]").is_err());
    }
}
