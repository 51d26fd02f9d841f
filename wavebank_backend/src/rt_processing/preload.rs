//! Per-frequency precomputed segments and their continuation phase.

use std::time::Instant;

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use tracing::{debug, info};
use wavebank_core::frame::silent_stereo_frame;
use wavebank_core::{BufferError, BufferResult, FrequencyKey, PhasePair, StereoFrame};

use super::waveform::{Generator, StereoVoice};

/// A precomputed segment and the phase its oscillators stopped at.
#[derive(Clone)]
pub struct PreloadEntry {
    pub buffer: Box<StereoFrame>,
    pub phase: PhasePair,
}

impl PreloadEntry {
    /// Render one segment for `frequency` starting from phase zero on both channels.
    pub fn render(frequency: f32, voice: &StereoVoice<'_>) -> Self {
        let mut buffer = silent_stereo_frame();
        let phase = voice.render(frequency, PhasePair::ZERO, &mut buffer[..]);
        Self { buffer, phase }
    }
}

/// Keyed store of [`PreloadEntry`] values.
///
/// Entries are only ever added or replaced by [`fill`](Self::fill); after that,
/// only their phase changes. Phase updates take `&mut self`, so there is at most
/// one writer per cache at a time.
#[derive(Default)]
pub struct PreloadCache {
    entries: Option<FxHashMap<FrequencyKey, PreloadEntry>>,
}

impl PreloadCache {
    /// An uninitialized cache; call [`initialize`](Self::initialize) first.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate room for `frequency_count` entries. Clears any previous contents.
    pub fn initialize(&mut self, frequency_count: usize) {
        debug!(frequency_count, "initializing preload cache");
        self.entries = Some(FxHashMap::with_capacity_and_hasher(frequency_count, Default::default()));
    }

    /// Whether [`initialize`](Self::initialize) has run.
    pub fn is_initialized(&self) -> bool {
        self.entries.is_some()
    }

    /// Precompute one segment per frequency, in parallel.
    pub fn fill(
        &mut self,
        frequencies: &[f32],
        left: &dyn Generator,
        right: &dyn Generator,
        left_amplitude: f32,
        right_amplitude: f32,
    ) -> BufferResult<()> {
        self.fill_voice(frequencies, &StereoVoice::new(left, right, left_amplitude, right_amplitude))
    }

    /// [`fill`](Self::fill) with one generator and amplitude on both channels.
    pub fn fill_mono(
        &mut self,
        frequencies: &[f32],
        generator: &dyn Generator,
        amplitude: f32,
    ) -> BufferResult<()> {
        self.fill_voice(frequencies, &StereoVoice::mono(generator, amplitude))
    }

    /// [`fill`](Self::fill) with both channels described by one [`StereoVoice`].
    ///
    /// Every frequency must have a key; if one does not, nothing is rendered
    /// and `UnknownFrequency` is returned.
    pub fn fill_voice(&mut self, frequencies: &[f32], voice: &StereoVoice<'_>) -> BufferResult<()> {
        let entries = self.entries.as_mut().ok_or(BufferError::CacheNotInitialized)?;
        let keys = frequencies
            .iter()
            .map(|&hz| FrequencyKey::from_hz(hz).ok_or(BufferError::UnknownFrequency { hz }))
            .collect::<BufferResult<Vec<_>>>()?;

        let started = Instant::now();
        let rendered: Vec<PreloadEntry> = frequencies
            .par_iter()
            .map(|&hz| PreloadEntry::render(hz, voice))
            .collect();

        entries.extend(keys.into_iter().zip(rendered));

        info!(
            frequencies = frequencies.len(),
            entries = entries.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "preload cache filled"
        );
        Ok(())
    }

    /// Entry for `frequency`, or `UnknownFrequency` if it was never filled.
    pub fn lookup(&self, frequency: f32) -> BufferResult<&PreloadEntry> {
        let entries = self.entries.as_ref().ok_or(BufferError::CacheNotInitialized)?;
        FrequencyKey::from_hz(frequency)
            .and_then(|key| entries.get(&key))
            .ok_or(BufferError::UnknownFrequency { hz: frequency })
    }

    /// Replace the stored phase for `frequency`, leaving its buffer alone.
    pub fn update_phase(&mut self, frequency: f32, phase: PhasePair) -> BufferResult<()> {
        let entries = self.entries.as_mut().ok_or(BufferError::CacheNotInitialized)?;
        let entry = FrequencyKey::from_hz(frequency)
            .and_then(|key| entries.get_mut(&key))
            .ok_or(BufferError::UnknownFrequency { hz: frequency })?;
        entry.phase = phase;
        Ok(())
    }

    /// Whether `frequency` has an entry.
    pub fn contains(&self, frequency: f32) -> bool {
        self.lookup(frequency).is_ok()
    }

    /// Number of filled frequencies.
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |e| e.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries the store can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.entries.as_ref().map_or(0, |e| e.capacity())
    }

    /// Entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (FrequencyKey, &PreloadEntry)> + '_ {
        self.entries.iter().flat_map(|e| e.iter().map(|(k, v)| (*k, v)))
    }
}
