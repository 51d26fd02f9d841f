//! Producer side of the buffering core.
//!
//! A [`BufferManager`] owns the preload cache and the working buffer, and holds
//! the producer end of the shared [`FrameBuffers`]. Hand [`frames`](BufferManager::frames)
//! to the audio output stage (and any read-only observers); keep the manager
//! itself on one producer thread.
//!
//! Refills take `&mut self`, which is what guarantees that two refills of the
//! same frequency never race on its cached phase.

use std::sync::Arc;

use tracing::debug;
use wavebank_core::frame::{interleave_into, silent_stereo_frame};
use wavebank_core::{BufferResult, FrequencyTable, StereoFrame, StereoSample};

use super::frame_buffers::FrameBuffers;
use super::performance::PerformanceMonitor;
use super::preload::PreloadCache;
use super::waveform::{Generator, StereoVoice};

/// Preload cache, working buffer and the producer end of the frame buffers.
///
/// Not `Clone`: exactly one manager writes a given set of frame buffers.
pub struct BufferManager {
    cache: PreloadCache,
    working: Box<StereoFrame>,
    frames: Arc<FrameBuffers>,
}

impl Default for BufferManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferManager {
    /// Manager with its own [`PerformanceMonitor`].
    pub fn new() -> Self {
        Self::with_monitor(Arc::new(PerformanceMonitor::new()))
    }

    /// Manager reporting into an existing monitor.
    pub fn with_monitor(monitor: Arc<PerformanceMonitor>) -> Self {
        Self {
            cache: PreloadCache::new(),
            working: silent_stereo_frame(),
            frames: Arc::new(FrameBuffers::new(monitor)),
        }
    }

    /// Shared handle for consumers: `get_current`, `switch`, `with_current`.
    pub fn frames(&self) -> Arc<FrameBuffers> {
        Arc::clone(&self.frames)
    }

    /// Monitor shared with the frame buffers.
    pub fn monitor(&self) -> Arc<PerformanceMonitor> {
        Arc::clone(self.frames.monitor())
    }

    /// Read-only view of the preload cache.
    pub fn cache(&self) -> &PreloadCache {
        &self.cache
    }

    /// The segment produced by the most recent refill, before interleaving.
    pub fn working_buffer(&self) -> &[StereoSample] {
        &self.working[..]
    }

    // ---- preload ----

    /// See [`PreloadCache::initialize`].
    pub fn initialize(&mut self, frequency_count: usize) {
        self.cache.initialize(frequency_count);
    }

    /// Precompute segments for `frequencies`. See [`PreloadCache::fill`].
    pub fn fill(
        &mut self,
        frequencies: &[f32],
        left: &dyn Generator,
        right: &dyn Generator,
        left_amplitude: f32,
        right_amplitude: f32,
    ) -> BufferResult<()> {
        self.cache.fill(frequencies, left, right, left_amplitude, right_amplitude)
    }

    /// Single-generator [`fill`](Self::fill).
    pub fn fill_mono(
        &mut self,
        frequencies: &[f32],
        generator: &dyn Generator,
        amplitude: f32,
    ) -> BufferResult<()> {
        self.cache.fill_mono(frequencies, generator, amplitude)
    }

    /// `initialize` followed by `fill` over a whole table.
    pub fn preload_table(&mut self, table: &FrequencyTable, voice: &StereoVoice<'_>) -> BufferResult<()> {
        self.cache.initialize(table.len());
        self.cache.fill_voice(table.as_slice(), voice)
    }

    // ---- frames ----

    /// Write the cached segment for `frequency` straight into the current frame.
    ///
    /// Used for priming before the first refill. The cached phase is left alone,
    /// so the first `fill_next` for this frequency picks up where the cached
    /// segment ended.
    pub fn set_current_from_preload(&mut self, frequency: f32) -> BufferResult<()> {
        let entry = self.cache.lookup(frequency)?;
        self.frames.write_current(|dst| interleave_into(&entry.buffer[..], &mut dst[..]));
        debug!(frequency, "current frame primed from preload");
        Ok(())
    }

    /// Render the next frame for `frequency`, continuing from its cached phase.
    pub fn fill_next(
        &mut self,
        left: &dyn Generator,
        right: &dyn Generator,
        frequency: f32,
        left_amplitude: f32,
        right_amplitude: f32,
    ) -> BufferResult<()> {
        self.fill_next_voice(
            &StereoVoice::new(left, right, left_amplitude, right_amplitude),
            frequency,
        )
    }

    /// [`fill_next`](Self::fill_next) with one generator and amplitude on both channels.
    pub fn fill_next_mono(
        &mut self,
        generator: &dyn Generator,
        frequency: f32,
        amplitude: f32,
    ) -> BufferResult<()> {
        self.fill_next_voice(&StereoVoice::mono(generator, amplitude), frequency)
    }

    /// [`fill_next`](Self::fill_next) with both channels described by one voice.
    ///
    /// Nothing is written and the phase is left alone if `frequency` is unknown.
    pub fn fill_next_voice(&mut self, voice: &StereoVoice<'_>, frequency: f32) -> BufferResult<()> {
        let start = self.cache.lookup(frequency)?.phase;

        let monitor = Arc::clone(self.frames.monitor());
        let _timing = monitor.scoped_refill();
        let end = voice.render(frequency, start, &mut self.working[..]);
        self.cache.update_phase(frequency, end)?;

        let working = &self.working;
        self.frames.write_next(|dst| interleave_into(&working[..], &mut dst[..]));
        Ok(())
    }

    /// Copy the current frame into `destination` (must be exactly one frame long).
    pub fn get_current(&self, destination: &mut [f32]) -> BufferResult<()> {
        self.frames.get_current(destination)
    }

    /// Promote the prepared frame. See [`FrameBuffers::switch`].
    pub fn switch(&self) -> bool {
        self.frames.switch()
    }

    /// Whether a refilled frame is still waiting for [`switch`](Self::switch).
    pub fn is_next_ready(&self) -> bool {
        self.frames.is_next_ready()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rt_processing::waveform::Waveform;
    use wavebank_core::frame::silent_mono_frame;
    use wavebank_core::{BufferError, GeneratorOutput, MONO_BUFFER_SIZE, PhasePair, STEREO_BUFFER_SIZE};

    /// Emits its input phase as the sample and advances by one.
    struct Counter;
    impl Generator for Counter {
        fn generate(&self, _frequency: f32, phase: f32, _amplitude: f32) -> GeneratorOutput {
            GeneratorOutput::new(phase, phase + 1.0)
        }
    }

    fn manager(frequencies: &[f32]) -> BufferManager {
        let mut m = BufferManager::new();
        m.initialize(frequencies.len());
        m.fill_mono(frequencies, &Counter, 1.0).unwrap();
        m
    }

    fn current(m: &BufferManager) -> Box<[f32; MONO_BUFFER_SIZE]> {
        let mut out = silent_mono_frame();
        m.get_current(&mut out[..]).unwrap();
        out
    }

    #[test]
    fn test_set_current_from_preload_interleaves_cached_segment() {
        let mut m = manager(&[100.0]);
        m.set_current_from_preload(100.0).unwrap();

        let frame = current(&m);
        assert_eq!(&frame[..6], &[0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
        let end = STEREO_BUFFER_SIZE as f32;
        assert_eq!(m.cache().lookup(100.0).unwrap().phase, PhasePair::new(end, end));
    }

    #[test]
    fn test_fill_next_continues_phase() {
        let mut m = manager(&[100.0]);
        let n = STEREO_BUFFER_SIZE as f32;

        m.fill_next_mono(&Counter, 100.0, 1.0).unwrap();
        let first_end = m.working_buffer()[STEREO_BUFFER_SIZE - 1].left + 1.0;
        assert_eq!(m.working_buffer()[0].left, n);

        m.fill_next_mono(&Counter, 100.0, 1.0).unwrap();
        assert_eq!(m.working_buffer()[0].left, first_end);
        assert_eq!(m.cache().lookup(100.0).unwrap().phase, PhasePair::new(3.0 * n, 3.0 * n));
    }

    #[test]
    fn test_switch_then_get_current_returns_next() {
        let mut m = manager(&[100.0]);
        m.fill_next_mono(&Counter, 100.0, 1.0).unwrap();
        assert!(m.switch());

        let frame = current(&m);
        let mut expected = vec![0.0; MONO_BUFFER_SIZE];
        interleave_into(m.working_buffer(), &mut expected);
        assert_eq!(&frame[..], &expected[..]);
    }

    #[test]
    fn test_fill_next_produces_full_frame_for_every_waveform() {
        let waves = [
            Waveform::Sine,
            Waveform::Triangle,
            Waveform::Sawtooth,
            Waveform::Square,
            Waveform::Noise { seed: 3 },
            Waveform::custom(Counter),
        ];
        let mut m = BufferManager::new();
        m.initialize(1);
        m.fill_mono(&[440.0], &Waveform::Sine, 0.5).unwrap();

        for wave in &waves {
            m.fill_next_mono(wave, 440.0, 0.5).unwrap();
            assert!(m.switch());
            let frame = current(&m);
            assert_eq!(frame.len(), MONO_BUFFER_SIZE);
            assert!(frame.iter().all(|s| s.is_finite()));
        }
    }

    #[test]
    fn test_stereo_fill_next_keeps_channels_apart() {
        let mut m = BufferManager::new();
        m.initialize(1);
        m.fill(&[200.0], &Waveform::Square, &Waveform::Square, 0.25, 0.75).unwrap();
        m.fill_next(&Waveform::Square, &Waveform::Square, 200.0, 0.25, 0.75).unwrap();
        m.switch();

        let frame = current(&m);
        for pair in frame.chunks_exact(2) {
            assert!(pair[0].abs() <= 0.25 + 1e-6);
            assert!(pair[1].abs() <= 0.75 + 1e-6);
        }
        assert!((frame[0] - 0.25).abs() < 1e-6);
        assert!((frame[1] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_frequency_propagates() {
        let mut m = manager(&[100.0]);
        assert_eq!(
            m.fill_next_mono(&Counter, 150.0, 1.0),
            Err(BufferError::UnknownFrequency { hz: 150.0 })
        );
        assert_eq!(
            m.set_current_from_preload(150.0),
            Err(BufferError::UnknownFrequency { hz: 150.0 })
        );
        assert!(!m.frames().is_next_ready());
    }

    #[test]
    fn test_refills_are_counted() {
        let mut m = manager(&[100.0]);
        m.fill_next_mono(&Counter, 100.0, 1.0).unwrap();
        m.switch();
        m.switch();
        let _ = current(&m);

        let snap = m.monitor().snapshot();
        assert_eq!(snap.refill_count, 1);
        assert_eq!(snap.switch_count, 1);
        assert_eq!(snap.stale_switch_count, 1);
        assert_eq!(snap.read_count, 1);
    }

    #[test]
    fn test_preload_table() {
        let table = FrequencyTable::from_midi_range(60, 64).unwrap();
        let sine = Waveform::Sine;
        let mut m = BufferManager::new();
        m.preload_table(&table, &StereoVoice::mono(&sine, 0.3)).unwrap();
        assert_eq!(m.cache().len(), 5);
        for hz in table.iter() {
            m.set_current_from_preload(hz).unwrap();
        }
    }
}
