//! Lock-conscious realtime audio callback slot.
//!
//! - No OS mutex or syscall in the audio callback path.
//! - The processor can be replaced from another thread.
//! - If the processor is busy (being swapped), the callback outputs silence.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use spin::Mutex;
use wavebank_core::SAMPLE_RATE;

/// Anything that can fill an interleaved device buffer from the audio thread.
///
/// `process` must not block, allocate, or log.
pub trait AudioCallback: Send + 'static {
    /// Fill `output` (`frames * channels` interleaved samples).
    fn process(&mut self, output: &mut [f32], sample_rate: f32, channels: usize, frames: usize);
}

/// Holds the active [`AudioCallback`] and counts the frames handed to the device.
pub struct CallbackSlot {
    processor: Arc<Mutex<Box<dyn AudioCallback>>>,
    frame_clock: Arc<AtomicU64>,
    channels: usize,
}

impl CallbackSlot {
    /// Wrap `processor`. `channels` is clamped to at least one.
    pub fn new(processor: Box<dyn AudioCallback>, channels: usize) -> Self {
        Self {
            processor: Arc::new(Mutex::new(processor)),
            frame_clock: Arc::new(AtomicU64::new(0)),
            channels: channels.max(1),
        }
    }

    /// A slot that outputs silence until a processor is swapped in.
    pub fn silent(channels: usize) -> Self {
        Self::new(Box::new(Silence), channels)
    }

    /// Replace the processor. Spins briefly if the audio thread is inside `process`.
    pub fn swap_processor(&self, processor: Box<dyn AudioCallback>) {
        *self.processor.lock() = processor;
    }

    /// Entry point for the device callback.
    ///
    /// Returns `false` when the processor was unavailable and silence was written
    /// instead. Performs no allocation.
    pub fn process_realtime(&self, output: &mut [f32]) -> bool {
        let frames = output.len() / self.channels;
        if frames == 0 {
            return false;
        }
        self.frame_clock.fetch_add(frames as u64, Ordering::Relaxed);

        match self.processor.try_lock() {
            Some(mut processor) => {
                processor.process(output, SAMPLE_RATE, self.channels, frames);
                true
            }
            None => {
                output.fill(0.0);
                false
            }
        }
    }

    /// Interleaved channel count the device buffers use.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames handed to the device so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_clock.load(Ordering::Relaxed)
    }

    /// Playback position in seconds.
    pub fn playback_time(&self) -> f32 {
        self.frame_count() as f32 / SAMPLE_RATE
    }
}

struct Silence;

impl AudioCallback for Silence {
    fn process(&mut self, output: &mut [f32], _sample_rate: f32, _channels: usize, _frames: usize) {
        output.fill(0.0);
    }
}
