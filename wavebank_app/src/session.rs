//! A running bank: preloaded cache, producer thread and the callback slot the
//! output side pulls from.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info};
use wavebank_backend::{
    BufferManager, CallbackSlot, FrameBuffers, FrameStreamer, PerformanceMonitor,
    PerformanceSnapshot, RefillWorker, VoiceSettings,
};
use wavebank_core::{BankConfig, FrequencyTable};

/// One bank being played: owns the producer thread and shares the frame
/// buffers with the callback slot.
pub struct Session {
    table: FrequencyTable,
    position: usize,
    frames: Arc<FrameBuffers>,
    monitor: Arc<PerformanceMonitor>,
    slot: Arc<CallbackSlot>,
    worker: RefillWorker,
}

impl Session {
    /// Preload the configured table, prime the first frequency and start the
    /// producer. `channels` is the interleaved layout the slot will be asked for.
    pub fn start(config: &BankConfig, channels: usize) -> Result<Self> {
        let table = config.frequency_table()?;
        let first = table.get(0).context("frequency table is empty")?;

        let settings = VoiceSettings {
            left: config.waveform.left.into(),
            right: config.waveform.right.into(),
            left_amplitude: config.amplitude.left,
            right_amplitude: config.amplitude.right,
        };

        let mut manager = BufferManager::new();
        manager.preload_table(&table, &settings.voice())?;
        manager.set_current_from_preload(first)?;

        let frames = manager.frames();
        let monitor = manager.monitor();
        let worker = RefillWorker::spawn(manager, settings, config.refill_queue_depth)?;
        worker.select(first)?;

        let streamer = FrameStreamer::new(Arc::clone(&frames), Some(worker.trigger()));
        let slot = Arc::new(CallbackSlot::new(Box::new(streamer), channels));

        info!(frequencies = table.len(), first, channels = slot.channels(), "session started");
        Ok(Self { table, position: 0, frames, monitor, slot, worker })
    }

    /// The slot to hand to an output device (or to the offline renderer).
    pub fn slot(&self) -> &Arc<CallbackSlot> {
        &self.slot
    }

    /// Frequency currently selected for refills.
    pub fn frequency(&self) -> f32 {
        self.table.as_slice()[self.position]
    }

    /// Move to the next frequency in the table, wrapping at the end.
    pub fn step(&mut self) -> Result<f32> {
        self.position = (self.position + 1) % self.table.len();
        let frequency = self.frequency();
        self.worker.select(frequency)?;
        debug!(frequency, "stepped");
        Ok(frequency)
    }

    /// Block until the producer has a frame pending, or `timeout` passes.
    pub fn wait_for_refill(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.frames.is_next_ready() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::yield_now();
        }
        true
    }

    /// Stop the producer and report the final counters.
    pub fn finish(self) -> Result<PerformanceSnapshot> {
        self.worker.shutdown()?;
        Ok(self.monitor.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_primes_and_selects_first_frequency() {
        let session = Session::start(&BankConfig::default(), 2).unwrap();
        let first = BankConfig::default().frequency_table().unwrap().get(0).unwrap();

        assert_eq!(session.frequency(), first);
        assert!(session.wait_for_refill(Duration::from_secs(1)));
        assert_eq!(session.slot().channels(), 2);

        let snapshot = session.finish().unwrap();
        assert_eq!(snapshot.refill_count, 1);
    }

    #[test]
    fn test_step_wraps_around_the_table() {
        let mut config = BankConfig::default();
        config.frequencies = Some(FrequencyTable::new([100.0, 200.0]).unwrap());
        let mut session = Session::start(&config, 2).unwrap();

        assert_eq!(session.step().unwrap(), 200.0);
        assert_eq!(session.step().unwrap(), 100.0);
        assert_eq!(session.frequency(), 100.0);
        assert_eq!(session.finish().unwrap().refill_count, 3);
    }

    #[test]
    fn test_start_rejects_invalid_note_range() {
        let mut config = BankConfig::default();
        config.notes.low = 80;
        config.notes.high = 60;
        assert!(Session::start(&config, 2).is_err());
    }
}
