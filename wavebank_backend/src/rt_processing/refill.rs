//! Producer thread.
//!
//! [`RefillWorker`] moves a [`BufferManager`] onto its own thread and renders the
//! next frame whenever asked. The audio side asks through a [`RefillTrigger`],
//! which never blocks; the control side selects which frequency plays through
//! [`RefillWorker::select`], which waits for the producer to confirm.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use thiserror::Error;
use tracing::{debug, error, info};
use wavebank_core::{BufferError, BufferResult};

use super::buffer_manager::BufferManager;
use super::waveform::{StereoVoice, Waveform};

/// Failures of the producer thread or of the refill it was asked to run.
#[derive(Debug, Error)]
pub enum RefillError {
    #[error("producer thread has stopped")]
    Disconnected,

    #[error("producer thread panicked")]
    Panicked,

    #[error("failed to spawn producer thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Generators and amplitudes the producer renders with.
#[derive(Debug, Clone)]
pub struct VoiceSettings {
    pub left: Waveform,
    pub right: Waveform,
    pub left_amplitude: f32,
    pub right_amplitude: f32,
}

impl VoiceSettings {
    /// Same waveform and amplitude on both channels.
    pub fn mono(waveform: Waveform, amplitude: f32) -> Self {
        Self {
            left: waveform.clone(),
            right: waveform,
            left_amplitude: amplitude,
            right_amplitude: amplitude,
        }
    }

    /// Borrowed view used for rendering.
    pub fn voice(&self) -> StereoVoice<'_> {
        StereoVoice::new(&self.left, &self.right, self.left_amplitude, self.right_amplitude)
    }
}

enum ProducerCommand {
    Refill,
    Select { frequency: f32, ack: Sender<BufferResult<()>> },
    Shutdown,
}

/// Non-blocking refill request handle for the audio thread.
///
/// Requests coalesce: while one is queued and not yet picked up by the
/// producer, further requests are dropped.
#[derive(Clone)]
pub struct RefillTrigger {
    commands: Sender<ProducerCommand>,
    requested: Arc<AtomicBool>,
}

impl RefillTrigger {
    /// Ask for the next frame. Returns `false` if a request is already queued,
    /// the queue is full, or the producer is gone.
    #[inline]
    pub fn request(&self) -> bool {
        if self.requested.swap(true, Ordering::AcqRel) {
            return false;
        }
        match self.commands.try_send(ProducerCommand::Refill) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.requested.store(false, Ordering::Release);
                false
            }
        }
    }
}

/// Handle to the producer thread. Dropping it stops the thread.
pub struct RefillWorker {
    commands: Sender<ProducerCommand>,
    requested: Arc<AtomicBool>,
    handle: Option<JoinHandle<BufferManager>>,
}

impl RefillWorker {
    /// Start the producer thread. `queue_depth` bounds pending commands.
    pub fn spawn(
        manager: BufferManager,
        settings: VoiceSettings,
        queue_depth: usize,
    ) -> Result<Self, RefillError> {
        let (commands, inbox) = channel::bounded(queue_depth.max(1));
        let requested = Arc::new(AtomicBool::new(false));
        let producer = Producer {
            manager,
            settings,
            frequency: None,
            requested: Arc::clone(&requested),
        };

        let handle = thread::Builder::new()
            .name("wavebank-producer".into())
            .spawn(move || producer.run(inbox))
            .map_err(RefillError::Spawn)?;

        info!(queue_depth, "producer thread started");
        Ok(Self { commands, requested, handle: Some(handle) })
    }

    /// A request handle for the consumer side. All triggers of one worker share
    /// the same coalescing flag.
    pub fn trigger(&self) -> RefillTrigger {
        RefillTrigger {
            commands: self.commands.clone(),
            requested: Arc::clone(&self.requested),
        }
    }

    /// Switch refills to `frequency` and render its next frame right away.
    ///
    /// Blocks until the producer has handled the request. Fails with
    /// `UnknownFrequency` if the frequency was never preloaded; the previous
    /// selection stays active in that case.
    pub fn select(&self, frequency: f32) -> Result<(), RefillError> {
        let (ack, reply) = channel::bounded(1);
        self.commands
            .send(ProducerCommand::Select { frequency, ack })
            .map_err(|_| RefillError::Disconnected)?;
        reply.recv().map_err(|_| RefillError::Disconnected)??;
        Ok(())
    }

    /// Stop the producer and take the manager back.
    pub fn shutdown(mut self) -> Result<BufferManager, RefillError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<BufferManager, RefillError> {
        let handle = self.handle.take().ok_or(RefillError::Disconnected)?;
        // A full queue still drains, so a blocking send is fine here.
        let _ = self.commands.send(ProducerCommand::Shutdown);
        let manager = handle.join().map_err(|_| RefillError::Panicked)?;
        info!("producer thread stopped");
        Ok(manager)
    }
}

impl Drop for RefillWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.stop();
        }
    }
}

struct Producer {
    manager: BufferManager,
    settings: VoiceSettings,
    frequency: Option<f32>,
    requested: Arc<AtomicBool>,
}

impl Producer {
    fn run(mut self, inbox: Receiver<ProducerCommand>) -> BufferManager {
        for command in inbox.iter() {
            match command {
                ProducerCommand::Refill => self.refill(),
                ProducerCommand::Select { frequency, ack } => {
                    let result = self.select(frequency);
                    let _ = ack.send(result);
                }
                ProducerCommand::Shutdown => break,
            }
        }
        self.manager
    }

    /// Render one frame unless one is still waiting to be promoted.
    ///
    /// The request flag is cleared before rendering, so a request made while
    /// this frame renders is queued rather than lost.
    fn refill(&mut self) {
        self.requested.store(false, Ordering::Release);
        if self.manager.is_next_ready() {
            debug!("refill skipped, previous frame not yet promoted");
            return;
        }
        let Some(frequency) = self.frequency else {
            debug!("refill requested before any frequency was selected");
            return;
        };
        if let Err(err) = self.manager.fill_next_voice(&self.settings.voice(), frequency) {
            error!(%err, frequency, "refill failed");
        }
    }

    fn select(&mut self, frequency: f32) -> BufferResult<()> {
        self.manager.fill_next_voice(&self.settings.voice(), frequency)?;
        self.frequency = Some(frequency);
        debug!(frequency, "frequency selected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rt_processing::frame_buffers::FrameBuffers;
    use crate::rt_processing::waveform::Generator;
    use std::time::{Duration, Instant};
    use wavebank_core::frame::silent_mono_frame;
    use wavebank_core::{FrequencyTable, GeneratorOutput, PhasePair, STEREO_BUFFER_SIZE};

    struct Counter;
    impl Generator for Counter {
        fn generate(&self, _frequency: f32, phase: f32, _amplitude: f32) -> GeneratorOutput {
            GeneratorOutput::new(phase, phase + 1.0)
        }
    }

    fn worker() -> RefillWorker {
        worker_with_frames().0
    }

    fn worker_with_frames() -> (RefillWorker, Arc<FrameBuffers>) {
        let settings = VoiceSettings::mono(Waveform::custom(Counter), 1.0);
        let table = FrequencyTable::new([100.0, 200.0]).unwrap();
        let mut manager = BufferManager::new();
        manager.preload_table(&table, &settings.voice()).unwrap();
        let frames = manager.frames();
        (RefillWorker::spawn(manager, settings, 2).unwrap(), frames)
    }

    fn wait_until(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() {
            assert!(Instant::now() < deadline, "timed out waiting for producer");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_select_renders_next_frame() {
        let worker = worker();
        worker.select(100.0).unwrap();

        let manager = worker.shutdown().unwrap();
        let frames = manager.frames();
        assert!(frames.switch());

        let mut out = silent_mono_frame();
        frames.get_current(&mut out[..]).unwrap();
        assert_eq!(out[0], STEREO_BUFFER_SIZE as f32);
    }

    #[test]
    fn test_trigger_keeps_phase_continuous() {
        let (worker, frames) = worker_with_frames();
        worker.select(200.0).unwrap();
        assert!(frames.switch());
        assert!(worker.trigger().request());

        let manager = worker.shutdown().unwrap();
        // Shutdown queues behind the refill, so both refills have run.
        let n = STEREO_BUFFER_SIZE as f32;
        assert_eq!(manager.cache().lookup(200.0).unwrap().phase, PhasePair::new(3.0 * n, 3.0 * n));
        assert_eq!(manager.working_buffer()[0].left, 2.0 * n);
    }

    #[test]
    fn test_refill_keeps_unpromoted_frame() {
        let (worker, frames) = worker_with_frames();
        worker.select(200.0).unwrap();
        assert!(worker.trigger().request());

        let manager = worker.shutdown().unwrap();
        let n = STEREO_BUFFER_SIZE as f32;
        assert_eq!(manager.cache().lookup(200.0).unwrap().phase, PhasePair::new(2.0 * n, 2.0 * n));
        assert_eq!(manager.monitor().snapshot().refill_count, 1);

        assert!(frames.switch());
        let mut out = silent_mono_frame();
        frames.get_current(&mut out[..]).unwrap();
        assert_eq!(out[0], n);
    }

    #[test]
    fn test_request_flag_resets_when_producer_is_gone() {
        let worker = worker();
        let trigger = worker.trigger();
        worker.shutdown().unwrap();

        assert!(!trigger.request());
        assert!(!trigger.requested.load(Ordering::Acquire));
    }

    #[test]
    fn test_select_unknown_frequency() {
        let worker = worker();
        let err = worker.select(300.0).unwrap_err();
        assert!(matches!(err, RefillError::Buffer(BufferError::UnknownFrequency { .. })));
    }

    #[test]
    fn test_refill_before_select_is_ignored() {
        let worker = worker();
        assert!(worker.trigger().request());
        let manager = worker.shutdown().unwrap();
        assert!(!manager.frames().is_next_ready());
    }

    #[test]
    fn test_worker_can_be_restarted_with_same_manager() {
        let worker = worker();
        worker.select(100.0).unwrap();
        let trigger = worker.trigger();

        let manager = worker.shutdown().unwrap();
        assert!(!trigger.request());
        let frames = manager.frames();
        assert!(frames.switch());

        let settings = VoiceSettings::mono(Waveform::custom(Counter), 1.0);
        let worker = RefillWorker::spawn(manager, settings, 1).unwrap();
        worker.trigger().request();
        worker.select(100.0).unwrap();
        wait_until(|| frames.is_next_ready());
        assert!(frames.switch());

        let mut out = silent_mono_frame();
        frames.get_current(&mut out[..]).unwrap();
        // Second refill of this frequency; the trigger fired before select, so it was a no-op.
        assert_eq!(out[0], 2.0 * STEREO_BUFFER_SIZE as f32);
    }
}
