use std::sync::Arc;

use wavebank_core::frame::silent_mono_frame;
use wavebank_core::{MonoFrame, STEREO_BUFFER_SIZE};

use super::callback::AudioCallback;
use super::frame_buffers::FrameBuffers;
use super::refill::RefillTrigger;

/// Consumer side: serves fixed-size frames to a device callback of any block
/// size and channel count.
///
/// When the frame it is playing runs out, the streamer promotes the next frame
/// (if the producer has one ready), copies the current frame into its own
/// scratch buffer and, unless a frame is already pending, asks the producer for
/// another. If nothing new is ready the current frame plays again.
pub struct FrameStreamer {
    frames: Arc<FrameBuffers>,
    trigger: Option<RefillTrigger>,
    scratch: Box<MonoFrame>,
    /// Stereo position inside `scratch`.
    cursor: usize,
    started: bool,
}

impl FrameStreamer {
    /// `trigger` is optional so a streamer can also drain frames filled by hand.
    /// The first frame served is whatever is current when it starts.
    pub fn new(frames: Arc<FrameBuffers>, trigger: Option<RefillTrigger>) -> Self {
        Self {
            frames,
            trigger,
            scratch: silent_mono_frame(),
            cursor: STEREO_BUFFER_SIZE,
            started: false,
        }
    }

    fn load_frame(&mut self) {
        // The very first frame is whatever was primed into current.
        if self.started {
            self.frames.switch();
        }
        self.started = true;

        if self.frames.get_current(&mut self.scratch[..]).is_err() {
            self.scratch.fill(0.0);
        }
        // Nothing to ask for while a frame is still pending.
        if let Some(trigger) = &self.trigger
            && !self.frames.is_next_ready()
        {
            trigger.request();
        }
        self.cursor = 0;
    }

    /// Next left/right pair, loading a new frame when needed.
    #[inline]
    pub fn next_pair(&mut self) -> (f32, f32) {
        if self.cursor >= STEREO_BUFFER_SIZE {
            self.load_frame();
        }
        let i = self.cursor * 2;
        self.cursor += 1;
        (self.scratch[i], self.scratch[i + 1])
    }
}

impl AudioCallback for FrameStreamer {
    fn process(&mut self, output: &mut [f32], _sample_rate: f32, channels: usize, frames: usize) {
        if channels == 0 {
            return;
        }
        for out in output.chunks_exact_mut(channels).take(frames) {
            let (left, right) = self.next_pair();
            match out {
                [mono] => *mono = 0.5 * (left + right),
                [l, r, rest @ ..] => {
                    *l = left;
                    *r = right;
                    rest.fill(0.0);
                }
                [] => {}
            }
        }
    }
}
