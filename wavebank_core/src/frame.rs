//! Fixed-size frame types shared by the producer and consumer sides.
//!
//! A frame is always exactly [`MONO_BUFFER_SIZE`] interleaved floats, which is
//! [`STEREO_BUFFER_SIZE`] left/right pairs. The sizes are compile-time constants
//! and the frame types are plain arrays, so a frame can never be partially sized.

/// Interleaved samples per output frame (`[L0, R0, L1, R1, ...]`).
pub const MONO_BUFFER_SIZE: usize = 2048;

/// Stereo pairs per output frame.
pub const STEREO_BUFFER_SIZE: usize = MONO_BUFFER_SIZE / 2;

/// Sample rate every generator assumes when advancing phase.
pub const SAMPLE_RATE: f32 = 48_000.0;

/// One interleaved output frame.
pub type MonoFrame = [f32; MONO_BUFFER_SIZE];

/// One frame before interleaving.
pub type StereoFrame = [StereoSample; STEREO_BUFFER_SIZE];

/// A single left/right sample pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StereoSample {
    pub left: f32,
    pub right: f32,
}

impl StereoSample {
    /// Both channels at zero.
    pub const SILENCE: Self = Self { left: 0.0, right: 0.0 };

    #[inline]
    pub const fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }
}

/// Oscillator continuation state for one frequency, one phase per channel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhasePair {
    pub left: f32,
    pub right: f32,
}

impl PhasePair {
    /// Start of a cycle on both channels.
    pub const ZERO: Self = Self { left: 0.0, right: 0.0 };

    #[inline]
    pub const fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }
}

/// Result of a single generator call: the sample it produced and the phase
/// to feed into the next call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorOutput {
    pub sample: f32,
    pub phase: f32,
}

impl GeneratorOutput {
    #[inline]
    pub const fn new(sample: f32, phase: f32) -> Self {
        Self { sample, phase }
    }
}

/// Allocate a silent mono frame on the heap.
pub fn silent_mono_frame() -> Box<MonoFrame> {
    Box::new([0.0; MONO_BUFFER_SIZE])
}

/// Allocate a silent stereo frame on the heap.
pub fn silent_stereo_frame() -> Box<StereoFrame> {
    Box::new([StereoSample::SILENCE; STEREO_BUFFER_SIZE])
}

/// Interleave `src` into `dst`: `dst[2i]` is the left and `dst[2i + 1]` the
/// right channel of `src[i]`.
///
/// `dst` must hold exactly `2 * src.len()` floats.
#[inline]
pub fn interleave_into(src: &[StereoSample], dst: &mut [f32]) {
    debug_assert_eq!(dst.len(), src.len() * 2);
    for (pair, out) in src.iter().zip(dst.chunks_exact_mut(2)) {
        out[0] = pair.left;
        out[1] = pair.right;
    }
}

/// Allocating variant of [`interleave_into`].
pub fn interleave(src: &[StereoSample]) -> Vec<f32> {
    let mut out = vec![0.0; src.len() * 2];
    interleave_into(src, &mut out);
    out
}
