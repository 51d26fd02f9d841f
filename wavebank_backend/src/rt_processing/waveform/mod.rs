pub mod noise;
pub mod oscillators;
pub mod tables;

use wavebank_core::{GeneratorOutput, PhasePair, StereoSample};

pub use oscillators::Waveform;

/// A waveform shape as a pure function of its inputs.
///
/// Implementations must not keep state between calls: all continuation state
/// lives in the returned phase, which the caller threads into the next call.
pub trait Generator: Send + Sync {
    fn generate(&self, frequency: f32, phase: f32, amplitude: f32) -> GeneratorOutput;
}

/// Left and right generators with their amplitudes, as used for one segment.
#[derive(Clone, Copy)]
pub struct StereoVoice<'a> {
    pub left: &'a dyn Generator,
    pub right: &'a dyn Generator,
    pub left_amplitude: f32,
    pub right_amplitude: f32,
}

impl<'a> StereoVoice<'a> {
    /// Separate generators and amplitudes per channel.
    pub fn new(
        left: &'a dyn Generator,
        right: &'a dyn Generator,
        left_amplitude: f32,
        right_amplitude: f32,
    ) -> Self {
        Self { left, right, left_amplitude, right_amplitude }
    }

    /// Same generator and amplitude on both channels.
    pub fn mono(generator: &'a dyn Generator, amplitude: f32) -> Self {
        Self::new(generator, generator, amplitude, amplitude)
    }

    /// Fill `out` by calling the generators once per sample, starting at `start`
    /// and carrying each returned phase into the next call. Returns the phase
    /// pair the next segment should start from.
    #[inline]
    pub fn render(&self, frequency: f32, start: PhasePair, out: &mut [StereoSample]) -> PhasePair {
        let mut phase = start;
        for slot in out.iter_mut() {
            let l = self.left.generate(frequency, phase.left, self.left_amplitude);
            let r = self.right.generate(frequency, phase.right, self.right_amplitude);
            *slot = StereoSample::new(l.sample, r.sample);
            phase = PhasePair::new(l.phase, r.phase);
        }
        phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Emits its input phase as the sample and advances by one.
    struct Counter;
    impl Generator for Counter {
        fn generate(&self, _frequency: f32, phase: f32, _amplitude: f32) -> GeneratorOutput {
            GeneratorOutput::new(phase, phase + 1.0)
        }
    }

    #[test]
    fn test_render_threads_phase() {
        let voice = StereoVoice::mono(&Counter, 1.0);
        let mut out = [StereoSample::SILENCE; 4];
        let end = voice.render(100.0, PhasePair::new(10.0, 20.0), &mut out);

        assert_eq!(out[0], StereoSample::new(10.0, 20.0));
        assert_eq!(out[3], StereoSample::new(13.0, 23.0));
        assert_eq!(end, PhasePair::new(14.0, 24.0));
    }

    #[test]
    fn test_render_uses_per_channel_generators() {
        let square = Waveform::Square;
        let voice = StereoVoice::new(&square, &Counter, 0.5, 1.0);
        let mut out = [StereoSample::SILENCE; 2];
        voice.render(1.0, PhasePair::ZERO, &mut out);

        assert!((out[0].left - 0.5).abs() < 1e-6);
        assert_eq!(out[1].right, 1.0);
    }
}
