use std::fmt;
use std::sync::Arc;

use wavebank_core::{GeneratorOutput, SAMPLE_RATE, WaveformKind};

use super::Generator;
use super::noise::hashed_noise;
use super::tables::{self, normalize_phase, phase_increment};

/// Built-in waveform shapes plus an escape hatch for caller-supplied generators.
///
/// Phase is measured in cycles and kept in [0, 1). Every built-in shape advances
/// it by `frequency / SAMPLE_RATE` per call.
#[derive(Clone)]
pub enum Waveform {
    Sine,
    Triangle,
    Sawtooth,
    Square,
    Noise { seed: u32 },
    Custom(Arc<dyn Generator>),
}

impl Waveform {
    /// Wrap a caller-supplied generator.
    pub fn custom(generator: impl Generator + 'static) -> Self {
        Self::Custom(Arc::new(generator))
    }

    #[inline]
    fn shape(&self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => tables::sine().lookup(phase),
            Waveform::Triangle => tables::triangle().lookup(phase),
            Waveform::Sawtooth => tables::sawtooth().lookup(phase),
            Waveform::Square => tables::square().lookup(phase),
            Waveform::Noise { seed } => hashed_noise(phase, *seed),
            // Routed through `generate` below, never reaches here
            Waveform::Custom(_) => 0.0,
        }
    }
}

impl Generator for Waveform {
    #[inline]
    fn generate(&self, frequency: f32, phase: f32, amplitude: f32) -> GeneratorOutput {
        if let Waveform::Custom(inner) = self {
            return inner.generate(frequency, phase, amplitude);
        }

        let sample = self.shape(phase) * amplitude;
        let next = normalize_phase(phase + phase_increment(frequency, SAMPLE_RATE));
        GeneratorOutput::new(sample, next)
    }
}

impl From<WaveformKind> for Waveform {
    fn from(kind: WaveformKind) -> Self {
        tables::init_tables();
        match kind {
            WaveformKind::Sine => Waveform::Sine,
            WaveformKind::Triangle => Waveform::Triangle,
            WaveformKind::Sawtooth => Waveform::Sawtooth,
            WaveformKind::Square => Waveform::Square,
            WaveformKind::Noise => Waveform::Noise { seed: 1 },
        }
    }
}

impl fmt::Debug for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Waveform::Sine => f.write_str("Sine"),
            Waveform::Triangle => f.write_str("Triangle"),
            Waveform::Sawtooth => f.write_str("Sawtooth"),
            Waveform::Square => f.write_str("Square"),
            Waveform::Noise { seed } => f.debug_struct("Noise").field("seed", seed).finish(),
            Waveform::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
