use std::f32::consts::TAU;
use std::sync::OnceLock;

// Power of two so the index wraps with a mask
const TABLE_SIZE: usize = 4096;
const TABLE_MASK: usize = TABLE_SIZE - 1;

/// One cycle of a periodic shape, sampled at `TABLE_SIZE` points over phase [0, 1).
pub struct WaveTable {
    samples: Box<[f32]>,
}

impl WaveTable {
    fn from_fn(shape: impl Fn(f32) -> f32) -> Self {
        let samples = (0..TABLE_SIZE)
            .map(|i| shape(i as f32 / TABLE_SIZE as f32))
            .collect();
        Self { samples }
    }

    /// Linearly interpolated lookup. `phase` must be normalized to [0, 1).
    #[inline]
    pub fn lookup(&self, phase: f32) -> f32 {
        let scaled = phase * TABLE_SIZE as f32;
        let index = scaled as usize;
        let frac = scaled - index as f32;

        let a = self.samples[index & TABLE_MASK];
        let b = self.samples[(index + 1) & TABLE_MASK];
        a + frac * (b - a)
    }

    /// Number of points in one cycle.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }
}

static SINE: OnceLock<WaveTable> = OnceLock::new();
static TRIANGLE: OnceLock<WaveTable> = OnceLock::new();
static SAWTOOTH: OnceLock<WaveTable> = OnceLock::new();
static SQUARE: OnceLock<WaveTable> = OnceLock::new();

/// One cycle of sine, built on first use.
pub fn sine() -> &'static WaveTable {
    SINE.get_or_init(|| WaveTable::from_fn(|p| (TAU * p).sin()))
}

/// Triangle starting at zero and peaking at a quarter cycle.
pub fn triangle() -> &'static WaveTable {
    TRIANGLE.get_or_init(|| {
        WaveTable::from_fn(|p| {
            if p < 0.25 {
                4.0 * p
            } else if p < 0.75 {
                2.0 - 4.0 * p
            } else {
                4.0 * p - 4.0
            }
        })
    })
}

/// Rising ramp from -1 to 1.
pub fn sawtooth() -> &'static WaveTable {
    SAWTOOTH.get_or_init(|| WaveTable::from_fn(|p| 2.0 * p - 1.0))
}

/// +1 for the first half cycle, -1 for the second.
pub fn square() -> &'static WaveTable {
    SQUARE.get_or_init(|| WaveTable::from_fn(|p| if p < 0.5 { 1.0 } else { -1.0 }))
}

/// Build every table up front so the first refill doesn't pay for it.
pub fn init_tables() {
    let _ = (sine(), triangle(), sawtooth(), square());
}

/// Wrap phase into [0, 1).
#[inline]
pub fn normalize_phase(phase: f32) -> f32 {
    let wrapped = phase - phase.floor();
    // floor() of a tiny negative value can round the result up to exactly 1.0
    if wrapped >= 1.0 { 0.0 } else { wrapped }
}

/// Phase advance per sample, in cycles.
#[inline]
pub fn phase_increment(frequency: f32, sample_rate: f32) -> f32 {
    frequency / sample_rate
}
