//! Stateless noise.
//!
//! Generators in this crate are pure functions of their inputs, so noise cannot
//! keep an RNG around between calls. Instead the phase bits are hashed together
//! with a seed. The phase still advances like any oscillator's, so the output
//! repeats once per cycle of `frequency` (pitched noise).

/// One LCG step (Numerical Recipes constants).
#[inline]
fn lcg(state: u32) -> u32 {
    state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223)
}

/// Avalanche the bits so neighbouring phases don't give correlated output.
#[inline]
fn mix(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}

/// Bipolar noise sample in [-1, 1] for a given phase and seed.
#[inline]
pub fn hashed_noise(phase: f32, seed: u32) -> f32 {
    let state = lcg(mix(phase.to_bits() ^ seed));
    let unit = state as f32 * (1.0 / 4_294_967_296.0);
    (unit - 0.5) * 2.0
}
