use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::{info, warn};
use wavebank_core::SAMPLE_RATE;

use crate::session::Session;

const BLOCK_FRAMES: usize = 256;
const REFILL_TIMEOUT: Duration = Duration::from_secs(1);

/// Pull `duration` of audio through the session's callback slot and write it
/// to a 32-bit float WAV file with the slot's channel count, stepping
/// frequency every `step`.
///
/// Runs faster than real time, so every block waits for the producer instead
/// of replaying a stale frame.
pub fn render_to_wav(
    session: &mut Session,
    path: &Path,
    duration: Duration,
    step: Duration,
) -> Result<()> {
    let spec = WavSpec {
        channels: session.slot().channels() as u16,
        sample_rate: SAMPLE_RATE as u32,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("creating {}", path.display()))?;

    let total = (duration.as_secs_f64() * SAMPLE_RATE as f64) as u64;
    let step_frames = ((step.as_secs_f64() * SAMPLE_RATE as f64) as u64).max(1);
    let mut next_step = step_frames;
    let mut written = 0u64;
    let channels = usize::from(spec.channels);
    let mut block = vec![0.0f32; BLOCK_FRAMES * channels];

    while written < total {
        let frames = (total - written).min(BLOCK_FRAMES as u64) as usize;
        let out = &mut block[..frames * channels];

        if !session.wait_for_refill(REFILL_TIMEOUT) {
            warn!(written, "producer fell behind, frame will repeat");
        }
        session.slot().process_realtime(out);
        for &sample in out.iter() {
            writer.write_sample(sample)?;
        }

        written += frames as u64;
        if written >= next_step && written < total {
            session.step()?;
            next_step += step_frames;
        }
    }

    writer.finalize()?;
    info!(path = %path.display(), frames = written, "render finished");
    Ok(())
}
