use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, warn};
use wavebank_core::{BankConfig, SAMPLE_RATE};

use crate::session::Session;

/// Play through the default output device, stepping frequency every `step`.
pub fn play(config: &BankConfig, duration: Duration, step: Duration) -> Result<Session> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("no default output device")?;
    let name = device.name()?;
    info!(device = %name, "audio device");

    let supported = device.default_output_config()?;
    if supported.sample_format() != cpal::SampleFormat::F32 {
        bail!("unsupported device sample format: {:?}", supported.sample_format());
    }
    let rate = SAMPLE_RATE as u32;
    if supported.sample_rate().0 != rate {
        warn!(device_rate = supported.sample_rate().0, rate, "device default rate differs, requesting bank rate");
    }

    let stream_config = cpal::StreamConfig {
        channels: supported.channels(),
        sample_rate: cpal::SampleRate(rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let mut session = Session::start(config, stream_config.channels as usize)?;
    let slot = Arc::clone(session.slot());
    let stream = device.build_output_stream(
        &stream_config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            slot.process_realtime(data);
        },
        |err| error!(%err, "audio stream error"),
        None,
    )?;
    stream.play()?;
    info!(channels = stream_config.channels, rate, "stream started");

    let started = Instant::now();
    while started.elapsed() < duration {
        thread::sleep(step.min(duration.saturating_sub(started.elapsed())));
        if started.elapsed() < duration {
            let frequency = session.step()?;
            info!(frequency, "now playing");
        }
    }

    drop(stream);
    Ok(session)
}
