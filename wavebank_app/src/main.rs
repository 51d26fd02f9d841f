//! `wavebank`: preloads a bank of stereo waveforms and streams it frame by
//! frame, stepping through the frequency table.

mod render;
mod session;

#[cfg(feature = "playback")]
mod playback;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wavebank_backend::PerformanceSnapshot;
use wavebank_core::{BankConfig, FrequencyKey};

use crate::session::Session;

#[derive(Debug, Parser)]
#[command(name = "wavebank", version, about = "Preloaded waveform bank streamer")]
struct Args {
    /// JSON bank configuration. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds of audio to produce.
    #[arg(short, long, default_value_t = 4.0)]
    duration: f64,

    /// Milliseconds spent on each frequency before stepping to the next.
    #[arg(long, default_value_t = 250)]
    step_ms: u64,

    /// Write a stereo 32-bit float WAV file instead of playing.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Play through the default output device.
    #[cfg(feature = "playback")]
    #[arg(long)]
    play: bool,

    /// Print the frequency table and exit.
    #[arg(long)]
    list_notes: bool,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    dump_config: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => BankConfig::from_path(path)?,
        None => BankConfig::default(),
    };

    if args.dump_config {
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }
    if args.list_notes {
        for (i, hz) in config.frequency_table()?.iter().enumerate() {
            if let Some(key) = FrequencyKey::from_hz(hz) {
                println!("{i:>3}  {key}");
            }
        }
        return Ok(());
    }

    if !(args.duration.is_finite() && args.duration > 0.0) {
        bail!("duration must be a positive number of seconds");
    }
    let duration = Duration::from_secs_f64(args.duration);
    let step = Duration::from_millis(args.step_ms.max(1));

    #[cfg(feature = "playback")]
    if args.play {
        let session = playback::play(&config, duration, step)?;
        report(session.finish()?);
        return Ok(());
    }

    let Some(out) = &args.out else {
        bail!("nothing to do: pass --out <file.wav>{}", play_hint());
    };
    let mut session = Session::start(&config, 2)?;
    render::render_to_wav(&mut session, out, duration, step)?;
    report(session.finish()?);
    Ok(())
}

fn play_hint() -> &'static str {
    if cfg!(feature = "playback") { " or --play" } else { "" }
}

fn report(snapshot: PerformanceSnapshot) {
    info!(
        refills = snapshot.refill_count,
        switches = snapshot.switch_count,
        stale_switches = snapshot.stale_switch_count,
        reads = snapshot.read_count,
        rejected_reads = snapshot.rejected_read_count,
        min_refill_us = snapshot.min_refill_nanos.map(|n| n as f64 / 1_000.0),
        max_refill_us = snapshot.max_refill_nanos.map(|n| n as f64 / 1_000.0),
        load_percent = %format!("{:.2}", snapshot.refill_load_percent),
        "buffering stats"
    );
}
