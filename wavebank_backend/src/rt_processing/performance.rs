use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use quanta::{Clock, Instant as QuantaInstant};
use wavebank_core::{SAMPLE_RATE, STEREO_BUFFER_SIZE};

/// EMA weight applied to each new refill duration.
const DEFAULT_EMA_ALPHA: f64 = 0.1;

/// Snapshot of buffering metrics, taken off the real-time path.
#[derive(Debug, Clone)]
pub struct PerformanceSnapshot {
    /// Frames written into the next slot.
    pub refill_count: u64,
    /// Switches that promoted a new frame.
    pub switch_count: u64,
    /// Switches that found nothing to promote (the consumer got ahead).
    pub stale_switch_count: u64,
    /// Successful `get_current` copies.
    pub read_count: u64,
    /// `get_current` calls rejected for a wrong destination size.
    pub rejected_read_count: u64,
    pub min_refill_nanos: Option<u64>,
    pub max_refill_nanos: Option<u64>,
    pub ema_refill_nanos: f64,
    /// Playback time covered by one frame.
    pub frame_period_nanos: f64,
    /// EMA refill time as a share of the frame period.
    pub refill_load_percent: f64,
    pub timestamp: Instant,
}

/// Counters for the producer and consumer sides of the frame buffers.
///
/// Every `increment_*`/`record_*` method is a handful of relaxed atomics and
/// is safe to call from an audio callback. [`snapshot`](Self::snapshot) is not.
pub struct PerformanceMonitor {
    clock: Clock,

    refill_count: AtomicU64,
    switch_count: AtomicU64,
    stale_switch_count: AtomicU64,
    read_count: AtomicU64,
    rejected_read_count: AtomicU64,

    min_refill_nanos: AtomicU64,
    max_refill_nanos: AtomicU64,
    /// f64 bits
    ema_refill_bits: AtomicU64,
    ema_alpha: f64,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMonitor {
    /// Monitor with the default EMA weight.
    pub fn new() -> Self {
        Self::with_ema_alpha(DEFAULT_EMA_ALPHA)
    }

    /// `ema_alpha` must be in (0, 1]; it is clamped into that range.
    pub fn with_ema_alpha(ema_alpha: f64) -> Self {
        Self {
            clock: Clock::new(),
            refill_count: AtomicU64::new(0),
            switch_count: AtomicU64::new(0),
            stale_switch_count: AtomicU64::new(0),
            read_count: AtomicU64::new(0),
            rejected_read_count: AtomicU64::new(0),
            min_refill_nanos: AtomicU64::new(u64::MAX),
            max_refill_nanos: AtomicU64::new(0),
            ema_refill_bits: AtomicU64::new(0),
            ema_alpha: ema_alpha.clamp(f64::EPSILON, 1.0),
        }
    }

    /// A switch promoted a new frame.
    #[inline(always)]
    pub fn increment_switches(&self) {
        self.switch_count.fetch_add(1, Ordering::Relaxed);
    }

    /// A switch found nothing to promote, or lost the handoff to a refill.
    #[inline(always)]
    pub fn increment_stale_switches(&self) {
        self.stale_switch_count.fetch_add(1, Ordering::Relaxed);
    }

    /// A `get_current` copy succeeded.
    #[inline(always)]
    pub fn increment_reads(&self) {
        self.read_count.fetch_add(1, Ordering::Relaxed);
    }

    /// A `get_current` destination had the wrong length.
    #[inline(always)]
    pub fn increment_rejected_reads(&self) {
        self.rejected_read_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one completed refill and its duration.
    pub fn record_refill_nanos(&self, nanos: u64) {
        self.refill_count.fetch_add(1, Ordering::Relaxed);
        self.min_refill_nanos.fetch_min(nanos, Ordering::Relaxed);
        self.max_refill_nanos.fetch_max(nanos, Ordering::Relaxed);

        // EMA_new = alpha * x + (1 - alpha) * EMA_old; the first sample seeds it
        let alpha = self.ema_alpha;
        let _ = self
            .ema_refill_bits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |old_bits| {
                let old = f64::from_bits(old_bits);
                let new = if old_bits == 0 {
                    nanos as f64
                } else {
                    alpha * nanos as f64 + (1.0 - alpha) * old
                };
                Some(new.to_bits())
            });
    }

    /// Guard that records a refill when dropped.
    ///
    /// ```ignore
    /// let _timing = monitor.scoped_refill();
    /// // ... render and write the next frame ...
    /// ```
    #[inline(always)]
    pub fn scoped_refill(&self) -> RefillGuard<'_> {
        RefillGuard { monitor: self, start: self.clock.now() }
    }

    /// Not real-time safe.
    pub fn snapshot(&self) -> PerformanceSnapshot {
        let min_raw = self.min_refill_nanos.load(Ordering::Relaxed);
        let max_raw = self.max_refill_nanos.load(Ordering::Relaxed);
        let ema = f64::from_bits(self.ema_refill_bits.load(Ordering::Relaxed));
        let frame_period_nanos = STEREO_BUFFER_SIZE as f64 / SAMPLE_RATE as f64 * 1_000_000_000.0;

        PerformanceSnapshot {
            refill_count: self.refill_count.load(Ordering::Relaxed),
            switch_count: self.switch_count.load(Ordering::Relaxed),
            stale_switch_count: self.stale_switch_count.load(Ordering::Relaxed),
            read_count: self.read_count.load(Ordering::Relaxed),
            rejected_read_count: self.rejected_read_count.load(Ordering::Relaxed),
            min_refill_nanos: (min_raw != u64::MAX).then_some(min_raw),
            max_refill_nanos: (max_raw != 0).then_some(max_raw),
            ema_refill_nanos: ema,
            frame_period_nanos,
            refill_load_percent: ema / frame_period_nanos * 100.0,
            timestamp: Instant::now(),
        }
    }

    /// Zero every counter and forget the refill timings.
    pub fn reset_all(&self) {
        for counter in [
            &self.refill_count,
            &self.switch_count,
            &self.stale_switch_count,
            &self.read_count,
            &self.rejected_read_count,
            &self.max_refill_nanos,
            &self.ema_refill_bits,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.min_refill_nanos.store(u64::MAX, Ordering::Relaxed);
    }
}

/// Records elapsed time into the monitor on drop.
pub struct RefillGuard<'a> {
    monitor: &'a PerformanceMonitor,
    start: QuantaInstant,
}

impl Drop for RefillGuard<'_> {
    fn drop(&mut self) {
        let elapsed = self.monitor.clock.now().saturating_duration_since(self.start);
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.monitor.record_refill_nanos(nanos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let snap = PerformanceMonitor::new().snapshot();
        assert_eq!(snap.refill_count, 0);
        assert_eq!(snap.min_refill_nanos, None);
        assert_eq!(snap.max_refill_nanos, None);
        assert_eq!(snap.refill_load_percent, 0.0);
    }

    #[test]
    fn test_refill_stats() {
        let monitor = PerformanceMonitor::with_ema_alpha(0.5);
        monitor.record_refill_nanos(1_000);
        monitor.record_refill_nanos(3_000);

        let snap = monitor.snapshot();
        assert_eq!(snap.refill_count, 2);
        assert_eq!(snap.min_refill_nanos, Some(1_000));
        assert_eq!(snap.max_refill_nanos, Some(3_000));
        assert!((snap.ema_refill_nanos - 2_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_load_is_relative_to_frame_period() {
        let monitor = PerformanceMonitor::with_ema_alpha(1.0);
        let period = STEREO_BUFFER_SIZE as f64 / SAMPLE_RATE as f64 * 1e9;
        monitor.record_refill_nanos((period / 4.0) as u64);
        let snap = monitor.snapshot();
        assert!((snap.refill_load_percent - 25.0).abs() < 0.01);
    }

    #[test]
    fn test_scoped_refill_counts_once() {
        let monitor = PerformanceMonitor::new();
        {
            let _timing = monitor.scoped_refill();
        }
        assert_eq!(monitor.snapshot().refill_count, 1);
    }

    #[test]
    fn test_reset_all() {
        let monitor = PerformanceMonitor::new();
        monitor.increment_reads();
        monitor.increment_switches();
        monitor.record_refill_nanos(5);
        monitor.reset_all();

        let snap = monitor.snapshot();
        assert_eq!(snap.read_count, 0);
        assert_eq!(snap.switch_count, 0);
        assert_eq!(snap.min_refill_nanos, None);
    }
}
