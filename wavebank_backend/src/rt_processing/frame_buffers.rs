//! Double-buffered output frames with an index-flip handoff.
//!
//! Two preallocated slots hold complete interleaved frames. An atomic index
//! names the slot the consumer reads ("current"); the other one ("next") belongs
//! to the producer. Promoting a frame flips the index, so a reader only ever
//! sees whole frames.
//!
//! Rules the producer side follows (all producer methods are crate-private and
//! driven by [`BufferManager`](super::buffer_manager::BufferManager)):
//! - the slot being written is picked and filled while holding `handoff`
//! - `ready` goes true only after the write is complete
//!
//! `switch` only *tries* to take `handoff`. If a refill is in flight it returns
//! `false` and the consumer keeps serving the current frame.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use spin::{Mutex, RwLock};
use wavebank_core::frame::silent_mono_frame;
use wavebank_core::{BufferError, BufferResult, MONO_BUFFER_SIZE, MonoFrame};

use super::performance::PerformanceMonitor;

/// The "current"/"next" frame pair shared between producer and consumers.
pub struct FrameBuffers {
    slots: [RwLock<Box<MonoFrame>>; 2],
    current: AtomicUsize,
    ready: AtomicBool,
    handoff: Mutex<()>,
    monitor: Arc<PerformanceMonitor>,
}

impl FrameBuffers {
    /// Two silent slots, nothing pending. `monitor` receives switch and read counts.
    pub fn new(monitor: Arc<PerformanceMonitor>) -> Self {
        Self {
            slots: [RwLock::new(silent_mono_frame()), RwLock::new(silent_mono_frame())],
            current: AtomicUsize::new(0),
            ready: AtomicBool::new(false),
            handoff: Mutex::new(()),
            monitor,
        }
    }

    #[inline]
    fn current_index(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    /// Run `f` on the current slot under its read guard.
    ///
    /// The index is checked again once the guard is held: between loading it
    /// and locking, a switch may have turned the slot into "next" and a refill
    /// may have written it.
    #[inline]
    fn read_current<R>(&self, f: impl FnOnce(&MonoFrame) -> R) -> R {
        loop {
            let index = self.current_index();
            let slot = self.slots[index].read();
            if self.current_index() == index {
                return f(&slot);
            }
        }
    }

    /// Copy the current frame into `destination`.
    ///
    /// `destination` must be exactly [`MONO_BUFFER_SIZE`] long; otherwise nothing
    /// is written and `InvalidDestinationSize` is returned.
    pub fn get_current(&self, destination: &mut [f32]) -> BufferResult<()> {
        if destination.len() != MONO_BUFFER_SIZE {
            self.monitor.increment_rejected_reads();
            return Err(BufferError::InvalidDestinationSize {
                expected: MONO_BUFFER_SIZE,
                actual: destination.len(),
            });
        }

        self.read_current(|frame| destination.copy_from_slice(&frame[..]));
        self.monitor.increment_reads();
        Ok(())
    }

    /// Read-only access to the current frame without copying, for observers
    /// such as an analyser.
    pub fn with_current<R>(&self, f: impl FnOnce(&MonoFrame) -> R) -> R {
        self.read_current(f)
    }

    /// Promote the prepared frame to current.
    ///
    /// Returns `true` if a frame was promoted. Returns `false` when nothing new
    /// was prepared since the last promotion, or a refill is being written right
    /// now; in both cases the current frame stays as it is. Never blocks.
    pub fn switch(&self) -> bool {
        let Some(_handoff) = self.handoff.try_lock() else {
            self.monitor.increment_stale_switches();
            return false;
        };

        if self.ready.swap(false, Ordering::AcqRel) {
            self.current.fetch_xor(1, Ordering::AcqRel);
            self.monitor.increment_switches();
            true
        } else {
            self.monitor.increment_stale_switches();
            false
        }
    }

    /// Whether a prepared frame is waiting to be promoted.
    pub fn is_next_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Monitor shared with the producer side.
    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    /// Overwrite the next slot and mark it ready.
    pub(crate) fn write_next(&self, write: impl FnOnce(&mut MonoFrame)) {
        {
            let _handoff = self.handoff.lock();
            // A frame still pending from an earlier refill is replaced, not promoted.
            self.ready.store(false, Ordering::Release);
            let next = self.current_index() ^ 1;
            let mut slot = self.slots[next].write();
            write(&mut slot);
        }
        // Published after the handoff is released so a switch that sees the
        // flag can always take the lock.
        self.ready.store(true, Ordering::Release);
    }

    /// Overwrite the current slot in place. Leaves `ready` untouched.
    pub(crate) fn write_current(&self, write: impl FnOnce(&mut MonoFrame)) {
        let _handoff = self.handoff.lock();
        let mut slot = self.slots[self.current_index()].write();
        write(&mut slot);
    }
}
