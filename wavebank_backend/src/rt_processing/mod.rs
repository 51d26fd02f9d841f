//! Real-time buffering.
//!
//! Producer side: [`BufferManager`](buffer_manager::BufferManager), usually
//! driven by a [`RefillWorker`](refill::RefillWorker). Consumer side:
//! [`FrameBuffers`](frame_buffers::FrameBuffers), read directly or through a
//! [`FrameStreamer`](streamer::FrameStreamer) installed in a
//! [`CallbackSlot`](callback::CallbackSlot).

pub mod buffer_manager;
pub mod callback;
pub mod frame_buffers;
pub mod performance;
pub mod preload;
pub mod refill;
pub mod streamer;
pub mod waveform;
