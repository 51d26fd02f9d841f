pub mod rt_processing;

pub use rt_processing::buffer_manager::BufferManager;
pub use rt_processing::callback::{AudioCallback, CallbackSlot};
pub use rt_processing::frame_buffers::FrameBuffers;
pub use rt_processing::performance::{PerformanceMonitor, PerformanceSnapshot};
pub use rt_processing::preload::{PreloadCache, PreloadEntry};
pub use rt_processing::refill::{RefillError, RefillTrigger, RefillWorker, VoiceSettings};
pub use rt_processing::streamer::FrameStreamer;
pub use rt_processing::waveform::{Generator, StereoVoice, Waveform};
