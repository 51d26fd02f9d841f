//! Shared types for the wavebank buffering core.
//!
//! - [`frame`]     : frame sizes, stereo/phase types, interleaving
//! - [`frequency`] : integer frequency keys and the frequency table
//! - [`error`]     : error enums for buffering and configuration
//! - [`config`]    : JSON bank configuration

pub mod config;
pub mod error;
pub mod frame;
pub mod frequency;

pub use config::{BankConfig, WaveformKind};
pub use error::{BufferError, BufferResult, ConfigError, ConfigResult};
pub use frame::{
    GeneratorOutput, MonoFrame, PhasePair, StereoFrame, StereoSample, MONO_BUFFER_SIZE,
    SAMPLE_RATE, STEREO_BUFFER_SIZE,
};
pub use frequency::{FrequencyKey, FrequencyTable};
