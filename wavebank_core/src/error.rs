use thiserror::Error;

/// Failures of the buffering core. All of them point at a caller or
/// configuration mistake, none are transient.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BufferError {
    #[error("destination holds {actual} samples, a frame is exactly {expected}")]
    InvalidDestinationSize { expected: usize, actual: usize },

    #[error("frequency {hz} Hz was never preloaded")]
    UnknownFrequency { hz: f32 },

    #[error("preload cache used before initialize()")]
    CacheNotInitialized,
}

/// Result of a buffering operation.
pub type BufferResult<T> = Result<T, BufferError>;

/// Failures while building or loading a bank configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frequency table is empty")]
    EmptyFrequencyTable,

    #[error("invalid frequency {hz} Hz (must be finite and positive)")]
    InvalidFrequency { hz: f32 },

    #[error("invalid amplitude {value} (must be within 0.0..=1.0)")]
    InvalidAmplitude { value: f32 },

    #[error("invalid MIDI note range {low}..={high}")]
    InvalidNoteRange { low: u8, high: u8 },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
