//! Error types for LoopSonic

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoopSonicError {
    /// A marker arrangement broke `track_start <= loop_start < loop_end <= track_end`.
    /// The region is left exactly as it was before the call.
    #[error("Invalid loop configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Argument out of range: {0}")]
    ArgumentRange(String),

    /// Failure reported by the decoded source, passed through untouched.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stream has been disposed")]
    Disposed,

    #[error("Audio loading error: {0}")]
    AudioLoading(String),

    #[error("Audio format error: {0}")]
    AudioFormat(String),

    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Engine error: {0}")]
    Engine(String),
}

pub type Result<T> = std::result::Result<T, LoopSonicError>;
