//! Encoder error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("invalid session geometry {width}x{height}: hardware encoding requires even dimensions")]
    InvalidGeometry { width: u32, height: u32 },

    #[error("session already finalized")]
    SessionClosed,

    #[error("encoder initialization failed: {0}")]
    InitFailed(String),

    #[error("frame encoding failed: {0}")]
    EncodeFailed(String),

    #[error("audio write failed: {0}")]
    AudioWriteFailed(String),

    #[error("frame buffer too small: expected at least {expected} bytes, got {actual}")]
    FrameSizeMismatch { expected: usize, actual: usize },

    #[error("external encoder not found: {0}")]
    ToolNotFound(String),

    #[error("external encoder failed (exit code {code:?}): {stderr}")]
    ExternalEncoder { code: Option<i32>, stderr: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EncoderResult<T> = Result<T, EncoderError>;
