use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReframeError {
    #[error("Source unreadable: {0}")]
    SourceUnreadable(String),

    #[error("Empty frame sequence: {0}")]
    EmptySequence(String),

    #[error("Frame {index} is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    DimensionMismatch {
        index: usize,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Coarse error category reported back to callers alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SourceUnreadable,
    EmptySequence,
    DimensionMismatch,
    InvalidParameter,
    UnsupportedFormat,
    Io,
    Media,
    Config,
}

impl ReframeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReframeError::SourceUnreadable(_) => ErrorKind::SourceUnreadable,
            ReframeError::EmptySequence(_) => ErrorKind::EmptySequence,
            ReframeError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            ReframeError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            ReframeError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            ReframeError::Io(_) => ErrorKind::Io,
            ReframeError::Image(_) | ReframeError::Media(_) => ErrorKind::Media,
            ReframeError::Json(_) | ReframeError::Toml(_) | ReframeError::Config(_) => {
                ErrorKind::Config
            }
        }
    }

    /// True when the caller can fix the failure by changing its input.
    /// Everything else points at the pipeline or its environment.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::SourceUnreadable | ErrorKind::InvalidParameter | ErrorKind::UnsupportedFormat
        )
    }
}

pub type Result<T> = std::result::Result<T, ReframeError>;
