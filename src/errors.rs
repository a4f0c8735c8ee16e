//! Custom error types for transcode planning and orchestration

use std::fmt;
use std::io;

/// Transcode-specific error types
#[derive(Debug)]
pub enum TranscodeError {
    /// I/O error
    IoError(io::Error),
    /// Source path does not exist or is not a regular file
    SourceNotFound(String),
    /// Extent transformation produced no usable points
    EmptyExtent(String),
    /// Target file already exists and the policy forbids replacing it
    TargetExists(String),
    /// Unsupported coordinate transformation
    UnsupportedTransform(String, String),
    /// Parameter combination that would silently produce wrong output
    UnsupportedCombination(String),
    /// The raster engine could not be invoked at all
    EngineUnavailable(String),
    /// Generic error with message
    GenericError(String),
}

impl fmt::Display for TranscodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscodeError::IoError(e) => write!(f, "I/O error: {}", e),
            TranscodeError::SourceNotFound(path) => write!(f, "Source not found: {}", path),
            TranscodeError::EmptyExtent(what) => write!(f, "Empty extent: {}", what),
            TranscodeError::TargetExists(path) => write!(f, "Target already exists: {}", path),
            TranscodeError::UnsupportedTransform(from, to) =>
                write!(f, "Unsupported coordinate transformation from {} to {}", from, to),
            TranscodeError::UnsupportedCombination(msg) =>
                write!(f, "Unsupported parameter combination: {}", msg),
            TranscodeError::EngineUnavailable(msg) => write!(f, "Raster engine unavailable: {}", msg),
            TranscodeError::GenericError(msg) => write!(f, "Transcode error: {}", msg),
        }
    }
}

impl std::error::Error for TranscodeError {}

impl From<io::Error> for TranscodeError {
    fn from(error: io::Error) -> Self {
        TranscodeError::IoError(error)
    }
}

/// Result type for transcode operations
pub type TranscodeResult<T> = Result<T, TranscodeError>;

impl From<String> for TranscodeError {
    fn from(msg: String) -> Self {
        TranscodeError::GenericError(msg)
    }
}
