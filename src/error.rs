use std::path::PathBuf;

use thiserror::Error;

use crate::decoder::DecodeError;
use crate::unwrap::UnwrapError;

#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("Filename '{}' does not match the series naming pattern: {reason}", path.display())]
    PatternMismatch { path: PathBuf, reason: &'static str },

    #[error("No files matching '{pattern}' found in '{}'", directory.display())]
    DiscoveryFailure { directory: PathBuf, pattern: String },

    #[error("Invalid unwrap configuration for '{algorithm}': {reason}")]
    ConfigurationFailure { algorithm: String, reason: String },

    #[error("Could not unwrap '{}': no mask provided", path.display())]
    UnwrapPrecondition { path: PathBuf },

    #[error(transparent)]
    Unwrap(#[from] UnwrapError),

    #[error("Slice {index} has shape {found:?}, expected {expected:?}")]
    StackingFailure {
        index: usize,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Could not decode '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mask image error: {0}")]
    MaskImage(#[from] image::ImageError),
}

impl SeriesError {
    pub(crate) fn unknown_algorithm(algorithm: &str) -> Self {
        Self::ConfigurationFailure {
            algorithm: algorithm.to_owned(),
            reason: "no algorithm registered under this name".to_owned(),
        }
    }
}
