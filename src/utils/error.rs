//! Error Handling Module
//!
//! Defines the error type shared by the waste classifier library.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for waste classifier operations
#[derive(Error, Debug)]
pub enum WasteError {
    /// Error loading or decoding an image
    #[error("Failed to load image at '{0}': {1}")]
    ImageLoad(PathBuf, String),

    /// Error with dataset layout or contents
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Error with model construction, loading or saving
    #[error("Model error: {0}")]
    Model(String),

    /// Error with the quantized artifact
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// The artifact declares a tensor dtype the runtime cannot feed
    #[error("Unsupported tensor dtype: {0}")]
    UnsupportedDtype(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

/// Convenience Result type for waste classifier operations
pub type Result<T> = std::result::Result<T, WasteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WasteError::Dataset("no class directories".to_string());
        assert_eq!(format!("{}", err), "Dataset error: no class directories");
    }

    #[test]
    fn test_unsupported_dtype_display() {
        let err = WasteError::UnsupportedDtype("Int8".to_string());
        assert!(format!("{}", err).contains("Int8"));
    }

    #[test]
    fn test_image_load_error() {
        let path = PathBuf::from("/path/to/image.jpg");
        let err = WasteError::ImageLoad(path, "file not found".to_string());
        assert!(format!("{}", err).contains("image.jpg"));
    }
}
