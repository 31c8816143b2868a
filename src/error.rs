//! Error types for file operations.

use thiserror::Error;

/// Errors from reading or writing marker files and decoding images.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Marker file is not a JSON array of `{x, y, color}` objects
    #[error("invalid marker file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not decode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Errors from rendering and writing the flattened image.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("no image loaded")]
    NoImage,

    #[error("could not encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
