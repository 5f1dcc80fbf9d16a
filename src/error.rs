//! Error types for geolocip.

use thiserror::Error;

/// Error type for geolocip operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Download error
    #[error("download error: {0}")]
    Download(String),

    /// Zip archive error
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Archive is readable but does not contain the expected table files
    #[error("unexpected archive layout: {0}")]
    ArchiveLayout(String),
}

/// Result type alias for geolocip operations.
pub type Result<T> = std::result::Result<T, Error>;
