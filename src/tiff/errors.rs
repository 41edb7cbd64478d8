//! Errors of the native TIFF layer

use std::io;
use thiserror::Error;

/// Failure while reading, decoding or writing a TIFF file
#[derive(Debug, Error)]
pub enum TiffError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// First two bytes are neither `II` nor `MM`
    #[error("Invalid byte order marker: {0:#06x}")]
    InvalidByteOrder(u16),

    #[error("Invalid BigTIFF header")]
    InvalidBigTIFFHeader,

    /// Magic number other than 42 or 43
    #[error("Unsupported TIFF version: {0}")]
    UnsupportedVersion(u16),

    #[error("Tag not found: {0}")]
    TagNotFound(u16),

    #[error("Unsupported field type: {0}")]
    UnsupportedFieldType(u16),

    #[error("Unsupported compression method: {0}")]
    UnsupportedCompression(u64),

    #[error("Image dimensions not found")]
    MissingDimensions,

    /// Bit depth or planar configuration that is not 8-bit chunky
    #[error("Unsupported sample layout: {0}")]
    UnsupportedLayout(String),

    /// Offsets past 4 GiB in a file forced to classic TIFF
    #[error("{0} bytes exceed the classic TIFF limit, BigTIFF required")]
    FileTooLarge(u64),

    #[error("TIFF error: {0}")]
    GenericError(String),
}

impl From<String> for TiffError {
    fn from(msg: String) -> Self {
        TiffError::GenericError(msg)
    }
}

/// Result type for TIFF operations
pub type TiffResult<T> = Result<T, TiffError>;
