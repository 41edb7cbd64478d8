//! Compression handler trait definition

use crate::tiff::errors::TiffResult;

/// Strategy trait for one TIFF compression scheme
pub trait CompressionHandler: Send + Sync {
    /// Decompress one chunk
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>>;

    /// Compress one chunk; output must depend only on `data`
    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>>;

    /// Human readable name
    fn name(&self) -> &'static str;

    /// Value of the TIFF `Compression` tag
    fn code(&self) -> u16;
}
