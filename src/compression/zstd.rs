//! Handler for Zstandard compressed chunks

use log::trace;

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::CompressionHandler;

const LEVEL: i32 = 9;

/// Zstandard handler, compression code 50000
#[derive(Debug, Default, Clone, Copy)]
pub struct ZstdHandler;

impl ZstdHandler {
    pub fn new() -> Self {
        ZstdHandler
    }
}

impl CompressionHandler for ZstdHandler {
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        zstd::decode_all(data)
            .map_err(|e| TiffError::GenericError(format!("Zstandard decompression failed: {}", e)))
    }

    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let packed = zstd::encode_all(data, LEVEL)
            .map_err(|e| TiffError::GenericError(format!("Zstandard compression failed: {}", e)))?;
        trace!("zstd: {} -> {} bytes", data.len(), packed.len());
        Ok(packed)
    }

    fn name(&self) -> &'static str {
        "zstd"
    }

    fn code(&self) -> u16 {
        compression::ZSTD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_survives_compression() {
        let chunk: Vec<u8> = (0..4096u32).map(|i| (i % 17) as u8).collect();
        let packed = ZstdHandler.compress(&chunk).unwrap();
        assert_eq!(ZstdHandler.decompress(&packed).unwrap(), chunk);
        assert!(ZstdHandler.decompress(&[]).unwrap().is_empty());
    }
}
