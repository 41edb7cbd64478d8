//! TIFF validation utilities
//!
//! Checks applied while reading so malformed files fail with a clear error
//! instead of a seek to nowhere.

use log::{debug, error};

use crate::io::seekable::SeekableReader;
use crate::io::byte_order::ByteOrderHandler;
use crate::tiff::constants::{header, planar_config};
use crate::tiff::errors::{TiffError, TiffResult};

/// Validates an IFD offset against the file size
pub fn validate_ifd_offset(offset: u64, file_size: u64) -> TiffResult<()> {
    if offset >= file_size || offset < header::CLASSIC_HEADER_SIZE {
        return Err(TiffError::GenericError(format!(
            "Invalid IFD offset: {} (file size: {})",
            offset, file_size
        )));
    }

    Ok(())
}

/// Validates that a data block lies inside the file
pub fn validate_data_range(offset: u64, length: u64, file_size: u64) -> TiffResult<()> {
    match offset.checked_add(length) {
        Some(end) if end <= file_size => Ok(()),
        _ => Err(TiffError::GenericError(format!(
            "Data block at {} with length {} runs past the end of the file ({} bytes)",
            offset, length, file_size
        ))),
    }
}

/// Validates the BigTIFF header fields following the version number
pub fn validate_bigtiff_header(
    reader: &mut dyn SeekableReader,
    byte_order_handler: &dyn ByteOrderHandler,
) -> TiffResult<()> {
    let offset_size = byte_order_handler.read_u16(reader)?;
    let zeros = byte_order_handler.read_u16(reader)?;

    debug!("BigTIFF offset size: {}, reserved: {}", offset_size, zeros);

    if offset_size != header::BIGTIFF_OFFSET_SIZE || zeros != 0 {
        error!("Invalid BigTIFF header: offset_size={}, zeros={}", offset_size, zeros);
        return Err(TiffError::InvalidBigTIFFHeader);
    }

    Ok(())
}

/// Only 8-bit interleaved samples are decoded
pub fn validate_sample_layout(bits_per_sample: u64, planar: u64) -> TiffResult<()> {
    if bits_per_sample != 8 {
        return Err(TiffError::UnsupportedLayout(format!("{} bits per sample", bits_per_sample)));
    }
    if planar != planar_config::CHUNKY as u64 {
        return Err(TiffError::UnsupportedLayout(format!("planar configuration {}", planar)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_inside_the_file() {
        assert!(validate_ifd_offset(8, 100).is_ok());
        assert!(validate_ifd_offset(4, 100).is_err());
        assert!(validate_ifd_offset(100, 100).is_err());
    }

    #[test]
    fn data_ranges() {
        assert!(validate_data_range(10, 90, 100).is_ok());
        assert!(validate_data_range(10, 91, 100).is_err());
        assert!(validate_data_range(u64::MAX, 2, 100).is_err());
    }

    #[test]
    fn sample_layouts() {
        assert!(validate_sample_layout(8, 1).is_ok());
        assert!(matches!(validate_sample_layout(16, 1), Err(TiffError::UnsupportedLayout(_))));
        assert!(matches!(validate_sample_layout(8, 2), Err(TiffError::UnsupportedLayout(_))));
    }
}
