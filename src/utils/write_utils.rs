//! TIFF writing utilities
//!
//! Alignment and padding helpers shared by the layout planner and the writer.

use std::io::Write;

use crate::tiff::errors::TiffResult;

/// Align an offset to a 4-byte boundary
pub fn align_to_4_bytes(offset: u64) -> u64 {
    let remainder = offset % 4;
    if remainder == 0 {
        offset
    } else {
        offset + (4 - remainder)
    }
}

/// Write zero bytes until `position` reaches `target`
///
/// Returns the new position.
pub fn pad_to(writer: &mut impl Write, position: u64, target: u64) -> TiffResult<u64> {
    if target > position {
        writer.write_all(&vec![0u8; (target - position) as usize])?;
        Ok(target)
    } else {
        Ok(position)
    }
}
