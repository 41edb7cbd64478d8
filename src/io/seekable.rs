//! Seekable reader trait
//!
//! A single object-safe trait combining `Read` and `Seek`, used by the TIFF
//! reader so files and in-memory cursors go through the same code.

use std::io::{Read, Result, Seek, SeekFrom};

/// Trait for readers that can both read and seek
pub trait SeekableReader: Read + Seek + Send + Sync {
    /// Total length of the underlying data, restoring the current position
    fn byte_len(&mut self) -> Result<u64> {
        let current = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(current))?;
        Ok(end)
    }
}

impl<T: Read + Seek + Send + Sync> SeekableReader for T {}
