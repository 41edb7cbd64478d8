//! TIFF file reader implementation
//!
//! Reads classic TIFF and BigTIFF files of either byte order through the
//! [`ByteOrderHandler`] strategy.
//!
//! Entry values that fit the value field are kept in `value_offset`: a
//! single value is decoded to its numeric value, several values are kept as
//! their raw file bytes packed into the field, and anything larger leaves
//! the file offset there. [`TiffReader::read_tag_values`] and friends hide
//! the difference.

use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufReader, Cursor, SeekFrom};
use std::path::{Path, PathBuf};

use crate::io::seekable::SeekableReader;
use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::tiff::constants::{field_types, header};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::types::TIFF;
use crate::tiff::validation;
use crate::utils::tag_utils;

/// Upper bound on the IFD chain, guards against offset loops
const MAX_IFDS: usize = 100;

/// Reader for TIFF and BigTIFF files
pub struct TiffReader {
    /// Current byte order handler
    byte_order_handler: Option<Box<dyn ByteOrderHandler>>,
    /// Path of the file passed to [`TiffReader::load`]
    current_file: Option<PathBuf>,
    /// Whether currently reading BigTIFF format
    is_big_tiff: bool,
}

impl Default for TiffReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TiffReader {
    pub fn new() -> Self {
        TiffReader {
            byte_order_handler: None,
            current_file: None,
            is_big_tiff: false,
        }
    }

    fn handler(&self) -> TiffResult<&dyn ByteOrderHandler> {
        self.byte_order_handler.as_deref()
            .ok_or_else(|| TiffError::GenericError("Byte order not yet determined".to_string()))
    }

    /// Opens a fresh reader on the file passed to [`TiffReader::load`]
    pub fn create_reader(&self) -> TiffResult<BufReader<File>> {
        match &self.current_file {
            Some(path) => Ok(BufReader::new(File::open(path)?)),
            None => Err(TiffError::GenericError("No file path specified".to_string())),
        }
    }

    /// Loads the structure of a TIFF file from disk
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> TiffResult<TIFF> {
        let path = path.as_ref();
        info!("Loading TIFF file: {}", path.display());
        self.current_file = Some(path.to_path_buf());

        let file = File::open(path)?;
        let mut reader = BufReader::with_capacity(1024 * 1024, file);

        self.read(&mut reader)
    }

    /// Reads the header and the whole IFD chain
    pub fn read(&mut self, reader: &mut dyn SeekableReader) -> TiffResult<TIFF> {
        reader.seek(SeekFrom::Start(0))?;

        let byte_order = ByteOrder::detect(reader)?;
        debug!("Detected byte order: {}", byte_order.name());
        let handler = byte_order.create_handler();

        let version = handler.read_u16(reader)?;
        self.is_big_tiff = match version {
            header::BIG_TIFF_VERSION => {
                validation::validate_bigtiff_header(reader, handler.as_ref())?;
                true
            }
            header::TIFF_VERSION => false,
            _ => return Err(TiffError::UnsupportedVersion(version)),
        };
        debug!("TIFF version {} ({})", version, if self.is_big_tiff { "BigTIFF" } else { "classic" });

        let first_ifd_offset = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u32(reader)? as u64
        };
        self.byte_order_handler = Some(handler);

        let file_size = reader.byte_len()?;
        validation::validate_ifd_offset(first_ifd_offset, file_size)?;

        let mut tiff = TIFF::new(self.is_big_tiff);
        tiff.ifds = self.read_ifd_chain(reader, first_ifd_offset, file_size)?;

        debug!("Read {} IFDs", tiff.ifds.len());
        Ok(tiff)
    }

    fn read_ifd_chain(&self, reader: &mut dyn SeekableReader, first_ifd_offset: u64, file_size: u64) -> TiffResult<Vec<IFD>> {
        let mut ifds = Vec::new();
        let mut ifd_offset = first_ifd_offset;

        while ifd_offset != 0 && ifds.len() < MAX_IFDS {
            let ifd = self.read_ifd(reader, ifd_offset, ifds.len())?;
            // read_ifd leaves the reader on the next-IFD pointer
            let next_ifd_offset = if self.is_big_tiff {
                self.handler()?.read_u64(reader)?
            } else {
                self.handler()?.read_u32(reader)? as u64
            };
            ifds.push(ifd);

            if next_ifd_offset != 0 && validation::validate_ifd_offset(next_ifd_offset, file_size).is_err() {
                warn!("Invalid next IFD offset {}, stopping IFD chain", next_ifd_offset);
                break;
            }
            ifd_offset = next_ifd_offset;
        }

        Ok(ifds)
    }

    /// Reads one IFD starting at `offset`
    pub fn read_ifd(&self, reader: &mut dyn SeekableReader, offset: u64, number: usize) -> TiffResult<IFD> {
        reader.seek(SeekFrom::Start(offset))?;
        let handler = self.handler()?;

        let entry_count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u16(reader)? as u64
        };

        let mut ifd = IFD::new(number, offset);
        for _ in 0..entry_count {
            let entry = self.read_ifd_entry(reader)?;
            ifd.add_entry(entry);
        }

        debug!("Read IFD #{} with {} entries at offset {}", number, ifd.entry_count(), offset);
        Ok(ifd)
    }

    fn read_ifd_entry(&self, reader: &mut dyn SeekableReader) -> TiffResult<IFDEntry> {
        let handler = self.handler()?;

        let tag = handler.read_u16(reader)?;
        let field_type = handler.read_u16(reader)?;
        let count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u32(reader)? as u64
        };

        let field_len = if self.is_big_tiff { 8 } else { 4 };
        let mut raw = [0u8; 8];
        reader.read_exact(&mut raw[..field_len])?;

        let mut entry = IFDEntry::new(tag, field_type, count, 0);
        entry.value_offset = if !entry.is_value_inline(self.is_big_tiff) {
            let mut field = Cursor::new(&raw[..field_len]);
            if self.is_big_tiff {
                handler.read_u64(&mut field)?
            } else {
                handler.read_u32(&mut field)? as u64
            }
        } else if count == 1 {
            decode_single(handler, field_type, &raw)?
        } else {
            u64::from_le_bytes(raw)
        };

        Ok(entry)
    }

    /// Positions `reader` on the values of `entry`, or returns them when inline
    fn value_source(
        &self,
        reader: &mut dyn SeekableReader,
        entry: &IFDEntry,
    ) -> TiffResult<Option<Cursor<[u8; 8]>>> {
        if entry.is_value_inline(self.is_big_tiff) {
            Ok(Some(Cursor::new(entry.value_offset.to_le_bytes())))
        } else {
            reader.seek(SeekFrom::Start(entry.value_offset))?;
            Ok(None)
        }
    }

    /// Reads a tag's integer values
    pub fn read_tag_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Vec<u64>> {
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;
        let handler = self.handler()?;

        if entry.count == 1 && entry.is_value_inline(self.is_big_tiff) {
            return Ok(vec![entry.value_offset]);
        }

        match self.value_source(reader, entry)? {
            Some(mut inline) => tag_utils::read_integers(&mut inline, entry, handler),
            None => tag_utils::read_integers(reader, entry, handler),
        }
    }

    /// Reads a tag's FLOAT or DOUBLE values
    pub fn read_tag_f64_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Vec<f64>> {
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;
        let handler = self.handler()?;

        if entry.count == 1 && entry.is_value_inline(self.is_big_tiff) {
            let value = match entry.field_type {
                field_types::DOUBLE => f64::from_bits(entry.value_offset),
                field_types::FLOAT => f32::from_bits(entry.value_offset as u32) as f64,
                other => return Err(TiffError::UnsupportedFieldType(other)),
            };
            return Ok(vec![value]);
        }

        match self.value_source(reader, entry)? {
            Some(mut inline) => tag_utils::read_floats(&mut inline, entry, handler),
            None => tag_utils::read_floats(reader, entry, handler),
        }
    }

    /// Reads an ASCII tag, without trailing NULs
    pub fn read_tag_ascii(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<String> {
        let bytes: Vec<u8> = self.read_tag_values(reader, ifd, tag)?
            .into_iter()
            .map(|b| b as u8)
            .collect();
        let text = String::from_utf8(bytes)
            .map_err(|e| TiffError::GenericError(format!("Invalid UTF-8 string: {}", e)))?;
        Ok(text.trim_end_matches('\0').to_string())
    }

    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    pub fn byte_order(&self) -> Option<ByteOrder> {
        self.byte_order_handler.as_ref().map(|handler| handler.byte_order())
    }
}

/// Decodes a single inline value from the raw value field
fn decode_single(handler: &dyn ByteOrderHandler, field_type: u16, raw: &[u8; 8]) -> TiffResult<u64> {
    let mut field = Cursor::new(&raw[..]);
    let value = match field_type {
        field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED | field_types::ASCII => raw[0] as u64,
        field_types::SHORT | field_types::SSHORT => handler.read_u16(&mut field)? as u64,
        field_types::LONG | field_types::SLONG | field_types::FLOAT => handler.read_u32(&mut field)? as u64,
        field_types::RATIONAL | field_types::SRATIONAL => {
            let (num, den) = handler.read_rational(&mut field)?;
            ((num as u64) << 32) | (den as u64)
        }
        field_types::DOUBLE | field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => handler.read_u64(&mut field)?,
        _ => u64::from_le_bytes(*raw),
    };
    Ok(value)
}
