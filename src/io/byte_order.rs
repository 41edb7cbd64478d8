//! Byte order handling for TIFF files
//!
//! Reading goes through the [`ByteOrderHandler`] strategy so the reader can
//! stay agnostic of the file's endianness. Both handlers share one generic
//! implementation over `byteorder`'s marker types.

use byteorder::{BigEndian, ByteOrder as Endianness, LittleEndian, ReadBytesExt};
use std::io::Result;
use std::marker::PhantomData;

use crate::io::seekable::SeekableReader;
use crate::tiff::errors::{TiffError, TiffResult};

/// Represents the byte order of a TIFF file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian byte order (II)
    LittleEndian,
    /// Big-endian byte order (MM)
    BigEndian,
}

impl ByteOrder {
    /// Detects the byte order from the TIFF header
    pub fn detect(reader: &mut dyn SeekableReader) -> TiffResult<Self> {
        let marker = reader.read_u16::<LittleEndian>()?;
        match marker {
            0x4949 => Ok(ByteOrder::LittleEndian), // "II"
            0x4D4D => Ok(ByteOrder::BigEndian),    // "MM"
            _ => Err(TiffError::InvalidByteOrder(marker)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ByteOrder::LittleEndian => "Little Endian (II)",
            ByteOrder::BigEndian => "Big Endian (MM)",
        }
    }

    /// Creates the appropriate handler for this byte order
    pub fn create_handler(&self) -> Box<dyn ByteOrderHandler> {
        match self {
            ByteOrder::LittleEndian => Box::new(LittleEndianHandler::new()),
            ByteOrder::BigEndian => Box::new(BigEndianHandler::new()),
        }
    }
}

/// Trait for byte order handling strategies
pub trait ByteOrderHandler: Send + Sync {
    fn byte_order(&self) -> ByteOrder;

    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16>;

    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32>;

    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64>;

    fn read_f32(&self, reader: &mut dyn SeekableReader) -> Result<f32>;

    fn read_f64(&self, reader: &mut dyn SeekableReader) -> Result<f64>;

    /// Read a rational value (numerator, denominator)
    fn read_rational(&self, reader: &mut dyn SeekableReader) -> Result<(u32, u32)> {
        let numerator = self.read_u32(reader)?;
        let denominator = self.read_u32(reader)?;
        Ok((numerator, denominator))
    }
}

/// Handler for one concrete byte order
pub struct EndianHandler<E: Endianness> {
    marker: PhantomData<E>,
}

impl<E: Endianness> EndianHandler<E> {
    pub fn new() -> Self {
        EndianHandler { marker: PhantomData }
    }
}

impl<E: Endianness> Default for EndianHandler<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Little-endian byte order handler
pub type LittleEndianHandler = EndianHandler<LittleEndian>;

/// Big-endian byte order handler
pub type BigEndianHandler = EndianHandler<BigEndian>;

/// Maps a `byteorder` marker type back to the TIFF byte order
pub trait TiffEndianness: Endianness + Send + Sync {
    const ORDER: ByteOrder;
}

impl TiffEndianness for LittleEndian {
    const ORDER: ByteOrder = ByteOrder::LittleEndian;
}

impl TiffEndianness for BigEndian {
    const ORDER: ByteOrder = ByteOrder::BigEndian;
}

impl<E: TiffEndianness> ByteOrderHandler for EndianHandler<E> {
    fn byte_order(&self) -> ByteOrder {
        E::ORDER
    }

    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16> {
        reader.read_u16::<E>()
    }

    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32> {
        reader.read_u32::<E>()
    }

    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64> {
        reader.read_u64::<E>()
    }

    fn read_f32(&self, reader: &mut dyn SeekableReader) -> Result<f32> {
        reader.read_f32::<E>()
    }

    fn read_f64(&self, reader: &mut dyn SeekableReader) -> Result<f64> {
        reader.read_f64::<E>()
    }
}
