//! TIFF file format module
//!
//! Reading and writing of TIFF and BigTIFF files, with the GeoTIFF tags
//! needed to georeference a raster.

pub mod errors;
pub mod ifd;
pub(crate) mod types;
pub mod reader;
pub mod raster_reader;
#[cfg(test)]
mod tests;
pub mod builder;
pub mod builders;
pub(crate) mod constants;
pub mod geo_key_parser;
pub(crate) mod validation;

pub use crate::io::byte_order::{BigEndianHandler, ByteOrder, ByteOrderHandler, LittleEndianHandler};
pub use errors::{TiffError, TiffResult};
pub use ifd::{IFD, IFDEntry};
pub use reader::TiffReader;
pub use raster_reader::{DecodedRaster, RasterReader};
pub use types::TIFF;
pub use geo_key_parser::{GeoInfo, GeoKeyEntry, GeoKeyParser, get_key_name};
pub use builder::TiffBuilder;
pub use builders::{GeoTiffTags, RasterLayout, TiffFormat};
