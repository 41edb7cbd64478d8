//! Tag value decoding and display names
//!
//! Names come from small lookup tables; an unknown code displays as
//! `Unknown`.

use byteorder::ReadBytesExt;

use crate::io::seekable::SeekableReader;
use crate::io::byte_order::ByteOrderHandler;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFDEntry;
use crate::tiff::constants::{compression, field_types, geo_keys, photometric, tags};

const TAG_NAMES: &[(u16, &str)] = &[
    (tags::NEW_SUBFILE_TYPE, "NewSubfileType"),
    (tags::IMAGE_WIDTH, "ImageWidth"),
    (tags::IMAGE_LENGTH, "ImageLength"),
    (tags::BITS_PER_SAMPLE, "BitsPerSample"),
    (tags::COMPRESSION, "Compression"),
    (tags::PHOTOMETRIC_INTERPRETATION, "PhotometricInterpretation"),
    (tags::STRIP_OFFSETS, "StripOffsets"),
    (tags::SAMPLES_PER_PIXEL, "SamplesPerPixel"),
    (tags::ROWS_PER_STRIP, "RowsPerStrip"),
    (tags::STRIP_BYTE_COUNTS, "StripByteCounts"),
    (tags::PLANAR_CONFIGURATION, "PlanarConfiguration"),
    (tags::SOFTWARE, "Software"),
    (tags::PREDICTOR, "Predictor"),
    (tags::TILE_WIDTH, "TileWidth"),
    (tags::TILE_LENGTH, "TileLength"),
    (tags::TILE_OFFSETS, "TileOffsets"),
    (tags::TILE_BYTE_COUNTS, "TileByteCounts"),
    (tags::EXTRA_SAMPLES, "ExtraSamples"),
    (tags::SAMPLE_FORMAT, "SampleFormat"),
    (tags::MODEL_PIXEL_SCALE_TAG, "ModelPixelScale"),
    (tags::MODEL_TIEPOINT_TAG, "ModelTiepoint"),
    (tags::MODEL_TRANSFORMATION_TAG, "ModelTransformation"),
    (tags::GEO_KEY_DIRECTORY_TAG, "GeoKeyDirectory"),
    (tags::GEO_DOUBLE_PARAMS_TAG, "GeoDoubleParams"),
    (tags::GEO_ASCII_PARAMS_TAG, "GeoAsciiParams"),
];

const FIELD_TYPE_NAMES: &[(u16, &str)] = &[
    (field_types::BYTE, "BYTE"),
    (field_types::ASCII, "ASCII"),
    (field_types::SHORT, "SHORT"),
    (field_types::LONG, "LONG"),
    (field_types::RATIONAL, "RATIONAL"),
    (field_types::SBYTE, "SBYTE"),
    (field_types::UNDEFINED, "UNDEFINED"),
    (field_types::SSHORT, "SSHORT"),
    (field_types::SLONG, "SLONG"),
    (field_types::SRATIONAL, "SRATIONAL"),
    (field_types::FLOAT, "FLOAT"),
    (field_types::DOUBLE, "DOUBLE"),
    (field_types::LONG8, "LONG8"),
    (field_types::SLONG8, "SLONG8"),
    (field_types::IFD8, "IFD8"),
];

const COMPRESSION_NAMES: &[(u16, &str)] = &[
    (compression::NONE, "None"),
    (compression::LZW, "LZW"),
    (compression::JPEG, "JPEG"),
    (compression::DEFLATE, "Adobe Deflate"),
    (compression::OLD_DEFLATE, "Deflate"),
    (compression::PACKBITS, "PackBits"),
    (compression::ZSTD, "Zstandard"),
];

const PHOTOMETRIC_NAMES: &[(u16, &str)] = &[
    (photometric::WHITE_IS_ZERO, "WhiteIsZero"),
    (photometric::BLACK_IS_ZERO, "BlackIsZero"),
    (photometric::RGB, "RGB"),
    (photometric::PALETTE, "Palette"),
];

const GEO_KEY_NAMES: &[(u16, &str)] = &[
    (geo_keys::GT_MODEL_TYPE, "GTModelTypeGeoKey"),
    (geo_keys::GT_RASTER_TYPE, "GTRasterTypeGeoKey"),
    (geo_keys::GT_CITATION, "GTCitationGeoKey"),
    (geo_keys::GEOGRAPHIC_TYPE, "GeographicTypeGeoKey"),
    (geo_keys::GEOG_CITATION, "GeogCitationGeoKey"),
    (geo_keys::GEOG_ANGULAR_UNITS, "GeogAngularUnitsGeoKey"),
    (geo_keys::PROJECTED_CS_TYPE, "ProjectedCSTypeGeoKey"),
    (geo_keys::PROJ_CITATION, "PCSCitationGeoKey"),
    (geo_keys::PROJ_LINEAR_UNITS, "ProjLinearUnitsGeoKey"),
];

fn lookup(table: &[(u16, &'static str)], code: u64) -> &'static str {
    u16::try_from(code).ok()
        .and_then(|code| table.iter().find(|(c, _)| *c == code))
        .map(|(_, name)| *name)
        .unwrap_or("Unknown")
}

/// Size in bytes of one value of a field type
pub fn field_type_size(field_type: u16) -> usize {
    match field_type {
        field_types::SHORT | field_types::SSHORT => 2,
        field_types::LONG | field_types::SLONG | field_types::FLOAT => 4,
        field_types::RATIONAL | field_types::SRATIONAL | field_types::DOUBLE
        | field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => 8,
        _ => 1,
    }
}

/// Reads `entry.count` integers at the current position
///
/// Rationals are packed as `numerator << 32 | denominator`.
pub fn read_integers(
    reader: &mut dyn SeekableReader,
    entry: &IFDEntry,
    handler: &dyn ByteOrderHandler,
) -> TiffResult<Vec<u64>> {
    (0..entry.count)
        .map(|_| -> TiffResult<u64> {
            Ok(match entry.field_type {
                field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED | field_types::ASCII => {
                    reader.read_u8()? as u64
                }
                field_types::SHORT | field_types::SSHORT => handler.read_u16(reader)? as u64,
                field_types::LONG | field_types::SLONG | field_types::FLOAT => handler.read_u32(reader)? as u64,
                field_types::RATIONAL | field_types::SRATIONAL => {
                    let (num, den) = handler.read_rational(reader)?;
                    ((num as u64) << 32) | den as u64
                }
                field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => handler.read_u64(reader)?,
                other => return Err(TiffError::UnsupportedFieldType(other)),
            })
        })
        .collect()
}

/// Reads `entry.count` FLOAT or DOUBLE values at the current position
pub fn read_floats(
    reader: &mut dyn SeekableReader,
    entry: &IFDEntry,
    handler: &dyn ByteOrderHandler,
) -> TiffResult<Vec<f64>> {
    (0..entry.count)
        .map(|_| -> TiffResult<f64> {
            match entry.field_type {
                field_types::DOUBLE => Ok(handler.read_f64(reader)?),
                field_types::FLOAT => Ok(handler.read_f32(reader)? as f64),
                other => Err(TiffError::UnsupportedFieldType(other)),
            }
        })
        .collect()
}

pub fn get_tag_name(tag: u16) -> &'static str {
    lookup(TAG_NAMES, tag as u64)
}

pub fn get_field_type_name(field_type: u16) -> &'static str {
    lookup(FIELD_TYPE_NAMES, field_type as u64)
}

pub fn get_compression_name(compression_code: u64) -> &'static str {
    lookup(COMPRESSION_NAMES, compression_code)
}

pub fn get_photometric_name(photometric_code: u64) -> &'static str {
    lookup(PHOTOMETRIC_NAMES, photometric_code)
}

pub fn get_geo_key_name(key_id: u16) -> &'static str {
    lookup(GEO_KEY_NAMES, key_id as u64)
}
