//! GeoTIFF tag strategies
//!
//! The tags that place a raster on the map: `ModelPixelScale`,
//! `ModelTiepoint` and a `GeoKeyDirectory` naming the EPSG code.

use std::collections::BTreeMap;
use log::debug;

use crate::tiff::constants::{field_types, geo_keys, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{IFD, IFDEntry};

/// Georeferencing of a north-up raster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTiffTags {
    /// Pixel size in CRS units (x, y, z)
    pub pixel_scale: [f64; 3],
    /// Raster point (i, j, k) tied to model point (x, y, z)
    pub tiepoint: [f64; 6],
    pub epsg: u32,
    /// Geographic (degrees) instead of projected CRS
    pub geographic: bool,
}

impl GeoTiffTags {
    /// Key entries in ascending key order, four SHORTs each
    pub fn geo_keys(&self) -> TiffResult<Vec<[u16; 4]>> {
        let code = u16::try_from(self.epsg).map_err(|_| TiffError::GenericError(format!(
            "EPSG code {} does not fit a GeoTIFF key", self.epsg
        )))?;

        let (model_type, cs_key) = if self.geographic {
            (geo_keys::MODEL_TYPE_GEOGRAPHIC, geo_keys::GEOGRAPHIC_TYPE)
        } else {
            (geo_keys::MODEL_TYPE_PROJECTED, geo_keys::PROJECTED_CS_TYPE)
        };

        Ok(vec![
            [geo_keys::GT_MODEL_TYPE, 0, 1, model_type],
            [geo_keys::GT_RASTER_TYPE, 0, 1, geo_keys::RASTER_PIXEL_IS_AREA],
            [cs_key, 0, 1, code],
        ])
    }
}

/// Handles GeoTIFF tags
pub struct GeoTagsBuilder;

impl GeoTagsBuilder {
    pub fn add_georeference(
        ifd: &mut IFD,
        external_data: &mut BTreeMap<(usize, u16), Vec<u8>>,
        ifd_index: usize,
        geo: &GeoTiffTags,
    ) -> TiffResult<()> {
        debug!("Adding georeference to IFD #{}: EPSG:{}, scale {:?}", ifd_index, geo.epsg, geo.pixel_scale);

        Self::add_doubles(ifd, external_data, ifd_index, tags::MODEL_PIXEL_SCALE_TAG, &geo.pixel_scale);
        Self::add_doubles(ifd, external_data, ifd_index, tags::MODEL_TIEPOINT_TAG, &geo.tiepoint);

        let keys = geo.geo_keys()?;
        let [version, revision, minor] = geo_keys::DIRECTORY_VERSION;
        let mut directory = vec![version, revision, minor, keys.len() as u16];
        for key in &keys {
            directory.extend_from_slice(key);
        }

        let data: Vec<u8> = directory.iter().flat_map(|v| v.to_le_bytes()).collect();
        ifd.add_entry(IFDEntry::new(tags::GEO_KEY_DIRECTORY_TAG, field_types::SHORT, directory.len() as u64, 0));
        external_data.insert((ifd_index, tags::GEO_KEY_DIRECTORY_TAG), data);

        Ok(())
    }

    fn add_doubles(
        ifd: &mut IFD,
        external_data: &mut BTreeMap<(usize, u16), Vec<u8>>,
        ifd_index: usize,
        tag: u16,
        values: &[f64],
    ) {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        ifd.add_entry(IFDEntry::new(tag, field_types::DOUBLE, values.len() as u64, 0));
        external_data.insert((ifd_index, tag), data);
    }
}
