//! GeoTIFF metadata and GeoKey parsing
//!
//! Reads the GeoKey directory and the model tags back from an IFD. All
//! values go through [`TiffReader`], so inline and out-of-line storage and
//! both byte orders are handled the same way.

use log::debug;

use crate::io::seekable::SeekableReader;
use crate::tiff::builders::geo_tags::GeoTiffTags;
use crate::tiff::constants::{epsg, geo_keys, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;
use crate::utils::tag_utils::get_geo_key_name;

/// One entry of the GeoKey directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoKeyEntry {
    pub key_id: u16,
    /// 0 when the value is stored in `value_offset`, otherwise the tag holding it
    pub tiff_tag_location: u16,
    pub count: u16,
    pub value_offset: u16,
}

impl GeoKeyEntry {
    pub fn new(key_id: u16, tiff_tag_location: u16, count: u16, value_offset: u16) -> Self {
        GeoKeyEntry { key_id, tiff_tag_location, count, value_offset }
    }

    pub fn name(&self) -> &'static str {
        get_key_name(self.key_id)
    }

    /// The value when it is stored inline in the directory
    pub fn inline_value(&self) -> Option<u16> {
        (self.tiff_tag_location == 0).then_some(self.value_offset)
    }
}

/// Name of a GeoKey
pub fn get_key_name(key_id: u16) -> &'static str {
    get_geo_key_name(key_id)
}

/// Parser for GeoTIFF geographic metadata
pub struct GeoKeyParser;

impl GeoKeyParser {
    /// Parse the GeoKey directory of an IFD, empty when the tag is absent
    pub fn parse_geo_key_directory(
        tiff_reader: &TiffReader,
        reader: &mut dyn SeekableReader,
        ifd: &IFD,
    ) -> TiffResult<Vec<GeoKeyEntry>> {
        if !ifd.has_tag(tags::GEO_KEY_DIRECTORY_TAG) {
            return Ok(Vec::new());
        }

        let values = tiff_reader.read_tag_values(reader, ifd, tags::GEO_KEY_DIRECTORY_TAG)?;
        if values.len() < 4 {
            return Err(TiffError::GenericError("Invalid GeoKey directory header".to_string()));
        }

        let key_count = values[3] as usize;
        debug!("GeoKey directory: version={}, revision={}.{}, keys={}",
               values[0], values[1], values[2], key_count);

        if values.len() < 4 + key_count * 4 {
            return Err(TiffError::GenericError(format!(
                "GeoKey directory declares {} keys but holds {} values", key_count, values.len()
            )));
        }

        let keys = values[4..4 + key_count * 4]
            .chunks_exact(4)
            .map(|k| GeoKeyEntry::new(k[0] as u16, k[1] as u16, k[2] as u16, k[3] as u16))
            .collect();

        Ok(keys)
    }

    pub fn read_model_pixel_scale_values(
        tiff_reader: &TiffReader,
        reader: &mut dyn SeekableReader,
        ifd: &IFD,
    ) -> TiffResult<Vec<f64>> {
        tiff_reader.read_tag_f64_values(reader, ifd, tags::MODEL_PIXEL_SCALE_TAG)
    }

    pub fn read_model_tiepoint_values(
        tiff_reader: &TiffReader,
        reader: &mut dyn SeekableReader,
        ifd: &IFD,
    ) -> TiffResult<Vec<f64>> {
        tiff_reader.read_tag_f64_values(reader, ifd, tags::MODEL_TIEPOINT_TAG)
    }

    /// Collects the georeferencing of an IFD
    pub fn extract_geo_info(
        tiff_reader: &TiffReader,
        reader: &mut dyn SeekableReader,
        ifd: &IFD,
    ) -> TiffResult<GeoInfo> {
        let mut geo_info = GeoInfo::default();

        for key in Self::parse_geo_key_directory(tiff_reader, reader, ifd)? {
            match (key.key_id, key.inline_value()) {
                (geo_keys::GT_MODEL_TYPE, Some(value)) => {
                    geo_info.geographic = value == geo_keys::MODEL_TYPE_GEOGRAPHIC;
                }
                (geo_keys::PROJECTED_CS_TYPE, Some(value)) => geo_info.epsg_code = value as u32,
                (geo_keys::GEOGRAPHIC_TYPE, Some(value)) if geo_info.epsg_code == 0 => {
                    geo_info.epsg_code = value as u32;
                }
                _ => {}
            }
        }

        if ifd.has_tag(tags::MODEL_PIXEL_SCALE_TAG) {
            let scale = Self::read_model_pixel_scale_values(tiff_reader, reader, ifd)?;
            if scale.len() >= 2 {
                geo_info.pixel_scale = Some([scale[0], scale[1], scale.get(2).copied().unwrap_or(0.0)]);
            }
        }

        if ifd.has_tag(tags::MODEL_TIEPOINT_TAG) {
            let tie = Self::read_model_tiepoint_values(tiff_reader, reader, ifd)?;
            if tie.len() >= 6 {
                geo_info.tiepoint = Some([tie[0], tie[1], tie[2], tie[3], tie[4], tie[5]]);
            }
        }

        Ok(geo_info)
    }

    /// Keys with their decoded values, for display
    pub fn format_geo_keys(
        tiff_reader: &TiffReader,
        reader: &mut dyn SeekableReader,
        ifd: &IFD,
    ) -> TiffResult<Vec<(GeoKeyEntry, String)>> {
        let keys = Self::parse_geo_key_directory(tiff_reader, reader, ifd)?;
        let mut result = Vec::with_capacity(keys.len());

        for key in keys {
            let value = match key.tiff_tag_location {
                0 => key.value_offset.to_string(),
                tags::GEO_ASCII_PARAMS_TAG => {
                    let text = tiff_reader.read_tag_ascii(reader, ifd, tags::GEO_ASCII_PARAMS_TAG)?;
                    let start = (key.value_offset as usize).min(text.len());
                    let end = (start + key.count as usize).min(text.len());
                    text.get(start..end).unwrap_or("").trim_end_matches('|').to_string()
                }
                tags::GEO_DOUBLE_PARAMS_TAG => {
                    let doubles = tiff_reader.read_tag_f64_values(reader, ifd, tags::GEO_DOUBLE_PARAMS_TAG)?;
                    doubles.get(key.value_offset as usize)
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "Unknown".to_string())
                }
                _ => "Unknown".to_string(),
            };
            result.push((key, value));
        }

        Ok(result)
    }

    /// Human-readable name of the coordinate system
    pub fn format_projection_string(geo_info: &GeoInfo) -> String {
        match geo_info.epsg_code {
            0 => "Unknown projection".to_string(),
            epsg::WGS84_WEB_MERCATOR => "Web Mercator (EPSG:3857)".to_string(),
            epsg::WGS84 => "WGS84 Geographic (EPSG:4326)".to_string(),
            code if geo_info.geographic => format!("Geographic CS EPSG:{}", code),
            code => format!("EPSG:{}", code),
        }
    }
}

/// Georeferencing read back from a GeoTIFF
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoInfo {
    /// EPSG code of the projected or geographic CRS, 0 when unknown
    pub epsg_code: u32,
    pub geographic: bool,
    pub pixel_scale: Option<[f64; 3]>,
    pub tiepoint: Option<[f64; 6]>,
}

impl GeoInfo {
    pub fn is_georeferenced(&self) -> bool {
        self.pixel_scale.is_some() && self.tiepoint.is_some()
    }

    /// World coordinates of the top-left corner of pixel (0, 0)
    pub fn origin(&self) -> Option<(f64, f64)> {
        let scale = self.pixel_scale?;
        let tie = self.tiepoint?;
        Some((tie[3] - tie[0] * scale[0], tie[4] + tie[1] * scale[1]))
    }

    /// (min_x, min_y, max_x, max_y) in CRS units
    pub fn get_bounds(&self, width: u32, height: u32) -> Option<(f64, f64, f64, f64)> {
        let scale = self.pixel_scale?;
        let (min_x, max_y) = self.origin()?;
        let max_x = min_x + width as f64 * scale[0];
        let min_y = max_y - height as f64 * scale[1];
        Some((min_x, min_y, max_x, max_y))
    }

    /// The tags needed to write the same georeferencing again
    pub fn to_tags(&self) -> Option<GeoTiffTags> {
        if self.epsg_code == 0 {
            return None;
        }
        Some(GeoTiffTags {
            pixel_scale: self.pixel_scale?,
            tiepoint: self.tiepoint?,
            epsg: self.epsg_code,
            geographic: self.geographic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> GeoInfo {
        GeoInfo {
            epsg_code: 3857,
            geographic: false,
            pixel_scale: Some([2.0, 3.0, 0.0]),
            tiepoint: Some([0.0, 0.0, 0.0, 100.0, 500.0, 0.0]),
        }
    }

    #[test]
    fn bounds_from_tiepoint() {
        assert_eq!(info().get_bounds(10, 20), Some((100.0, 440.0, 120.0, 500.0)));
    }

    #[test]
    fn origin_with_offset_tiepoint() {
        let mut geo = info();
        geo.tiepoint = Some([1.0, 2.0, 0.0, 102.0, 494.0, 0.0]);
        assert_eq!(geo.origin(), Some((100.0, 500.0)));
    }

    #[test]
    fn projection_names() {
        assert_eq!(GeoKeyParser::format_projection_string(&info()), "Web Mercator (EPSG:3857)");
        let utm = GeoInfo { epsg_code: 32633, ..info() };
        assert_eq!(GeoKeyParser::format_projection_string(&utm), "EPSG:32633");
        assert_eq!(GeoKeyParser::format_projection_string(&GeoInfo::default()), "Unknown projection");
    }

    #[test]
    fn tags_need_an_epsg_code() {
        assert!(info().to_tags().is_some());
        assert!(GeoInfo { epsg_code: 0, ..info() }.to_tags().is_none());
    }
}
