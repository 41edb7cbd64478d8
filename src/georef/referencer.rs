//! Placing a cropped mosaic on the map

use std::path::Path;
use log::{debug, info};

use super::geotransform::GeoTransform;
use crate::coordinate::{BoundingBox, CoordinateMapper, CoordinateSystem, CoordinateSystemFactory};
use crate::errors::{MosaicError, MosaicResult};
use crate::mosaic::{ChannelMode, PixelBuffer};
use crate::tiff::{DecodedRaster, GeoKeyParser, GeoTiffTags, RasterReader, TiffReader};

/// Pixels with their transform and CRS
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRaster {
    pub image: PixelBuffer,
    pub transform: GeoTransform,
    pub crs: CoordinateSystem,
}

impl GeoRaster {
    pub fn new(image: PixelBuffer, transform: GeoTransform, crs: CoordinateSystem) -> Self {
        GeoRaster { image, transform, crs }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn bands(&self) -> usize {
        self.image.channels()
    }

    /// (min_x, min_y, max_x, max_y) in CRS units
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.width(), self.height())
    }

    /// GeoTIFF tags describing this raster
    pub fn geo_tags(&self) -> GeoTiffTags {
        GeoTiffTags {
            pixel_scale: self.transform.pixel_scale(),
            tiepoint: self.transform.tiepoint(),
            epsg: self.crs.epsg_code(),
            geographic: self.crs.is_geographic(),
        }
    }

    /// Read the full-resolution image of a GeoTIFF
    ///
    /// Overviews are ignored. The file must carry a pixel scale, a tiepoint
    /// and an EPSG code.
    pub fn load<P: AsRef<Path>>(path: P) -> MosaicResult<Self> {
        let path = path.as_ref();
        let mut tiff_reader = TiffReader::new();
        let tiff = tiff_reader.load(path)?;
        let ifd = tiff.full_resolution_ifd().ok_or_else(|| {
            MosaicError::Projection(format!("{} contains no image", path.display()))
        })?;

        let mut reader = tiff_reader.create_reader()?;
        let geo = GeoKeyParser::extract_geo_info(&tiff_reader, &mut reader, ifd)?;
        let transform = GeoTransform::from_geo_info(&geo).ok_or_else(|| {
            MosaicError::Projection(format!("{} is not georeferenced", path.display()))
        })?;
        if geo.epsg_code == 0 {
            return Err(MosaicError::Projection(format!("{} has no EPSG code", path.display())));
        }

        let raster = RasterReader::new(&mut reader, ifd, &tiff_reader).read_image()?;
        debug!("Loaded {}x{} raster with {} samples from {}",
               raster.width, raster.height, raster.samples, path.display());

        Ok(GeoRaster {
            image: to_pixel_buffer(raster)?,
            transform,
            crs: CoordinateSystemFactory::from_epsg(geo.epsg_code),
        })
    }
}

/// Expand decoded samples to RGB or RGBA
fn to_pixel_buffer(raster: DecodedRaster) -> MosaicResult<PixelBuffer> {
    let DecodedRaster { width, height, samples, data } = raster;
    let (mode, data) = match samples {
        3 => (ChannelMode::Rgb, data),
        4 => (ChannelMode::Rgba, data),
        1 => (ChannelMode::Rgb, data.iter().flat_map(|&v| [v, v, v]).collect()),
        2 => (ChannelMode::Rgba, data.chunks_exact(2).flat_map(|p| [p[0], p[0], p[0], p[1]]).collect()),
        other => {
            return Err(MosaicError::BackendUnavailable(format!(
                "Rasters with {} samples per pixel are not supported", other)));
        }
    };
    PixelBuffer::from_raw(width, height, mode, data)
}

/// Computes the georeferencing of a cropped mosaic
pub struct GeoReferencer;

impl GeoReferencer {
    /// Georeference `image` as covering `bbox`, in Web Mercator
    ///
    /// The south-west and north-east corners are projected; the pixel size
    /// is the projected extent divided by the image size and the origin is
    /// the north-west corner.
    pub fn georeference(image: PixelBuffer, bbox: &BoundingBox) -> GeoRaster {
        let (min_x, min_y) = CoordinateMapper::deg_to_projected_meters(bbox.south, bbox.west);
        let (max_x, max_y) = CoordinateMapper::deg_to_projected_meters(bbox.north, bbox.east);
        let transform = GeoTransform::from_bounds(min_x, min_y, max_x, max_y, image.width(), image.height());

        info!("Georeferenced {}x{} image: origin ({:.3}, {:.3}), pixel {:.6} x {:.6} m",
              image.width(), image.height(), transform.origin_x, transform.origin_y,
              transform.pixel_width, -transform.pixel_height);

        GeoRaster::new(image, transform, CoordinateSystem::WebMercator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn reference_box_corners() {
        let bbox = BoundingBox::new(-83.1440, 42.3561, -83.1437, 42.3562);
        let raster = GeoReferencer::georeference(PixelBuffer::new_blank(7, 3, ChannelMode::Rgb), &bbox);

        let (min_x, min_y) = CoordinateMapper::deg_to_projected_meters(42.3561, -83.1440);
        let (max_x, max_y) = CoordinateMapper::deg_to_projected_meters(42.3562, -83.1437);
        let (west, south, east, north) = raster.bounds();

        assert_abs_diff_eq!(west, min_x, epsilon = 1e-6);
        assert_abs_diff_eq!(south, min_y, epsilon = 1e-6);
        assert_abs_diff_eq!(east, max_x, epsilon = 1e-6);
        assert_abs_diff_eq!(north, max_y, epsilon = 1e-6);
        assert!(raster.transform.pixel_height < 0.0);
        assert_eq!(raster.crs, CoordinateSystem::WebMercator);
    }

    #[test]
    fn geo_tags_carry_the_crs() {
        let raster = GeoRaster::new(
            PixelBuffer::new_blank(2, 2, ChannelMode::Rgba),
            GeoTransform::new(-10.0, 50.0, 0.5, 0.5),
            CoordinateSystem::WGS84,
        );
        let tags = raster.geo_tags();
        assert_eq!(tags.epsg, 4326);
        assert!(tags.geographic);
        assert_eq!(tags.tiepoint[3..5], [-10.0, 50.0]);
    }

    #[test]
    fn gray_samples_are_expanded() {
        let raster = DecodedRaster { width: 2, height: 1, samples: 2, data: vec![10, 255, 20, 0] };
        let buffer = to_pixel_buffer(raster).unwrap();
        assert_eq!(buffer.mode(), ChannelMode::Rgba);
        assert_eq!(buffer.data(), &[10, 10, 10, 255, 20, 20, 20, 0]);
    }
}
