//! Cloud-optimised GeoTIFF rewrite
//!
//! The full-resolution image is read back and written again with internal
//! tiles and averaged overviews. Every IFD sits at the start of the file
//! and overview tiles precede full-resolution tiles, so a reader can fetch
//! the header with one range request. Overviews in the input are ignored,
//! which makes the rewrite idempotent.

use std::path::Path;
use log::info;

use crate::errors::MosaicResult;
use crate::georef::{GeoRaster, RasterWriter, WriteOptions};

pub struct CogConverter {
    options: WriteOptions,
}

impl CogConverter {
    pub fn new(options: WriteOptions) -> Self {
        CogConverter { options: options.with_overviews(true) }
    }

    /// Rewrite `path` in place through `writer`
    pub fn convert(&self, path: &Path, writer: &dyn RasterWriter) -> MosaicResult<GeoRaster> {
        let raster = GeoRaster::load(path)?;
        let size = writer.write(path, &raster, &self.options)?;
        info!("Converted {} to a cloud-optimised GeoTIFF with {} ({} bytes)", path.display(), writer.name(), size);
        Ok(raster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use crate::config::OutputSettings;
    use crate::coordinate::CoordinateSystem;
    use crate::georef::{GeoTiffWriter, GeoTransform};
    use crate::mosaic::{ChannelMode, PixelBuffer};
    use crate::tiff::TiffReader;

    #[test]
    fn conversion_adds_overviews_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cog.tif");
        let data = (0..40 * 24 * 3).map(|i| (i * 7 % 256) as u8).collect();
        let raster = GeoRaster::new(
            PixelBuffer::from_raw(40, 24, ChannelMode::Rgb, data).unwrap(),
            GeoTransform::new(1000.0, 2000.0, 2.0, 2.0),
            CoordinateSystem::WebMercator,
        );
        let options = WriteOptions { tile_size: 16, ..WriteOptions::default() };
        GeoTiffWriter::new().write(&path, &raster, &options).unwrap();

        let converter = CogConverter::new(options);
        let loaded = converter.convert(&path, &GeoTiffWriter::new()).unwrap();
        assert_eq!(loaded, raster);
        let first = fs::read(&path).unwrap();

        let tiff = TiffReader::new().load(&path).unwrap();
        assert_eq!(tiff.ifd_count(), 3);
        assert_eq!(tiff.overviews().len(), 2);

        converter.convert(&path, &GeoTiffWriter::new()).unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);
    }

    /// Delegates to the native writer and records the options it was given
    #[derive(Default)]
    struct RecordingWriter {
        seen: Mutex<Vec<WriteOptions>>,
    }

    impl RasterWriter for RecordingWriter {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn check_available(&self, _settings: &OutputSettings) -> MosaicResult<()> {
            Ok(())
        }

        fn write(&self, path: &Path, raster: &GeoRaster, options: &WriteOptions) -> MosaicResult<u64> {
            self.seen.lock().unwrap().push(*options);
            GeoTiffWriter::new().write(path, raster, options)
        }
    }

    #[test]
    fn conversion_goes_through_the_given_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cog.tif");
        let raster = GeoRaster::new(
            PixelBuffer::new_blank(32, 32, ChannelMode::Rgb),
            GeoTransform::new(0.0, 0.0, 1.0, 1.0),
            CoordinateSystem::WebMercator,
        );
        let options = WriteOptions { tile_size: 16, ..WriteOptions::default() };
        GeoTiffWriter::new().write(&path, &raster, &options).unwrap();

        let writer = RecordingWriter::default();
        CogConverter::new(options).convert(&path, &writer).unwrap();

        let seen = writer.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].overviews);
    }
}
