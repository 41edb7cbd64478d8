//! Raster writer backends
//!
//! [`RasterWriter`] is the capability the pipeline writes through;
//! [`GeoTiffWriter`] implements it on top of the native [`TiffBuilder`].

use std::path::Path;
use log::{debug, info};

use super::referencer::GeoRaster;
use crate::compression::{CompressionFactory, CompressionKind};
use crate::config::OutputSettings;
use crate::errors::{MosaicError, MosaicResult};
use crate::mosaic::PixelBuffer;
use crate::tiff::{RasterLayout, TiffBuilder, TiffFormat, IFD};

/// How a raster is laid out on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub compression: CompressionKind,
    /// Edge of the square internal tiles
    pub tile_size: u32,
    /// Append 2x reduced levels until one fits a single tile
    pub overviews: bool,
    pub format: TiffFormat,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            compression: CompressionKind::Deflate,
            tile_size: 256,
            overviews: false,
            format: TiffFormat::Auto,
        }
    }
}

impl WriteOptions {
    pub fn from_settings(settings: &OutputSettings) -> Self {
        WriteOptions {
            compression: settings.compression,
            tile_size: settings.tile_size,
            ..Self::default()
        }
    }

    pub fn with_overviews(mut self, overviews: bool) -> Self {
        self.overviews = overviews;
        self
    }
}

/// Backend able to persist a [`GeoRaster`]
pub trait RasterWriter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fail with [`MosaicError::BackendUnavailable`] if `settings` cannot be honoured
    fn check_available(&self, settings: &OutputSettings) -> MosaicResult<()>;

    /// Write `raster` to `path`, replacing it; returns the bytes written
    fn write(&self, path: &Path, raster: &GeoRaster, options: &WriteOptions) -> MosaicResult<u64>;
}

/// Native tiled GeoTIFF backend
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoTiffWriter;

impl GeoTiffWriter {
    pub fn new() -> Self {
        GeoTiffWriter
    }

    /// Assemble the complete file in a builder
    pub fn build(&self, raster: &GeoRaster, options: &WriteOptions) -> MosaicResult<TiffBuilder> {
        if raster.width() == 0 || raster.height() == 0 {
            return Err(MosaicError::config("Cannot write an empty raster"));
        }
        if options.tile_size == 0 || options.tile_size % 16 != 0 {
            return Err(MosaicError::config(format!(
                "Tile size {} must be a positive multiple of 16", options.tile_size)));
        }
        let handler = CompressionFactory::for_kind(options.compression)
            .map_err(|e| MosaicError::BackendUnavailable(e.to_string()))?;

        let mut builder = TiffBuilder::with_format(options.format);
        let mut level = raster.image.clone();
        let mut reduced = false;

        loop {
            let layout = RasterLayout {
                width: level.width(),
                height: level.height(),
                samples: level.channels() as u16,
                tile_size: options.tile_size,
                compression: handler.code(),
                reduced_resolution: reduced,
            };
            let tiles = split_into_tiles(&level, options.tile_size)
                .iter()
                .map(|tile| handler.compress(tile))
                .collect::<Result<Vec<_>, _>>()?;

            let index = builder.add_ifd(IFD::new(builder.ifds.len(), 0));
            builder.add_raster_tags(index, &layout)?;
            builder.set_tiles(index, tiles)?;
            if index == 0 {
                builder.add_geo_tags(index, &raster.geo_tags())?;
                builder.add_software_tag()?;
            }
            debug!("Level {}: {}x{} in {} tiles", index, layout.width, layout.height, layout.tile_count());

            if !options.overviews || (level.width() <= options.tile_size && level.height() <= options.tile_size) {
                break;
            }
            level = level.downsample_half();
            reduced = true;
        }

        Ok(builder)
    }
}

impl RasterWriter for GeoTiffWriter {
    fn name(&self) -> &'static str {
        "native GeoTIFF"
    }

    fn check_available(&self, settings: &OutputSettings) -> MosaicResult<()> {
        if !settings.compression.is_available() {
            return Err(MosaicError::BackendUnavailable(format!(
                "{} compression is not compiled into this build (enable the '{}' feature)",
                settings.compression, settings.compression.name())));
        }
        settings.validate()
    }

    fn write(&self, path: &Path, raster: &GeoRaster, options: &WriteOptions) -> MosaicResult<u64> {
        let builder = self.build(raster, options)?;
        let size = builder.write(path)?;
        info!("Wrote {}x{} {}-band GeoTIFF ({}, {}, {} IFDs) to {}",
              raster.width(), raster.height(), raster.bands(), raster.crs,
              options.compression, builder.ifds.len(), path.display());
        Ok(size)
    }
}

/// Cut an image into row-major square tiles, zero-padding the edges
fn split_into_tiles(image: &PixelBuffer, tile_size: u32) -> Vec<Vec<u8>> {
    let channels = image.channels();
    let tile_row_len = tile_size as usize * channels;
    let across = image.width().div_ceil(tile_size);
    let down = image.height().div_ceil(tile_size);
    let mut tiles = Vec::with_capacity(across as usize * down as usize);

    for tile_y in 0..down {
        for tile_x in 0..across {
            let mut tile = vec![0u8; tile_row_len * tile_size as usize];
            let x0 = tile_x * tile_size;
            let columns = (image.width() - x0).min(tile_size) as usize;
            let rows = (image.height() - tile_y * tile_size).min(tile_size);

            for row in 0..rows {
                let source = image.row(tile_y * tile_size + row);
                let start = x0 as usize * channels;
                let target = row as usize * tile_row_len;
                tile[target..target + columns * channels]
                    .copy_from_slice(&source[start..start + columns * channels]);
            }
            tiles.push(tile);
        }
    }

    tiles
}
