//! Assembly of fetched tiles into one canvas
//!
//! Placement depends only on tile coordinates, and tiles are visited in
//! coordinate order, so the canvas is identical however the downloads
//! were interleaved.

use std::collections::BTreeMap;
use log::{debug, info, warn};

use super::pixel_buffer::{ChannelMode, PixelBuffer};
use crate::coordinate::{TileCoordinate, TileRange};
use crate::errors::{MosaicError, MosaicResult};

/// Tile edge assumed when no tile could be decoded
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Assembled tiles with the position of the range's first tile
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    pub buffer: PixelBuffer,
    /// `(min_x, min_y)` of the tile range
    pub origin: (u32, u32),
    pub tile_width: u32,
    pub tile_height: u32,
}

/// What happened to the tiles during assembly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    pub pasted: usize,
    pub blank_skipped: usize,
    pub absent: usize,
}

/// Builds a [`Canvas`] from downloaded tiles
pub struct MosaicAssembler;

impl MosaicAssembler {
    /// Decode and place every tile of `range`
    ///
    /// The first tile that decodes fixes the canvas mode and tile size;
    /// later tiles are converted to that mode. Absent and all-zero tiles
    /// leave their area blank. A body that fails to decode is an error.
    pub fn assemble<B: AsRef<[u8]>>(
        range: &TileRange,
        tiles: &BTreeMap<TileCoordinate, Option<B>>,
    ) -> MosaicResult<(Canvas, AssemblyStats)> {
        let mut stats = AssemblyStats::default();
        let mut decoded: Vec<(TileCoordinate, PixelBuffer)> = Vec::with_capacity(tiles.len());

        for (tile, body) in tiles {
            match body {
                Some(bytes) => {
                    let buffer = PixelBuffer::decode(bytes.as_ref()).map_err(|e| MosaicError::TileDecode {
                        tile: *tile,
                        reason: e.to_string(),
                    })?;
                    decoded.push((*tile, buffer));
                }
                None => stats.absent += 1,
            }
        }

        let (mode, tile_width, tile_height) = match decoded.first() {
            Some((tile, first)) => {
                debug!("Canvas mode {} and tile size {}x{} taken from tile {}",
                       first.mode(), first.width(), first.height(), tile);
                (first.mode(), first.width(), first.height())
            }
            None => {
                warn!("No tile could be decoded, the mosaic will be blank");
                (ChannelMode::Rgba, DEFAULT_TILE_SIZE, DEFAULT_TILE_SIZE)
            }
        };

        let origin = (range.min_x(), range.min_y());
        let (width, height) = canvas_size(range, tile_width, tile_height)?;
        let mut buffer = PixelBuffer::new_blank(width, height, mode);
        info!("Assembling {}x{} tiles into a {}x{} {} canvas",
              range.columns(), range.rows(), buffer.width(), buffer.height(), mode);

        for (tile, image) in decoded {
            if image.is_empty() {
                debug!("Tile {} is blank, skipping", tile);
                stats.blank_skipped += 1;
                continue;
            }
            if image.dimensions() != (tile_width, tile_height) {
                warn!("Tile {} is {}x{}, expected {}x{}",
                      tile, image.width(), image.height(), tile_width, tile_height);
            }
            if tile.x < origin.0 || tile.y < origin.1 {
                warn!("Tile {} lies outside the range, skipping", tile);
                continue;
            }

            let offset_x = (tile.x - origin.0) * tile_width;
            let offset_y = (tile.y - origin.1) * tile_height;
            buffer.paste(&image.to_mode(mode), offset_x, offset_y);
            stats.pasted += 1;
        }

        Ok((Canvas { buffer, origin, tile_width, tile_height }, stats))
    }
}

/// Pixel size of the canvas covering `range`
fn canvas_size(range: &TileRange, tile_width: u32, tile_height: u32) -> MosaicResult<(u32, u32)> {
    let width = range.columns().checked_mul(tile_width);
    let height = range.rows().checked_mul(tile_height);
    match (width, height) {
        (Some(width), Some(height)) => Ok((width, height)),
        _ => Err(MosaicError::config(format!(
            "Canvas of {}x{} tiles at {}x{} pixels is too large",
            range.columns(), range.rows(), tile_width, tile_height))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use image::{DynamicImage, ImageBuffer, Rgb, Rgba};

    fn range() -> TileRange {
        TileRange { zoom: 3, x0: 2.5, y0: 1.5, x1: 3.5, y1: 2.5 }
    }

    fn png_rgb(color: [u8; 3], size: u32) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(ImageBuffer::from_pixel(size, size, Rgb(color)))
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    fn png_rgba(color: [u8; 4], size: u32) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(ImageBuffer::from_pixel(size, size, Rgba(color)))
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn places_tiles_by_coordinate() {
        let mut tiles = BTreeMap::new();
        tiles.insert(TileCoordinate::new(2, 1, 3), Some(png_rgb([255, 0, 0], 8)));
        tiles.insert(TileCoordinate::new(3, 1, 3), Some(png_rgb([0, 255, 0], 8)));
        tiles.insert(TileCoordinate::new(2, 2, 3), Some(png_rgb([0, 0, 255], 8)));
        tiles.insert(TileCoordinate::new(3, 2, 3), None);

        let (canvas, stats) = MosaicAssembler::assemble(&range(), &tiles).unwrap();

        assert_eq!(canvas.buffer.dimensions(), (16, 16));
        assert_eq!(canvas.buffer.mode(), ChannelMode::Rgb);
        assert_eq!(canvas.origin, (2, 1));
        assert_eq!(canvas.buffer.pixel(0, 0), &[255, 0, 0]);
        assert_eq!(canvas.buffer.pixel(15, 0), &[0, 255, 0]);
        assert_eq!(canvas.buffer.pixel(0, 15), &[0, 0, 255]);
        assert_eq!(canvas.buffer.pixel(15, 15), &[0, 0, 0]);
        assert_eq!(stats, AssemblyStats { pasted: 3, blank_skipped: 0, absent: 1 });
    }

    #[test]
    fn first_decoded_tile_fixes_the_mode() {
        let mut tiles = BTreeMap::new();
        tiles.insert(TileCoordinate::new(2, 1, 3), None);
        tiles.insert(TileCoordinate::new(2, 2, 3), Some(png_rgba([1, 2, 3, 128], 4)));
        tiles.insert(TileCoordinate::new(3, 1, 3), Some(png_rgb([9, 9, 9], 4)));

        let (canvas, _) = MosaicAssembler::assemble(&range(), &tiles).unwrap();

        assert_eq!(canvas.buffer.mode(), ChannelMode::Rgba);
        assert_eq!(canvas.buffer.pixel(4, 0), &[9, 9, 9, 255]);
        assert_eq!(canvas.buffer.pixel(0, 4), &[1, 2, 3, 128]);
        assert_eq!(canvas.buffer.pixel(0, 0), &[0, 0, 0, 0]);
    }

    #[test]
    fn blank_tiles_are_skipped() {
        let mut tiles = BTreeMap::new();
        tiles.insert(TileCoordinate::new(2, 1, 3), Some(png_rgba([0, 0, 0, 0], 4)));
        tiles.insert(TileCoordinate::new(3, 1, 3), Some(png_rgba([5, 5, 5, 255], 4)));

        let (_, stats) = MosaicAssembler::assemble(&range(), &tiles).unwrap();
        assert_eq!(stats.blank_skipped, 1);
        assert_eq!(stats.pasted, 1);
    }

    #[test]
    fn no_tiles_gives_blank_default_canvas() {
        let tiles: BTreeMap<TileCoordinate, Option<Vec<u8>>> = BTreeMap::new();
        let (canvas, _) = MosaicAssembler::assemble(&range(), &tiles).unwrap();
        assert_eq!(canvas.buffer.dimensions(), (512, 512));
        assert!(canvas.buffer.is_empty());
    }

    #[test]
    fn oversized_canvas_is_an_error() {
        let range = TileRange { zoom: 24, x0: 0.0, y0: 0.0, x1: 16_777_216.0, y1: 1.0 };
        let tiles: BTreeMap<TileCoordinate, Option<Vec<u8>>> = BTreeMap::new();
        let err = MosaicAssembler::assemble(&range, &tiles).unwrap_err();
        assert!(matches!(err, MosaicError::Configuration(_)));
    }

    #[test]
    fn undecodable_tile_is_an_error() {
        let mut tiles = BTreeMap::new();
        tiles.insert(TileCoordinate::new(2, 1, 3), Some(b"<html>rate limited</html>".to_vec()));
        let err = MosaicAssembler::assemble(&range(), &tiles).unwrap_err();
        assert!(matches!(err, MosaicError::TileDecode { tile, .. } if tile == TileCoordinate::new(2, 1, 3)));
    }
}
