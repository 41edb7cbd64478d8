//! Cropping the canvas down to the requested box

use log::debug;

use super::assembler::Canvas;
use super::pixel_buffer::{ChannelMode, PixelBuffer};
use crate::coordinate::TileRange;

/// Pixel rectangle inside a canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

pub struct Cropper;

impl Cropper {
    /// Rectangle of the fractional tile bounds, in canvas pixels
    ///
    /// Offsets are the fractional part of the first tile scaled by the tile
    /// size; the extent is the fractional span scaled the same way, at least
    /// one pixel. The window always lies inside the canvas of the range.
    pub fn window(range: &TileRange, tile_width: u32, tile_height: u32) -> CropWindow {
        let (x, width) = clamp_axis(
            range.x0, range.x1, tile_width, range.columns().saturating_mul(tile_width));
        let (y, height) = clamp_axis(
            range.y0, range.y1, tile_height, range.rows().saturating_mul(tile_height));

        CropWindow { x, y, width, height }
    }

    /// Crop to the exact bounds of `range`
    ///
    /// An RGBA result with no transparent pixel is flattened to RGB.
    pub fn crop(canvas: &Canvas, range: &TileRange) -> PixelBuffer {
        let window = Self::window(range, canvas.tile_width, canvas.tile_height);
        let cropped = canvas.buffer.crop(window.x, window.y, window.width, window.height);
        debug!("Cropped canvas to {}x{} at ({}, {})", cropped.width(), cropped.height(), window.x, window.y);

        if cropped.mode() == ChannelMode::Rgba && cropped.is_fully_opaque() {
            cropped.to_mode(ChannelMode::Rgb)
        } else {
            cropped
        }
    }
}

/// Offset and extent along one axis, pulled back inside `0..canvas`
fn clamp_axis(start: f64, end: f64, tile_size: u32, canvas: u32) -> (u32, u32) {
    let size = tile_size as f64;
    let offset = (size * (start - start.floor())).round() as u32;
    let extent = ((size * (end - start)).round() as u32).max(1).min(canvas.max(1));
    (offset.min(canvas.saturating_sub(extent)), extent)
}
