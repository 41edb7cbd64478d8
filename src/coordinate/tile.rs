//! Tile addressing and tile ranges covering a bounding box

use std::fmt;
use log::debug;

use super::bbox::BoundingBox;
use super::mapper::{CoordinateMapper, MAX_ZOOM};
use crate::errors::{MosaicError, MosaicResult};

/// Address of a single XYZ tile
///
/// Ordering is `(zoom, x, y)`, so sorted collections of tiles from one
/// zoom level iterate column by column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileCoordinate {
    /// Zoom level
    pub zoom: u8,
    /// Column index
    pub x: u32,
    /// Row index, counted from the north
    pub y: u32,
}

impl TileCoordinate {
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        TileCoordinate { zoom, x, y }
    }
}

impl fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Tiles covering a bounding box at one zoom level
///
/// Keeps the unrounded fractional bounds, which the cropper needs to cut
/// the assembled canvas down to the exact requested extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileRange {
    /// Zoom level
    pub zoom: u8,
    /// Smaller fractional x
    pub x0: f64,
    /// Smaller fractional y (northern edge)
    pub y0: f64,
    /// Larger fractional x
    pub x1: f64,
    /// Larger fractional y (southern edge)
    pub y1: f64,
}

impl TileRange {
    /// Compute the fractional tile bounds of `bbox` at `zoom`
    ///
    /// Each axis pair is sorted, so the corner order given by the caller
    /// does not affect the range.
    pub fn from_bbox(bbox: &BoundingBox, zoom: u8) -> MosaicResult<Self> {
        if zoom > MAX_ZOOM {
            return Err(MosaicError::config(format!(
                "Zoom {} is above the maximum of {}", zoom, MAX_ZOOM)));
        }

        let (xa, ya) = CoordinateMapper::deg_to_tile_fraction(bbox.north, bbox.west, zoom)?;
        let (xb, yb) = CoordinateMapper::deg_to_tile_fraction(bbox.south, bbox.east, zoom)?;

        let range = TileRange {
            zoom,
            x0: xa.min(xb),
            y0: ya.min(yb),
            x1: xa.max(xb),
            y1: ya.max(yb),
        };

        debug!("Tile range at zoom {}: x {}..{}, y {}..{} ({} tiles)",
               zoom, range.x0, range.x1, range.y0, range.y1, range.tile_count());
        Ok(range)
    }

    /// First tile column (inclusive)
    pub fn min_x(&self) -> u32 {
        self.x0.floor().max(0.0) as u32
    }

    /// First tile row (inclusive)
    pub fn min_y(&self) -> u32 {
        self.y0.floor().max(0.0) as u32
    }

    /// Last tile column (exclusive)
    pub fn max_x(&self) -> u32 {
        self.x1.ceil().max(0.0) as u32
    }

    /// Last tile row (exclusive)
    pub fn max_y(&self) -> u32 {
        self.y1.ceil().max(0.0) as u32
    }

    /// Number of tile columns
    pub fn columns(&self) -> u32 {
        self.max_x().saturating_sub(self.min_x())
    }

    /// Number of tile rows
    pub fn rows(&self) -> u32 {
        self.max_y().saturating_sub(self.min_y())
    }

    /// `(ceil(x1) - floor(x0)) * (ceil(y1) - floor(y0))`
    pub fn tile_count(&self) -> u64 {
        self.columns() as u64 * self.rows() as u64
    }

    /// Every tile in the range, in `TileCoordinate` order
    pub fn coordinates(&self) -> Vec<TileCoordinate> {
        let mut coords = Vec::with_capacity(self.tile_count() as usize);
        for x in self.min_x()..self.max_x() {
            for y in self.min_y()..self.max_y() {
                coords.push(TileCoordinate::new(x, y, self.zoom));
            }
        }
        coords
    }
}
