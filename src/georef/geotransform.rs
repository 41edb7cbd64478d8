//! Affine transform between pixel and world coordinates

use crate::tiff::GeoInfo;

/// Six-parameter affine transform of a north-up raster
///
/// `x = origin_x + px * pixel_width + py * row_rotation`,
/// `y = origin_y + px * column_rotation + py * pixel_height`.
/// `pixel_height` is negative for north-up rasters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub column_rotation: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Axis-aligned transform with its origin at the top-left corner
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        GeoTransform {
            origin_x,
            pixel_width,
            row_rotation: 0.0,
            origin_y,
            column_rotation: 0.0,
            pixel_height: -pixel_height.abs(),
        }
    }

    /// Transform spreading `width` x `height` pixels over the given extent
    pub fn from_bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64, width: u32, height: u32) -> Self {
        let pixel_width = (max_x - min_x).abs() / width.max(1) as f64;
        let pixel_height = (max_y - min_y).abs() / height.max(1) as f64;
        Self::new(min_x.min(max_x), min_y.max(max_y), pixel_width, pixel_height)
    }

    /// Rebuild from the tags of a GeoTIFF, `None` if they are incomplete
    pub fn from_geo_info(geo: &GeoInfo) -> Option<Self> {
        let scale = geo.pixel_scale?;
        let (origin_x, origin_y) = geo.origin()?;
        Some(Self::new(origin_x, origin_y, scale[0], scale[1]))
    }

    pub fn as_array(&self) -> [f64; 6] {
        [self.origin_x, self.pixel_width, self.row_rotation,
         self.origin_y, self.column_rotation, self.pixel_height]
    }

    /// World coordinates of a (fractional) pixel position
    pub fn pixel_to_world(&self, px: f64, py: f64) -> (f64, f64) {
        (
            self.origin_x + px * self.pixel_width + py * self.row_rotation,
            self.origin_y + px * self.column_rotation + py * self.pixel_height,
        )
    }

    /// Fractional pixel position of world coordinates; `None` for a degenerate transform
    pub fn world_to_pixel(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.column_rotation;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        Some((
            (dx * self.pixel_height - dy * self.row_rotation) / det,
            (dy * self.pixel_width - dx * self.column_rotation) / det,
        ))
    }

    /// (min_x, min_y, max_x, max_y) covered by `width` x `height` pixels
    pub fn bounds(&self, width: u32, height: u32) -> (f64, f64, f64, f64) {
        let (x0, y0) = self.pixel_to_world(0.0, 0.0);
        let (x1, y1) = self.pixel_to_world(width as f64, height as f64);
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    /// `ModelPixelScale` values
    pub fn pixel_scale(&self) -> [f64; 3] {
        [self.pixel_width.abs(), self.pixel_height.abs(), 0.0]
    }

    /// `ModelTiepoint` values tying pixel (0, 0) to the origin
    pub fn tiepoint(&self) -> [f64; 6] {
        [0.0, 0.0, 0.0, self.origin_x, self.origin_y, 0.0]
    }
}
