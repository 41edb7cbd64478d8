//! Reprojection of a georeferenced raster
//!
//! The target grid covers the forward-transformed source bounds with
//! square pixels, keeping roughly the source pixel count. Every target
//! pixel centre is mapped back into the source and sampled there.

use std::path::Path;
use log::{debug, info, warn};

use crate::config::Resampling;
use crate::coordinate::{CoordinateSystem, CoordinateTransformer};
use crate::errors::{MosaicError, MosaicResult};
use crate::georef::{GeoRaster, GeoTransform, RasterWriter, WriteOptions};
use crate::mosaic::PixelBuffer;

/// Points sampled along each edge of the source extent
pub const EDGE_SAMPLES: usize = 21;

/// Relative slack before an extent needs one more pixel
const GRID_TOLERANCE: f64 = 1e-9;

/// Resamples rasters into another CRS
#[derive(Debug, Clone, Copy)]
pub struct Reprojector {
    target: CoordinateSystem,
    resampling: Resampling,
}

impl Reprojector {
    pub fn new(target: CoordinateSystem, resampling: Resampling) -> Self {
        Reprojector { target, resampling }
    }

    pub fn target(&self) -> CoordinateSystem {
        self.target
    }

    /// Reproject the GeoTIFF at `path` in place and return the new raster
    pub fn reproject_file(
        &self,
        path: &Path,
        writer: &dyn RasterWriter,
        options: &WriteOptions,
    ) -> MosaicResult<GeoRaster> {
        let source = GeoRaster::load(path)?;
        let reprojected = self.reproject(&source)?;
        writer.write(path, &reprojected, options)?;
        Ok(reprojected)
    }

    /// Resample `source` into the target CRS
    pub fn reproject(&self, source: &GeoRaster) -> MosaicResult<GeoRaster> {
        if source.crs.epsg_code() == self.target.epsg_code() {
            debug!("Raster already in {}, nothing to reproject", self.target);
            return Ok(source.clone());
        }

        let forward = CoordinateTransformer::new(source.crs, self.target)?;
        let inverse = CoordinateTransformer::new(self.target, source.crs)?;

        let (min_x, min_y, max_x, max_y) = transformed_bounds(&forward, source.bounds())?;
        let pixels = source.width() as f64 * source.height() as f64;
        let resolution = ((max_x - min_x) * (max_y - min_y) / pixels).sqrt();
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(MosaicError::Projection(format!(
                "Degenerate extent after transforming to {}", self.target)));
        }

        let width = grid_cells(max_x - min_x, resolution);
        let height = grid_cells(max_y - min_y, resolution);
        let transform = GeoTransform::new(min_x, max_y, resolution, resolution);
        info!("Reprojecting {}x{} {} raster to {}x{} in {} ({:?})",
              source.width(), source.height(), source.crs, width, height, self.target, self.resampling);

        let mut image = PixelBuffer::new_blank(width, height, source.image.mode());
        let channels = image.channels();
        let mut outside = 0usize;

        for y in 0..height {
            for x in 0..width {
                let (wx, wy) = transform.pixel_to_world(x as f64 + 0.5, y as f64 + 0.5);
                let sample = inverse.transform(wx, wy).ok()
                    .and_then(|(sx, sy)| source.transform.world_to_pixel(sx, sy))
                    .and_then(|(px, py)| match self.resampling {
                        Resampling::Nearest => sample_nearest(&source.image, px, py),
                        Resampling::Bilinear => sample_bilinear(&source.image, px, py),
                    });

                match sample {
                    Some(values) => {
                        let start = (y as usize * width as usize + x as usize) * channels;
                        image.data_mut()[start..start + channels].copy_from_slice(&values[..channels]);
                    }
                    None => outside += 1,
                }
            }
        }

        if outside > 0 {
            debug!("{} target pixels fall outside the source raster", outside);
        }
        Ok(GeoRaster::new(image, transform, self.target))
    }
}

/// Target-CRS extent of `bounds`, densified along every edge
fn transformed_bounds(
    transformer: &CoordinateTransformer,
    (min_x, min_y, max_x, max_y): (f64, f64, f64, f64),
) -> MosaicResult<(f64, f64, f64, f64)> {
    let mut extent: Option<(f64, f64, f64, f64)> = None;
    let mut failures = 0usize;
    let steps = (EDGE_SAMPLES - 1) as f64;

    for i in 0..EDGE_SAMPLES {
        let t = i as f64 / steps;
        let x = min_x + (max_x - min_x) * t;
        let y = min_y + (max_y - min_y) * t;
        for (px, py) in [(x, min_y), (x, max_y), (min_x, y), (max_x, y)] {
            match transformer.transform(px, py) {
                Ok((tx, ty)) => {
                    extent = Some(match extent {
                        None => (tx, ty, tx, ty),
                        Some((a, b, c, d)) => (a.min(tx), b.min(ty), c.max(tx), d.max(ty)),
                    });
                }
                Err(_) => failures += 1,
            }
        }
    }

    if failures > 0 {
        warn!("{} edge points could not be transformed to {}", failures, transformer.target());
    }
    extent.ok_or_else(|| MosaicError::Projection(format!(
        "No part of the raster can be transformed to {}", transformer.target())))
}

fn sample_nearest(image: &PixelBuffer, px: f64, py: f64) -> Option<[u8; 4]> {
    if !(px >= 0.0 && py >= 0.0 && px < image.width() as f64 && py < image.height() as f64) {
        return None;
    }
    let mut values = [0u8; 4];
    let pixel = image.pixel(px.floor() as u32, py.floor() as u32);
    values[..pixel.len()].copy_from_slice(pixel);
    Some(values)
}

/// Weighted mean of the four nearest pixel centres, edges clamped
fn sample_bilinear(image: &PixelBuffer, px: f64, py: f64) -> Option<[u8; 4]> {
    if !(px >= 0.0 && py >= 0.0 && px < image.width() as f64 && py < image.height() as f64) {
        return None;
    }
    let max_x = image.width() as i64 - 1;
    let max_y = image.height() as i64 - 1;
    let cx = px - 0.5;
    let cy = py - 0.5;
    let x0 = cx.floor();
    let y0 = cy.floor();
    let fx = cx - x0;
    let fy = cy - y0;
    let clamp_x = |v: f64| (v as i64).clamp(0, max_x) as u32;
    let clamp_y = |v: f64| (v as i64).clamp(0, max_y) as u32;
    let (xa, xb) = (clamp_x(x0), clamp_x(x0 + 1.0));
    let (ya, yb) = (clamp_y(y0), clamp_y(y0 + 1.0));

    let (p00, p10) = (image.pixel(xa, ya), image.pixel(xb, ya));
    let (p01, p11) = (image.pixel(xa, yb), image.pixel(xb, yb));
    let mut values = [0u8; 4];
    for c in 0..image.channels() {
        let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
        let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
        values[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Some(values)
}

/// Pixels needed to cover `extent`, ignoring rounding noise on exact fits
fn grid_cells(extent: f64, resolution: f64) -> u32 {
    let cells = extent / resolution;
    let nearest = cells.round();
    let cells = if (cells - nearest).abs() <= GRID_TOLERANCE * nearest.max(1.0) {
        nearest
    } else {
        cells.ceil()
    };
    cells.max(1.0) as u32
}
