//! Web Mercator tile math
//!
//! Pure conversions between geographic degrees, fractional tile indices
//! at a zoom level, and projected Web Mercator meters. Nothing in here
//! touches I/O or holds state.

use std::f64::consts::PI;
use log::debug;

use crate::errors::{MosaicError, MosaicResult};

/// Spherical Web Mercator radius in meters
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Ground resolution (meters per pixel) of a 256px tile at zoom 0
pub const ZOOM0_RESOLUTION: f64 = 156_543.033_928_040_97;

/// Highest zoom level accepted for tile requests
pub const MAX_ZOOM: u8 = 30;

/// Converts between degrees, tile indices and projected meters
pub struct CoordinateMapper;

impl CoordinateMapper {
    /// Fractional tile position of a point at `zoom`
    ///
    /// `x = (lon + 180) / 360 * 2^zoom`, `y` uses the Mercator latitude
    /// transform. Undefined (and rejected) for `|lat| >= 90`.
    ///
    /// # Arguments
    /// * `lat` - Latitude in degrees
    /// * `lon` - Longitude in degrees
    /// * `zoom` - Zoom level
    ///
    /// # Returns
    /// `(x_frac, y_frac)` in tile units
    pub fn deg_to_tile_fraction(lat: f64, lon: f64, zoom: u8) -> MosaicResult<(f64, f64)> {
        if !lat.is_finite() || lat.abs() >= 90.0 {
            return Err(MosaicError::config(format!(
                "Latitude {} has no Web Mercator tile position", lat)));
        }
        if !lon.is_finite() {
            return Err(MosaicError::config(format!("Invalid longitude {}", lon)));
        }

        let n = 2f64.powi(zoom as i32);
        let lat_rad = lat.to_radians();
        let x_frac = (lon + 180.0) / 360.0 * n;
        let y_frac = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n;

        Ok((x_frac, y_frac))
    }

    /// Inverse of [`deg_to_tile_fraction`](Self::deg_to_tile_fraction): `(lat, lon)` of a tile position
    pub fn tile_fraction_to_deg(x_frac: f64, y_frac: f64, zoom: u8) -> (f64, f64) {
        let n = 2f64.powi(zoom as i32);
        let lon = x_frac / n * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * y_frac / n)).sinh().atan().to_degrees();
        (lat, lon)
    }

    /// Zoom level whose ground resolution is at least as fine as `resolution_meters`
    ///
    /// `zoom = floor(log2(156543.03392804097 / resolution))`. Resolutions
    /// coarser than zoom 0 map to zoom 0.
    pub fn resolution_to_zoom(resolution_meters: f64) -> MosaicResult<u8> {
        if !resolution_meters.is_finite() || resolution_meters <= 0.0 {
            return Err(MosaicError::config(format!(
                "Resolution must be a positive number of meters, got {}", resolution_meters)));
        }

        let zoom = (ZOOM0_RESOLUTION / resolution_meters).log2().floor();
        if zoom > MAX_ZOOM as f64 {
            return Err(MosaicError::config(format!(
                "Resolution {} m needs zoom {}, above the maximum of {}", resolution_meters, zoom, MAX_ZOOM)));
        }

        let zoom = zoom.max(0.0) as u8;
        debug!("Resolution {} m/px maps to zoom {}", resolution_meters, zoom);
        Ok(zoom)
    }

    /// Spherical Web Mercator forward projection
    ///
    /// # Returns
    /// `(x, y)` in meters
    pub fn deg_to_projected_meters(lat: f64, lon: f64) -> (f64, f64) {
        let x = lon.to_radians() * EARTH_RADIUS;
        let y = (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;
        (x, y)
    }

    /// Spherical Web Mercator inverse projection
    ///
    /// # Returns
    /// `(lat, lon)` in degrees
    pub fn projected_meters_to_deg(x: f64, y: f64) -> (f64, f64) {
        let lon = (x / EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
        (lat, lon)
    }
}
