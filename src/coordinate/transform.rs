//! Coordinate transformation functionality
//!
//! Web Mercator <-> WGS84 is computed analytically. Every other pair goes
//! through `proj4rs` with definitions resolved by [`CoordinateSystem::proj_string`].

use log::debug;
use proj4rs::proj::Proj;

use super::bbox::MAX_MERCATOR_LATITUDE;
use super::crs::CoordinateSystem;
use super::mapper::CoordinateMapper;
use super::point::Point;
use crate::errors::{MosaicError, MosaicResult};

enum Strategy {
    Identity,
    Wgs84ToWebMercator,
    WebMercatorToWgs84,
    Proj {
        source: Box<Proj>,
        target: Box<Proj>,
        source_geographic: bool,
        target_geographic: bool,
    },
}

/// Transformer for converting points from one coordinate system to another
pub struct CoordinateTransformer {
    from: CoordinateSystem,
    to: CoordinateSystem,
    strategy: Strategy,
}

impl CoordinateTransformer {
    /// Prepare a transformer between two coordinate systems
    pub fn new(from: CoordinateSystem, to: CoordinateSystem) -> MosaicResult<Self> {
        let strategy = match (from, to) {
            _ if from.epsg_code() == to.epsg_code() => Strategy::Identity,
            (CoordinateSystem::WGS84, CoordinateSystem::WebMercator) => Strategy::Wgs84ToWebMercator,
            (CoordinateSystem::WebMercator, CoordinateSystem::WGS84) => Strategy::WebMercatorToWgs84,
            _ => {
                let source = Self::build_proj(&from)?;
                let target = Self::build_proj(&to)?;
                Strategy::Proj {
                    source: Box::new(source),
                    target: Box::new(target),
                    source_geographic: from.is_geographic(),
                    target_geographic: to.is_geographic(),
                }
            }
        };

        debug!("Prepared transformer {} -> {}", from.description(), to.description());
        Ok(CoordinateTransformer { from, to, strategy })
    }

    fn build_proj(crs: &CoordinateSystem) -> MosaicResult<Proj> {
        let definition = crs.proj_string()?;
        Proj::from_proj_string(&definition).map_err(|e| {
            MosaicError::Projection(format!("Invalid projection for {}: {:?}", crs, e))
        })
    }

    /// Source coordinate system
    pub fn source(&self) -> CoordinateSystem {
        self.from
    }

    /// Target coordinate system
    pub fn target(&self) -> CoordinateSystem {
        self.to
    }

    /// Convert from WGS84 (EPSG:4326) to Web Mercator (EPSG:3857)
    pub fn wgs84_to_web_mercator(lon: f64, lat: f64) -> Point {
        let lat = lat.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);
        let (x, y) = CoordinateMapper::deg_to_projected_meters(lat, lon);
        Point::new(x, y)
    }

    /// Convert from Web Mercator (EPSG:3857) to WGS84 (EPSG:4326)
    pub fn web_mercator_to_wgs84(x: f64, y: f64) -> Point {
        let (lat, lon) = CoordinateMapper::projected_meters_to_deg(x, y);
        Point::new(lon, lat)
    }

    /// Transform a point; geographic coordinates are (lon, lat) degrees
    pub fn transform_point(&self, point: &Point) -> MosaicResult<Point> {
        match &self.strategy {
            Strategy::Identity => Ok(*point),
            Strategy::Wgs84ToWebMercator => Ok(Self::wgs84_to_web_mercator(point.x, point.y)),
            Strategy::WebMercatorToWgs84 => Ok(Self::web_mercator_to_wgs84(point.x, point.y)),
            Strategy::Proj { source, target, source_geographic, target_geographic } => {
                // proj4rs works in radians for geographic systems
                let mut xyz = if *source_geographic {
                    (point.x.to_radians(), point.y.to_radians(), 0.0)
                } else {
                    (point.x, point.y, 0.0)
                };

                proj4rs::transform::transform(source, target, &mut xyz).map_err(|e| {
                    MosaicError::Projection(format!(
                        "Transform {} -> {} failed for ({}, {}): {:?}", self.from, self.to, point.x, point.y, e))
                })?;

                let result = if *target_geographic {
                    Point::new(xyz.0.to_degrees(), xyz.1.to_degrees())
                } else {
                    Point::new(xyz.0, xyz.1)
                };

                if result.x.is_finite() && result.y.is_finite() {
                    Ok(result)
                } else {
                    Err(MosaicError::Projection(format!(
                        "Transform {} -> {} produced a non-finite point for ({}, {})",
                        self.from, self.to, point.x, point.y)))
                }
            }
        }
    }

    /// Transform an `(x, y)` pair
    pub fn transform(&self, x: f64, y: f64) -> MosaicResult<(f64, f64)> {
        self.transform_point(&Point::new(x, y)).map(|p| p.as_tuple())
    }
}
