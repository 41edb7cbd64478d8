//! Geographic bounding box

use std::fmt;

use super::point::Point;
use crate::errors::{MosaicError, MosaicResult};

/// Largest latitude covered by the Web Mercator tile grid
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;

/// A `[west, south, east, north]` extent in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Western longitude
    pub west: f64,
    /// Southern latitude
    pub south: f64,
    /// Eastern longitude
    pub east: f64,
    /// Northern latitude
    pub north: f64,
}

impl BoundingBox {
    /// Create a bounding box without validating it
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        BoundingBox { west, south, east, north }
    }

    /// Build a validated bounding box from a slice of exactly four numbers
    pub fn from_slice(values: &[f64]) -> MosaicResult<Self> {
        match values {
            [west, south, east, north] => {
                let bbox = BoundingBox::new(*west, *south, *east, *north);
                bbox.validate()?;
                Ok(bbox)
            }
            _ => Err(MosaicError::config(format!(
                "Bounding box must have exactly 4 values, got {}", values.len()))),
        }
    }

    /// Parse a bounding box from a string (format: "west,south,east,north")
    pub fn from_string(bbox_str: &str) -> MosaicResult<Self> {
        let values = bbox_str
            .split(',')
            .map(|part| {
                part.trim().parse::<f64>().map_err(|_| {
                    MosaicError::config(format!("Invalid bounding box value '{}'", part.trim()))
                })
            })
            .collect::<MosaicResult<Vec<f64>>>()?;

        Self::from_slice(&values)
    }

    /// Check ordering and range of the four edges
    pub fn validate(&self) -> MosaicResult<()> {
        let edges = [self.west, self.south, self.east, self.north];
        if edges.iter().any(|v| !v.is_finite()) {
            return Err(MosaicError::config(format!("Bounding box {} contains non-finite values", self)));
        }
        if self.west >= self.east {
            return Err(MosaicError::config(format!(
                "Bounding box west ({}) must be less than east ({})", self.west, self.east)));
        }
        if self.south >= self.north {
            return Err(MosaicError::config(format!(
                "Bounding box south ({}) must be less than north ({})", self.south, self.north)));
        }
        if self.west < -180.0 || self.east > 180.0 {
            return Err(MosaicError::config(format!(
                "Bounding box longitudes must lie within [-180, 180], got {}", self)));
        }
        if self.south < -MAX_MERCATOR_LATITUDE || self.north > MAX_MERCATOR_LATITUDE {
            return Err(MosaicError::config(format!(
                "Bounding box latitudes must lie within +/-{:.4} (Web Mercator limit), got {}",
                MAX_MERCATOR_LATITUDE, self)));
        }
        Ok(())
    }

    /// Width in degrees
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Height in degrees
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// South-west corner as (lon, lat)
    pub fn south_west(&self) -> Point {
        Point::new(self.west, self.south)
    }

    /// North-east corner as (lon, lat)
    pub fn north_east(&self) -> Point {
        Point::new(self.east, self.north)
    }

    /// Check if this bounding box contains a point given as (lon, lat)
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.west && point.x <= self.east &&
            point.y >= self.south && point.y <= self.north
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.west, self.south, self.east, self.north)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_four_values() {
        let bbox = BoundingBox::from_string("-83.1440, 42.3561, -83.1437, 42.3562").unwrap();
        assert_eq!(bbox.west, -83.1440);
        assert_eq!(bbox.north, 42.3562);
    }

    #[test]
    fn rejects_wrong_arity() {
        let err = BoundingBox::from_slice(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, MosaicError::Configuration(_)));
        assert!(BoundingBox::from_string("1,2,3,4,5").is_err());
    }

    #[test]
    fn rejects_inverted_edges() {
        assert!(BoundingBox::from_slice(&[10.0, 0.0, 5.0, 1.0]).is_err());
        assert!(BoundingBox::from_slice(&[0.0, 5.0, 1.0, 4.0]).is_err());
    }

    #[test]
    fn rejects_polar_latitudes() {
        assert!(BoundingBox::from_slice(&[0.0, 80.0, 1.0, 89.0]).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(BoundingBox::from_string("a,b,c,d").is_err());
        assert!(BoundingBox::from_slice(&[f64::NAN, 0.0, 1.0, 1.0]).is_err());
    }
}
