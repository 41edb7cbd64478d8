//! Coordinate handling for the tile pipeline
//!
//! Bounding boxes, Web Mercator tile math, tile ranges and CRS
//! transformations used for georeferencing and reprojection.

mod bbox;
mod point;
mod mapper;
mod tile;
mod transform;
mod crs;
pub mod crs_data;

pub use self::bbox::{BoundingBox, MAX_MERCATOR_LATITUDE};
pub use self::point::Point;
pub use self::mapper::{CoordinateMapper, EARTH_RADIUS, MAX_ZOOM, ZOOM0_RESOLUTION};
pub use self::tile::{TileCoordinate, TileRange};
pub use self::transform::CoordinateTransformer;
pub use self::crs::{CoordinateSystem, CoordinateSystemFactory};
pub use self::crs_data::ProjDataLocator;
