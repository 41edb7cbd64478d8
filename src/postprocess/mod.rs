//! Optional rewrites of a written GeoTIFF
//!
//! Both steps read the file back, build the new raster in memory and
//! replace the file atomically, so a failure leaves the original intact.

mod reproject;
mod cog;

pub use reproject::{Reprojector, EDGE_SAMPLES};
pub use cog::CogConverter;
