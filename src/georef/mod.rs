//! Georeferencing of the cropped mosaic
//!
//! Turns a cropped image and its bounding box into a [`GeoRaster`] and
//! writes it through a [`RasterWriter`] backend.

mod geotransform;
mod referencer;
mod writer;

pub use geotransform::GeoTransform;
pub use referencer::{GeoRaster, GeoReferencer};
pub use writer::{GeoTiffWriter, RasterWriter, WriteOptions};
