//! TIFF builder strategy modules
//!
//! Strategy implementations for the TiffBuilder, organized by
//! functionality category.

pub mod basic_tags;
pub mod geo_tags;
pub mod writer;

pub use basic_tags::RasterLayout;
pub use geo_tags::GeoTiffTags;
pub use writer::TiffFormat;
