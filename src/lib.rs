pub mod io;
pub mod tiff;
pub mod utils;
pub mod compression;
pub mod coordinate;
pub mod fetch;
pub mod mosaic;
pub mod georef;
pub mod postprocess;
pub mod config;
pub mod errors;
pub mod commands;
pub mod api;

pub use crate::api::{MosaicOutcome, MosaicReport, TileMosaic};
pub use crate::config::{ConfigFile, FetchSettings, MosaicRequest, OutputSettings, Resampling, ZoomSpec};
pub use crate::errors::{MosaicError, MosaicResult};

pub use tiff::TiffReader;
pub use mosaic::{ChannelMode, PixelBuffer};
pub use fetch::{FetchAttemptError, TileClient, TileResponse};
pub use coordinate::{BoundingBox, CoordinateSystem, TileCoordinate};
