//! Error taxonomy for the mosaic pipeline
//!
//! Configuration and backend problems surface before any network I/O.
//! Fetch errors are only raised once a tile has exhausted its retries.
//! Missing tiles and an already-existing output are not errors at all:
//! they are modelled as `None` in the fetch results and as
//! [`crate::api::MosaicOutcome::AlreadyExists`].

use std::time::Duration;
use thiserror::Error;

use crate::coordinate::TileCoordinate;
use crate::tiff::errors::TiffError;

/// Errors raised while building a mosaic
#[derive(Debug, Error)]
pub enum MosaicError {
    /// Invalid bbox, zoom/resolution combination, tile source or CRS.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A tile failed on every attempt, or answered with a hard HTTP status.
    #[error("Failed to fetch tile {tile}: {reason}")]
    Fetch {
        /// Tile that could not be retrieved.
        tile: TileCoordinate,
        /// Last error observed for this tile.
        reason: String,
    },

    /// A tile body arrived but could not be decoded as an image.
    #[error("Failed to decode tile {tile}: {reason}")]
    TileDecode {
        /// Tile whose body was undecodable.
        tile: TileCoordinate,
        /// Decoder message.
        reason: String,
    },

    /// A fetch worker died before reporting a result.
    #[error("Tile worker failed: {0}")]
    Worker(String),

    /// The whole fetch phase ran past the configured deadline.
    #[error("Tile fetching exceeded the overall deadline of {0:?}")]
    Deadline(Duration),

    /// The raster backend cannot serve the requested options.
    #[error("Raster backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Coordinate transformation failure.
    #[error("Projection error: {0}")]
    Projection(String),

    /// Failure in the native TIFF layer.
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// Image encode/decode failure outside of tile decoding.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for mosaic operations
pub type MosaicResult<T> = Result<T, MosaicError>;

impl MosaicError {
    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        MosaicError::Configuration(message.into())
    }

    /// True for errors that are raised before any tile is requested
    pub fn is_pre_flight(&self) -> bool {
        matches!(self, MosaicError::Configuration(_) | MosaicError::BackendUnavailable(_))
    }
}
