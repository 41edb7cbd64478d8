//! Tile retrieval
//!
//! Resolving a tile source, talking HTTP, and downloading a tile set under
//! a bounded worker pool.

pub mod client;
pub mod provider;
mod fetcher;

pub use client::{FetchAttemptError, HttpTileClient, TileClient, TileResponse};
pub use provider::{ProviderRegistry, ProviderTier, TileSource};
pub use fetcher::{FetchedTiles, TileFetcher};
