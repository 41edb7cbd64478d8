//! Compression handling for TIFF chunks
//!
//! Each supported TIFF compression scheme has a [`CompressionHandler`].
//! Zstandard is only compiled in with the `zstd` feature; requesting it
//! otherwise is reported as an unavailable backend.

mod handler;
mod uncompressed;
mod deflate;
mod factory;
#[cfg(feature = "zstd")]
mod zstd;

pub use handler::CompressionHandler;
pub use uncompressed::UncompressedHandler;
pub use deflate::AdobeDeflateHandler;
pub use factory::{CompressionFactory, CompressionKind};
#[cfg(feature = "zstd")]
pub use self::zstd::ZstdHandler;
