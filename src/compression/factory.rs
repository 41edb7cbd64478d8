//! Selection of compression handlers

use std::fmt;
use std::str::FromStr;

use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::CompressionHandler;
use super::uncompressed::UncompressedHandler;
use super::deflate::AdobeDeflateHandler;

/// Compression schemes the writer can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionKind {
    None,
    #[default]
    Deflate,
    Zstd,
}

impl CompressionKind {
    /// TIFF `Compression` tag value
    pub fn code(&self) -> u16 {
        match self {
            CompressionKind::None => 1,
            CompressionKind::Deflate => 8,
            CompressionKind::Zstd => 50000,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CompressionKind::None => "none",
            CompressionKind::Deflate => "deflate",
            CompressionKind::Zstd => "zstd",
        }
    }

    /// Whether this build can encode the scheme
    pub fn is_available(&self) -> bool {
        match self {
            CompressionKind::None | CompressionKind::Deflate => true,
            CompressionKind::Zstd => cfg!(feature = "zstd"),
        }
    }
}

impl fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompressionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "uncompressed" => Ok(CompressionKind::None),
            "deflate" | "zip" | "adobe deflate" => Ok(CompressionKind::Deflate),
            "zstd" | "zstandard" => Ok(CompressionKind::Zstd),
            other => Err(format!("Unknown compression '{}', expected none, deflate or zstd", other)),
        }
    }
}

/// Factory for creating compression handlers
pub struct CompressionFactory;

impl CompressionFactory {
    /// Handler for a TIFF compression code found in a file
    pub fn create_handler(code: u16) -> TiffResult<Box<dyn CompressionHandler>> {
        match code {
            1 => Ok(Box::new(UncompressedHandler)),
            // 32946 is the pre-standard deflate code, same stream format
            8 | 32946 => Ok(Box::new(AdobeDeflateHandler::new())),
            50000 => Self::zstd_handler(),
            _ => Err(TiffError::UnsupportedCompression(code as u64)),
        }
    }

    /// Handler used when writing with `kind`
    pub fn for_kind(kind: CompressionKind) -> TiffResult<Box<dyn CompressionHandler>> {
        Self::create_handler(kind.code())
    }

    #[cfg(feature = "zstd")]
    fn zstd_handler() -> TiffResult<Box<dyn CompressionHandler>> {
        Ok(Box::new(super::zstd::ZstdHandler::new()))
    }

    #[cfg(not(feature = "zstd"))]
    fn zstd_handler() -> TiffResult<Box<dyn CompressionHandler>> {
        Err(TiffError::UnsupportedCompression(50000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names() {
        assert_eq!("DEFLATE".parse::<CompressionKind>().unwrap(), CompressionKind::Deflate);
        assert_eq!("none".parse::<CompressionKind>().unwrap(), CompressionKind::None);
        assert_eq!("zstd".parse::<CompressionKind>().unwrap(), CompressionKind::Zstd);
        assert!("lzw".parse::<CompressionKind>().is_err());
    }

    #[test]
    fn handlers_report_their_codes() {
        assert_eq!(CompressionFactory::create_handler(1).unwrap().code(), 1);
        assert_eq!(CompressionFactory::create_handler(32946).unwrap().code(), 8);
        assert!(CompressionFactory::create_handler(5).is_err());
        assert_eq!(
            CompressionFactory::create_handler(50000).is_ok(),
            CompressionKind::Zstd.is_available()
        );
    }
}
