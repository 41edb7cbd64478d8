//! Coordinate Reference System handling

use std::fmt;

use super::crs_data::ProjDataLocator;
use crate::errors::{MosaicError, MosaicResult};

/// Identifier for common coordinate systems
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSystem {
    /// WGS 84 (EPSG:4326)
    WGS84,
    /// Web Mercator (EPSG:3857)
    WebMercator,
    /// UTM Zone (EPSG:326xx for northern hemisphere, 327xx for southern)
    UTM(u8, bool),
    /// Other EPSG code
    Other(u32),
}

impl CoordinateSystem {
    /// Get the EPSG code for this coordinate system
    pub fn epsg_code(&self) -> u32 {
        match self {
            CoordinateSystem::WGS84 => 4326,
            CoordinateSystem::WebMercator => 3857,
            CoordinateSystem::UTM(zone, is_northern) => {
                if *is_northern {
                    32600 + *zone as u32
                } else {
                    32700 + *zone as u32
                }
            },
            CoordinateSystem::Other(code) => *code,
        }
    }

    /// Get a description of this coordinate system
    pub fn description(&self) -> String {
        match self {
            CoordinateSystem::WGS84 => "WGS 84 (EPSG:4326)".to_string(),
            CoordinateSystem::WebMercator => "Web Mercator (EPSG:3857)".to_string(),
            CoordinateSystem::UTM(zone, is_northern) => {
                let hemisphere = if *is_northern { 'N' } else { 'S' };
                format!("UTM Zone {}{} (EPSG:{})", zone, hemisphere, self.epsg_code())
            },
            CoordinateSystem::Other(code) => format!("EPSG:{}", code),
        }
    }

    /// PROJ definition string for this CRS
    ///
    /// Looks in the bundled `crs-definitions` database first and falls back to
    /// the legacy `epsg` init file of a discovered PROJ data directory.
    pub fn proj_string(&self) -> MosaicResult<String> {
        let code = self.epsg_code();

        if let Some(definition) = u16::try_from(code).ok().and_then(crs_definitions::from_code) {
            return Ok(definition.proj4.to_string());
        }

        ProjDataLocator::discover()
            .and_then(|dir| ProjDataLocator::lookup_epsg_init(&dir, code))
            .ok_or_else(|| MosaicError::Projection(format!(
                "EPSG:{} is neither in the built-in CRS database nor in a PROJ 'epsg' init file", code)))
    }

    /// Whether coordinates in this CRS are longitude/latitude degrees
    pub fn is_geographic(&self) -> bool {
        match self {
            CoordinateSystem::WGS84 => true,
            CoordinateSystem::WebMercator | CoordinateSystem::UTM(_, _) => false,
            CoordinateSystem::Other(code) => match self.proj_string() {
                Ok(proj) => proj.contains("+proj=longlat") || proj.contains("+proj=latlong"),
                Err(_) => (4000..5000).contains(code),
            },
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg_code())
    }
}

/// Factory for creating coordinate systems
pub struct CoordinateSystemFactory;

impl CoordinateSystemFactory {
    /// Create a coordinate system from an EPSG code
    pub fn from_epsg(epsg: u32) -> CoordinateSystem {
        match epsg {
            4326 => CoordinateSystem::WGS84,
            3857 | 900913 => CoordinateSystem::WebMercator,
            32601..=32660 => CoordinateSystem::UTM((epsg - 32600) as u8, true),
            32701..=32760 => CoordinateSystem::UTM((epsg - 32700) as u8, false),
            _ => CoordinateSystem::Other(epsg),
        }
    }

    /// Parse a coordinate system from a string (e.g. "EPSG:4326" or "4326")
    pub fn from_string(crs_str: &str) -> MosaicResult<CoordinateSystem> {
        let normalized = crs_str.trim().to_uppercase();
        let code_str = normalized.strip_prefix("EPSG:").unwrap_or(&normalized);

        match code_str.parse::<u32>() {
            Ok(epsg) if epsg > 0 => Ok(Self::from_epsg(epsg)),
            _ => Err(MosaicError::config(format!(
                "Unsupported CRS '{}', expected an identifier like EPSG:3857", crs_str))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_epsg_strings() {
        assert_eq!(CoordinateSystemFactory::from_string("EPSG:3857").unwrap(), CoordinateSystem::WebMercator);
        assert_eq!(CoordinateSystemFactory::from_string(" epsg:4326 ").unwrap(), CoordinateSystem::WGS84);
        assert_eq!(CoordinateSystemFactory::from_string("32617").unwrap(), CoordinateSystem::UTM(17, true));
        assert_eq!(CoordinateSystemFactory::from_string("EPSG:2154").unwrap(), CoordinateSystem::Other(2154));
    }

    #[test]
    fn rejects_unknown_formats() {
        assert!(CoordinateSystemFactory::from_string("WGS84").is_err());
        assert!(CoordinateSystemFactory::from_string("EPSG:").is_err());
        assert!(CoordinateSystemFactory::from_string("EPSG:0").is_err());
    }

    #[test]
    fn geographic_detection() {
        assert!(CoordinateSystem::WGS84.is_geographic());
        assert!(!CoordinateSystem::WebMercator.is_geographic());
        assert!(!CoordinateSystem::UTM(33, true).is_geographic());
        assert!(CoordinateSystem::Other(4269).is_geographic());
    }

    #[test]
    fn utm_round_trips_epsg() {
        assert_eq!(CoordinateSystem::UTM(17, true).epsg_code(), 32617);
        assert_eq!(CoordinateSystem::UTM(56, false).epsg_code(), 32756);
    }
}
