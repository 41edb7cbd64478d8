//! Request and settings types
//!
//! A [`MosaicRequest`] is what a caller asks for: where to write, which box,
//! which zoom, which tile source. [`FetchSettings`] and [`OutputSettings`]
//! tune how it is done and can be loaded from a TOML file with `[fetch]`,
//! `[output]` and `[providers]` tables.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use log::debug;
use toml::Value;

use crate::compression::CompressionKind;
use crate::coordinate::{CoordinateMapper, CoordinateSystem, CoordinateSystemFactory, MAX_ZOOM};
use crate::errors::{MosaicError, MosaicResult};
use crate::fetch::client::DEFAULT_USER_AGENT;
use crate::fetch::provider::{ProviderRegistry, ProviderTier};

/// Zoom level, given directly or derived from a ground resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoomSpec {
    Zoom(u8),
    /// Metres per pixel at the equator
    Resolution(f64),
}

impl ZoomSpec {
    /// Build from the two optional inputs; exactly one must be set
    pub fn from_options(zoom: Option<u8>, resolution: Option<f64>) -> MosaicResult<Self> {
        match (zoom, resolution) {
            (Some(z), None) => Ok(ZoomSpec::Zoom(z)),
            (None, Some(r)) => Ok(ZoomSpec::Resolution(r)),
            (Some(_), Some(_)) => Err(MosaicError::config("Specify either zoom or resolution, not both")),
            (None, None) => Err(MosaicError::config("Specify either zoom or resolution")),
        }
    }

    /// Concrete tile zoom level
    pub fn resolve(&self) -> MosaicResult<u8> {
        match *self {
            ZoomSpec::Zoom(z) if z > MAX_ZOOM => Err(MosaicError::config(format!(
                "Zoom {} is above the maximum of {}", z, MAX_ZOOM))),
            ZoomSpec::Zoom(z) => Ok(z),
            ZoomSpec::Resolution(r) => CoordinateMapper::resolution_to_zoom(r),
        }
    }
}

/// Sampling used when reprojecting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resampling {
    #[default]
    Nearest,
    Bilinear,
}

impl FromStr for Resampling {
    type Err = MosaicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nearest" | "near" => Ok(Resampling::Nearest),
            "bilinear" => Ok(Resampling::Bilinear),
            other => Err(MosaicError::config(format!(
                "Unknown resampling '{}', expected nearest or bilinear", other))),
        }
    }
}

/// Default cap on the tiles of one request
pub const DEFAULT_MAX_TILES: u64 = 10_000;

/// How tiles are downloaded
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    /// Concurrent requests in flight
    pub concurrency: usize,
    /// Attempts per tile before giving up
    pub max_attempts: u32,
    /// Timeout of a single attempt
    pub request_timeout: Duration,
    /// Limit for the whole fetch phase
    pub overall_deadline: Option<Duration>,
    pub user_agent: String,
    /// Largest tile range a single call may request
    pub max_tiles: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        FetchSettings {
            concurrency: 5,
            max_attempts: 3,
            request_timeout: Duration::from_secs(60),
            overall_deadline: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_tiles: DEFAULT_MAX_TILES,
        }
    }
}

impl FetchSettings {
    /// Reject a tile range larger than `max_tiles`
    pub fn check_tile_count(&self, count: u64) -> MosaicResult<()> {
        if count > self.max_tiles {
            return Err(MosaicError::config(format!(
                "Request covers {} tiles, more than the limit of {}; use a smaller box or zoom",
                count, self.max_tiles)));
        }
        Ok(())
    }
}

/// What gets written
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    /// CRS of the final raster
    pub crs: CoordinateSystem,
    pub compression: CompressionKind,
    /// Internal TIFF tile edge in pixels, a multiple of 16
    pub tile_size: u32,
    pub resampling: Resampling,
    pub convert_to_cog: bool,
    pub overwrite: bool,
    /// Return the cropped pixels instead of writing a file
    pub return_image: bool,
    /// Hide the progress bar
    pub quiet: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings {
            crs: CoordinateSystem::WebMercator,
            compression: CompressionKind::Deflate,
            tile_size: 256,
            resampling: Resampling::Nearest,
            convert_to_cog: false,
            overwrite: false,
            return_image: false,
            quiet: true,
        }
    }
}

impl OutputSettings {
    pub fn validate(&self) -> MosaicResult<()> {
        if self.tile_size == 0 || self.tile_size % 16 != 0 {
            return Err(MosaicError::config(format!(
                "Tile size {} must be a positive multiple of 16", self.tile_size)));
        }
        Ok(())
    }
}

/// One mosaic to build
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicRequest {
    pub output: PathBuf,
    /// `[west, south, east, north]` in WGS84 degrees, validated when the request runs
    pub bbox: Vec<f64>,
    pub zoom: ZoomSpec,
    /// Provider name or URL template
    pub source: String,
    pub output_settings: OutputSettings,
}

impl MosaicRequest {
    pub fn new(output: impl Into<PathBuf>, bbox: &[f64], zoom: ZoomSpec, source: &str) -> Self {
        MosaicRequest {
            output: output.into(),
            bbox: bbox.to_vec(),
            zoom,
            source: source.to_string(),
            output_settings: OutputSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: OutputSettings) -> Self {
        self.output_settings = settings;
        self
    }

    pub fn crs(mut self, crs: CoordinateSystem) -> Self {
        self.output_settings.crs = crs;
        self
    }

    pub fn convert_to_cog(mut self, cog: bool) -> Self {
        self.output_settings.convert_to_cog = cog;
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.output_settings.overwrite = overwrite;
        self
    }

    pub fn return_image(mut self, return_image: bool) -> Self {
        self.output_settings.return_image = return_image;
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.output_settings.quiet = quiet;
        self
    }
}

/// Contents of a `--config` TOML file
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub fetch: FetchSettings,
    pub output: OutputSettings,
    pub providers: ProviderRegistry,
}

impl Default for ConfigFile {
    fn default() -> Self {
        ConfigFile {
            fetch: FetchSettings::default(),
            output: OutputSettings::default(),
            providers: ProviderRegistry::builtin(),
        }
    }
}

impl ConfigFile {
    pub fn load(path: &Path) -> MosaicResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| MosaicError::config(format!("Cannot read config {}: {}", path.display(), e)))?;
        debug!("Loading configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Parse configuration; absent keys keep their defaults
    pub fn from_toml_str(content: &str) -> MosaicResult<Self> {
        let value = content.parse::<Value>()
            .map_err(|e| MosaicError::config(format!("Invalid config TOML: {}", e)))?;

        let mut config = ConfigFile::default();

        if let Some(fetch) = value.get("fetch") {
            if let Some(n) = get_integer(fetch, "concurrency")? {
                config.fetch.concurrency = positive(n, "fetch.concurrency")? as usize;
            }
            if let Some(n) = get_integer(fetch, "max_attempts")? {
                config.fetch.max_attempts = positive(n, "fetch.max_attempts")? as u32;
            }
            if let Some(secs) = get_float(fetch, "request_timeout_secs")? {
                config.fetch.request_timeout = seconds(secs, "fetch.request_timeout_secs")?;
            }
            if let Some(secs) = get_float(fetch, "overall_deadline_secs")? {
                config.fetch.overall_deadline = Some(seconds(secs, "fetch.overall_deadline_secs")?);
            }
            if let Some(n) = get_integer(fetch, "max_tiles")? {
                config.fetch.max_tiles = positive(n, "fetch.max_tiles")? as u64;
            }
            if let Some(agent) = fetch.get("user_agent").and_then(|v| v.as_str()) {
                config.fetch.user_agent = agent.to_string();
            }
        }

        if let Some(output) = value.get("output") {
            if let Some(crs) = output.get("crs").and_then(|v| v.as_str()) {
                config.output.crs = CoordinateSystemFactory::from_string(crs)?;
            }
            if let Some(compression) = output.get("compression").and_then(|v| v.as_str()) {
                config.output.compression = compression.parse().map_err(MosaicError::Configuration)?;
            }
            if let Some(n) = get_integer(output, "tile_size")? {
                config.output.tile_size = positive(n, "output.tile_size")? as u32;
            }
            if let Some(resampling) = output.get("resampling").and_then(|v| v.as_str()) {
                config.output.resampling = resampling.parse()?;
            }
            if let Some(cog) = output.get("cog").and_then(|v| v.as_bool()) {
                config.output.convert_to_cog = cog;
            }
            if let Some(overwrite) = output.get("overwrite").and_then(|v| v.as_bool()) {
                config.output.overwrite = overwrite;
            }
            config.output.validate()?;
        }

        if let Some(providers) = value.get("providers").and_then(|v| v.as_table()) {
            for (name, entry) in providers {
                let source = ProviderRegistry::parse_entry(name, entry, ProviderTier::Registry)?;
                config.providers.insert(source);
            }
        }

        Ok(config)
    }
}

fn get_integer(table: &Value, key: &str) -> MosaicResult<Option<i64>> {
    match table.get(key) {
        None => Ok(None),
        Some(Value::Integer(n)) => Ok(Some(*n)),
        Some(other) => Err(MosaicError::config(format!("'{}' must be an integer, got {}", key, other))),
    }
}

fn get_float(table: &Value, key: &str) -> MosaicResult<Option<f64>> {
    match table.get(key) {
        None => Ok(None),
        Some(Value::Integer(n)) => Ok(Some(*n as f64)),
        Some(Value::Float(f)) => Ok(Some(*f)),
        Some(other) => Err(MosaicError::config(format!("'{}' must be a number, got {}", key, other))),
    }
}

fn positive(n: i64, key: &str) -> MosaicResult<i64> {
    if n > 0 && n <= u32::MAX as i64 {
        Ok(n)
    } else {
        Err(MosaicError::config(format!("'{}' must be positive, got {}", key, n)))
    }
}

fn seconds(secs: f64, key: &str) -> MosaicResult<Duration> {
    if secs.is_finite() && secs > 0.0 {
        Ok(Duration::from_secs_f64(secs))
    } else {
        Err(MosaicError::config(format!("'{}' must be a positive number of seconds", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_spec_requires_exactly_one() {
        assert_eq!(ZoomSpec::from_options(Some(15), None).unwrap(), ZoomSpec::Zoom(15));
        assert_eq!(ZoomSpec::from_options(None, Some(2.5)).unwrap(), ZoomSpec::Resolution(2.5));
        assert!(matches!(ZoomSpec::from_options(Some(15), Some(2.5)), Err(MosaicError::Configuration(_))));
        assert!(matches!(ZoomSpec::from_options(None, None), Err(MosaicError::Configuration(_))));
    }

    #[test]
    fn zoom_spec_resolves_resolution() {
        assert_eq!(ZoomSpec::Resolution(156543.03392804097).resolve().unwrap(), 0);
        assert_eq!(ZoomSpec::Resolution(4.7).resolve().unwrap(), 15);
        assert!(ZoomSpec::Zoom(31).resolve().is_err());
    }

    #[test]
    fn defaults_match_reference_values() {
        let fetch = FetchSettings::default();
        assert_eq!(fetch.concurrency, 5);
        assert_eq!(fetch.max_attempts, 3);
        assert_eq!(fetch.request_timeout, Duration::from_secs(60));
        assert_eq!(fetch.max_tiles, DEFAULT_MAX_TILES);

        let output = OutputSettings::default();
        assert_eq!(output.crs, CoordinateSystem::WebMercator);
        assert!(output.quiet);
        assert!(!output.overwrite);
    }

    #[test]
    fn tile_count_above_limit_is_rejected() {
        let fetch = FetchSettings { max_tiles: 4, ..FetchSettings::default() };
        assert!(fetch.check_tile_count(4).is_ok());
        assert!(matches!(fetch.check_tile_count(5), Err(MosaicError::Configuration(_))));
    }

    #[test]
    fn config_file_overrides_and_extends() {
        let config = ConfigFile::from_toml_str(r#"
            [fetch]
            concurrency = 8
            request_timeout_secs = 2.5
            overall_deadline_secs = 120
            max_tiles = 500

            [output]
            crs = "EPSG:4326"
            compression = "none"
            resampling = "bilinear"
            cog = true

            [providers.Mine]
            url = "https://tiles.internal/{z}/{x}/{y}.png"
        "#).unwrap();

        assert_eq!(config.fetch.concurrency, 8);
        assert_eq!(config.fetch.max_attempts, 3);
        assert_eq!(config.fetch.request_timeout, Duration::from_millis(2500));
        assert_eq!(config.fetch.overall_deadline, Some(Duration::from_secs(120)));
        assert_eq!(config.fetch.max_tiles, 500);
        assert_eq!(config.output.crs, CoordinateSystem::WGS84);
        assert_eq!(config.output.compression, CompressionKind::None);
        assert_eq!(config.output.resampling, Resampling::Bilinear);
        assert!(config.output.convert_to_cog);
        assert!(config.providers.resolve("mine").is_ok());
        assert!(config.providers.resolve("SATELLITE").is_ok());
    }

    #[test]
    fn config_file_rejects_bad_values() {
        assert!(ConfigFile::from_toml_str("[fetch]\nconcurrency = 0").is_err());
        assert!(ConfigFile::from_toml_str("[fetch]\nconcurrency = \"five\"").is_err());
        assert!(ConfigFile::from_toml_str("[fetch]\nmax_tiles = -1").is_err());
        assert!(ConfigFile::from_toml_str("[output]\ntile_size = 100").is_err());
        assert!(ConfigFile::from_toml_str("[output]\ncompression = \"lzw\"").is_err());
    }
}
