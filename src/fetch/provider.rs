//! Tile source resolution
//!
//! A source string resolves through three tiers:
//! 1. the well-known basemap names (`ROADMAP`, `SATELLITE`, ...),
//! 2. the registry of free XYZ providers (`Esri.WorldImagery`, ...), plus
//!    any providers added through the configuration file,
//! 3. a literal `http(s)://` URL template containing `{x}`, `{y}` and `{z}`.
//!
//! The built-in registry lives in `tile_providers.toml` and is parsed once.

use std::collections::BTreeMap;
use lazy_static::lazy_static;
use log::{debug, error};
use regex::Regex;
use toml::Value;

use crate::coordinate::TileCoordinate;
use crate::errors::{MosaicError, MosaicResult};

/// Which resolution tier a source came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProviderTier {
    /// Fixed table of well-known basemaps
    Basemap,
    /// Registry of free XYZ providers
    Registry,
    /// Literal URL template
    Template,
}

/// A resolved tile source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSource {
    /// Display name
    pub name: String,
    /// URL template with `{z}`, `{x}`, `{y}` (and optionally `{s}`, `{r}`)
    pub template: String,
    /// Values substituted for `{s}`
    pub subdomains: Vec<String>,
    /// Attribution text, when known
    pub attribution: Option<String>,
    /// Maximum zoom advertised by the provider
    pub max_zoom: Option<u8>,
    /// Tier the source was resolved from
    pub tier: ProviderTier,
}

impl TileSource {
    /// Build a template source after validating the URL
    pub fn from_template(template: &str) -> MosaicResult<Self> {
        validate_template(template)?;
        Ok(TileSource {
            name: template.to_string(),
            template: template.to_string(),
            subdomains: Vec::new(),
            attribution: None,
            max_zoom: None,
            tier: ProviderTier::Template,
        })
    }

    /// Concrete URL for one tile
    ///
    /// `{s}` picks a subdomain deterministically from `(x + y) mod n`.
    pub fn url_for(&self, tile: &TileCoordinate) -> String {
        let mut url = self.template
            .replace("{z}", &tile.zoom.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
            .replace("{r}", "");

        if url.contains("{s}") {
            let subdomain = if self.subdomains.is_empty() {
                ""
            } else {
                let index = (tile.x as u64 + tile.y as u64) % self.subdomains.len() as u64;
                self.subdomains[index as usize].as_str()
            };
            url = url.replace("{s}", subdomain);
        }

        url
    }
}

lazy_static! {
    static ref TEMPLATE_SCHEME: Regex = Regex::new(r"^https?://[^\s/$.?#][^\s]*$").unwrap();
    static ref PLACEHOLDER: Regex = Regex::new(r"\{([a-z]+)\}").unwrap();

    static ref BUILTIN: ProviderRegistry = {
        let content = include_str!("../../tile_providers.toml");
        match ProviderRegistry::from_toml_str(content) {
            Ok(registry) => registry,
            Err(e) => {
                error!("Failed to parse built-in tile providers: {}", e);
                ProviderRegistry::default()
            }
        }
    };
}

/// Check that a literal template is an http(s) URL with the three placeholders
pub fn validate_template(template: &str) -> MosaicResult<()> {
    if !TEMPLATE_SCHEME.is_match(template) {
        return Err(MosaicError::config(format!(
            "Tile source '{}' is neither a known provider nor an http(s) URL template", template)));
    }

    let placeholders: Vec<&str> = PLACEHOLDER
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    for required in ["x", "y", "z"] {
        if !placeholders.contains(&required) {
            return Err(MosaicError::config(format!(
                "URL template '{}' is missing the {{{}}} placeholder", template, required)));
        }
    }

    if let Some(unknown) = placeholders.iter().find(|p| !matches!(**p, "x" | "y" | "z" | "s" | "r")) {
        return Err(MosaicError::config(format!(
            "URL template '{}' has unsupported placeholder {{{}}}", template, unknown)));
    }

    Ok(())
}

/// Named tile providers, keyed by their canonical name
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    basemaps: BTreeMap<String, TileSource>,
    providers: BTreeMap<String, TileSource>,
}

impl ProviderRegistry {
    /// The registry compiled into the binary
    pub fn builtin() -> ProviderRegistry {
        BUILTIN.clone()
    }

    /// Parse a registry from TOML with `[basemaps.NAME]` and `[xyz.NAME]` tables
    pub fn from_toml_str(content: &str) -> MosaicResult<Self> {
        let value = content.parse::<Value>()
            .map_err(|e| MosaicError::config(format!("Invalid provider TOML: {}", e)))?;

        let mut registry = ProviderRegistry::default();

        if let Some(table) = value.get("basemaps").and_then(|v| v.as_table()) {
            for (name, entry) in table {
                let source = Self::parse_entry(name, entry, ProviderTier::Basemap)?;
                registry.basemaps.insert(name.to_uppercase(), source);
            }
        }

        if let Some(table) = value.get("xyz").and_then(|v| v.as_table()) {
            for (name, entry) in table {
                registry.insert(Self::parse_entry(name, entry, ProviderTier::Registry)?);
            }
        }

        debug!("Loaded {} basemaps and {} XYZ providers",
               registry.basemaps.len(), registry.providers.len());
        Ok(registry)
    }

    /// Parse one provider table: `url`, optional `subdomains`, `attribution`, `max_zoom`
    pub fn parse_entry(name: &str, entry: &Value, tier: ProviderTier) -> MosaicResult<TileSource> {
        let template = entry.get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| MosaicError::config(format!("Provider '{}' has no url", name)))?;
        validate_template(template)?;

        let subdomains = match entry.get("subdomains") {
            Some(Value::Array(items)) => items.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(s)) => s.chars().map(|c| c.to_string()).collect(),
            _ => Vec::new(),
        };

        Ok(TileSource {
            name: name.to_string(),
            template: template.to_string(),
            subdomains,
            attribution: entry.get("attribution").and_then(|v| v.as_str()).map(str::to_string),
            max_zoom: entry.get("max_zoom")
                .and_then(|v| v.as_integer())
                .and_then(|z| u8::try_from(z).ok()),
            tier,
        })
    }

    /// Add or replace a registry provider
    pub fn insert(&mut self, source: TileSource) {
        self.providers.insert(source.name.to_lowercase(), source);
    }

    /// Resolve a source name or URL template
    pub fn resolve(&self, source: &str) -> MosaicResult<TileSource> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(MosaicError::config("Tile source must not be empty"));
        }

        if let Some(basemap) = self.basemaps.get(&trimmed.to_uppercase()) {
            debug!("Resolved '{}' as basemap", trimmed);
            return Ok(basemap.clone());
        }

        if let Some(provider) = self.providers.get(&trimmed.to_lowercase()) {
            debug!("Resolved '{}' as registry provider", trimmed);
            return Ok(provider.clone());
        }

        TileSource::from_template(trimmed)
    }

    /// All named sources, basemaps first
    pub fn list(&self) -> Vec<&TileSource> {
        self.basemaps.values().chain(self.providers.values()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_basemaps_resolve_case_insensitively() {
        let registry = ProviderRegistry::builtin();
        let source = registry.resolve("satellite").unwrap();
        assert_eq!(source.tier, ProviderTier::Basemap);
        assert_eq!(source.template, "https://mt1.google.com/vt/lyrs=s&x={x}&y={y}&z={z}");
        assert!(registry.resolve("ROADMAP").unwrap().template.contains("lyrs=m"));
        assert!(registry.resolve("Hybrid").unwrap().template.contains("lyrs=y"));
        assert!(registry.resolve("terrain").unwrap().template.contains("lyrs=p"));
    }

    #[test]
    fn registry_providers_resolve_by_dotted_name() {
        let registry = ProviderRegistry::builtin();
        let source = registry.resolve("esri.worldimagery").unwrap();
        assert_eq!(source.tier, ProviderTier::Registry);
        assert_eq!(source.name, "Esri.WorldImagery");
        assert!(registry.resolve("OpenStreetMap.Mapnik").is_ok());
    }

    #[test]
    fn literal_templates_are_validated() {
        let registry = ProviderRegistry::builtin();
        let source = registry.resolve("https://tiles.example.com/{z}/{x}/{y}.png").unwrap();
        assert_eq!(source.tier, ProviderTier::Template);

        assert!(registry.resolve("ftp://tiles.example.com/{z}/{x}/{y}.png").is_err());
        assert!(registry.resolve("https://tiles.example.com/{z}/{x}.png").is_err());
        assert!(registry.resolve("https://tiles.example.com/{z}/{x}/{y}/{q}.png").is_err());
        assert!(matches!(registry.resolve("NotAProvider"), Err(MosaicError::Configuration(_))));
    }

    #[test]
    fn url_substitution() {
        let source = TileSource::from_template("https://t.example.com/{z}/{x}/{y}{r}.png").unwrap();
        let url = source.url_for(&TileCoordinate::new(8816, 12120, 15));
        assert_eq!(url, "https://t.example.com/15/8816/12120.png");
    }

    #[test]
    fn subdomains_rotate_with_tile_position() {
        let registry = ProviderRegistry::builtin();
        let source = registry.resolve("CartoDB.Positron").unwrap();
        let a = source.url_for(&TileCoordinate::new(0, 0, 2));
        let b = source.url_for(&TileCoordinate::new(1, 0, 2));
        let c = source.url_for(&TileCoordinate::new(0, 1, 2));
        assert!(a.starts_with("https://a."));
        assert!(b.starts_with("https://b."));
        assert_eq!(b, source.url_for(&TileCoordinate::new(1, 0, 2)));
        assert!(c.starts_with("https://b."));
    }

    #[test]
    fn custom_registry_from_toml() {
        let registry = ProviderRegistry::from_toml_str(r#"
            [xyz.Local]
            url = "http://localhost:8080/{z}/{x}/{y}.png"
            subdomains = "ab"
        "#).unwrap();
        let source = registry.resolve("local").unwrap();
        assert_eq!(source.subdomains, vec!["a".to_string(), "b".to_string()]);
    }
}
