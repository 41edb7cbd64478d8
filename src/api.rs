//! Library entry point
//!
//! [`TileMosaic`] runs the whole pipeline: resolve the request, fetch the
//! tiles, assemble and crop them, then georeference, write and optionally
//! post-process the result.

use std::path::PathBuf;
use std::sync::Arc;
use log::{debug, info, warn};

use crate::config::{ConfigFile, FetchSettings, MosaicRequest};
use crate::coordinate::{BoundingBox, CoordinateSystem, CoordinateTransformer, ProjDataLocator, TileRange};
use crate::errors::MosaicResult;
use crate::fetch::{HttpTileClient, ProviderRegistry, TileClient, TileFetcher};
use crate::georef::{GeoReferencer, GeoTiffWriter, RasterWriter, WriteOptions};
use crate::mosaic::{AssemblyStats, Cropper, MosaicAssembler, PixelBuffer};
use crate::postprocess::{CogConverter, Reprojector};

/// Result of a successful call
#[derive(Debug, Clone, PartialEq)]
pub enum MosaicOutcome {
    /// A GeoTIFF was written
    Written {
        path: PathBuf,
        width: u32,
        height: u32,
        bands: usize,
    },
    /// The cropped pixels, nothing written
    Image(PixelBuffer),
    /// The output exists and overwriting was not requested; nothing was done
    AlreadyExists(PathBuf),
}

/// Tile counts of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MosaicReport {
    pub requested: u64,
    pub fetched: usize,
    pub absent: usize,
    pub blank_skipped: usize,
    /// Requests issued, retries included
    pub attempts: u64,
}

impl MosaicReport {
    fn new(requested: u64, attempts: u64, stats: &AssemblyStats) -> Self {
        MosaicReport {
            requested,
            fetched: stats.pasted + stats.blank_skipped,
            absent: stats.absent,
            blank_skipped: stats.blank_skipped,
            attempts,
        }
    }
}

/// Main interface to the tilemosaic library
pub struct TileMosaic {
    client: Arc<dyn TileClient>,
    fetch_settings: FetchSettings,
    providers: ProviderRegistry,
    writer: Box<dyn RasterWriter>,
}

impl TileMosaic {
    /// Pipeline with the HTTP client, built-in providers and default settings
    pub fn new() -> MosaicResult<Self> {
        Self::from_config(ConfigFile::default())
    }

    /// Pipeline configured from a loaded config file
    pub fn from_config(config: ConfigFile) -> MosaicResult<Self> {
        let client = HttpTileClient::new(config.fetch.request_timeout, &config.fetch.user_agent)?;
        Ok(Self::with_client(Arc::new(client))
            .fetch_settings(config.fetch)
            .providers(config.providers))
    }

    /// Pipeline fetching through `client`
    pub fn with_client(client: Arc<dyn TileClient>) -> Self {
        TileMosaic {
            client,
            fetch_settings: FetchSettings::default(),
            providers: ProviderRegistry::builtin(),
            writer: Box::new(GeoTiffWriter::new()),
        }
    }

    pub fn fetch_settings(mut self, settings: FetchSettings) -> Self {
        self.fetch_settings = settings;
        self
    }

    pub fn providers(mut self, providers: ProviderRegistry) -> Self {
        self.providers = providers;
        self
    }

    pub fn writer(mut self, writer: Box<dyn RasterWriter>) -> Self {
        self.writer = writer;
        self
    }

    pub fn provider_registry(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Build the mosaic described by `request`
    ///
    /// An existing output is left alone unless `overwrite` is set. All
    /// validation happens before the first tile request.
    pub async fn build_mosaic_geotiff(&self, request: &MosaicRequest) -> MosaicResult<MosaicOutcome> {
        let settings = &request.output_settings;

        if !settings.return_image && !settings.overwrite && request.output.exists() {
            warn!("{} already exists, skipping (set overwrite to replace it)", request.output.display());
            return Ok(MosaicOutcome::AlreadyExists(request.output.clone()));
        }

        let bbox = BoundingBox::from_slice(&request.bbox)?;
        let zoom = request.zoom.resolve()?;
        let source = self.providers.resolve(&request.source)?;
        settings.validate()?;
        if let Some(max_zoom) = source.max_zoom.filter(|&max| zoom > max) {
            warn!("Zoom {} is above the maximum zoom {} of {}, tiles may be missing", zoom, max_zoom, source.name);
        }

        let reproject = !settings.return_image && settings.crs != CoordinateSystem::WebMercator;
        if !settings.return_image {
            self.writer.check_available(settings)?;
            debug!("Writing through the {} backend", self.writer.name());
        }
        if reproject {
            ProjDataLocator::ensure_env();
            CoordinateTransformer::new(CoordinateSystem::WebMercator, settings.crs)?;
        }

        let range = TileRange::from_bbox(&bbox, zoom)?;
        self.fetch_settings.check_tile_count(range.tile_count())?;
        info!("Building mosaic of {} at zoom {} from {}: {} tiles", bbox, zoom, source.name, range.tile_count());

        let fetcher = TileFetcher::new(Arc::clone(&self.client), self.fetch_settings.clone())
            .quiet(settings.quiet);
        let fetched = fetcher.fetch_all(&source, &range.coordinates()).await?;

        let (canvas, stats) = MosaicAssembler::assemble(&range, &fetched.tiles)?;
        let image = Cropper::crop(&canvas, &range);
        let report = MosaicReport::new(range.tile_count(), fetched.attempts, &stats);
        info!("Tiles: {} requested, {} fetched, {} absent, {} blank ({} requests)",
              report.requested, report.fetched, report.absent, report.blank_skipped, report.attempts);

        if settings.return_image {
            return Ok(MosaicOutcome::Image(image));
        }

        let options = WriteOptions::from_settings(settings);
        let mut raster = GeoReferencer::georeference(image, &bbox);
        self.writer.write(&request.output, &raster, &options)?;

        if reproject {
            raster = Reprojector::new(settings.crs, settings.resampling)
                .reproject_file(&request.output, self.writer.as_ref(), &options)?;
        }
        if settings.convert_to_cog {
            raster = CogConverter::new(options).convert(&request.output, self.writer.as_ref())?;
        }

        Ok(MosaicOutcome::Written {
            path: request.output.clone(),
            width: raster.width(),
            height: raster.height(),
            bands: raster.bands(),
        })
    }
}
