//! Mosaic building command

use std::path::{Path, PathBuf};
use clap::ArgMatches;
use image::DynamicImage;
use log::{debug, info, warn};

use crate::api::{MosaicOutcome, TileMosaic};
use crate::commands::command_traits::Command;
use crate::config::{ConfigFile, MosaicRequest, ZoomSpec};
use crate::coordinate::{BoundingBox, CoordinateSystem, CoordinateSystemFactory, ProjDataLocator};
use crate::errors::{MosaicError, MosaicResult};

/// Command for fetching tiles and writing the mosaic
pub struct MosaicCommand {
    config: ConfigFile,
    request: MosaicRequest,
    /// Save a plain image instead of a GeoTIFF
    image_only: bool,
}

impl MosaicCommand {
    pub fn new(args: &ArgMatches) -> MosaicResult<Self> {
        let output = args.get_one::<String>("path")
            .ok_or_else(|| MosaicError::config("Missing output file"))?;
        let bbox_str = args.get_one::<String>("bbox")
            .ok_or_else(|| MosaicError::config("Missing --bbox west,south,east,north"))?;
        let source = args.get_one::<String>("source")
            .ok_or_else(|| MosaicError::config("Missing --source"))?;

        let bbox = BoundingBox::from_string(bbox_str)?;
        let zoom = ZoomSpec::from_options(
            args.get_one::<u8>("zoom").copied(),
            args.get_one::<f64>("resolution").copied(),
        )?;

        let mut config = match args.get_one::<String>("config") {
            Some(path) => ConfigFile::load(Path::new(path))?,
            None => ConfigFile::default(),
        };

        // Flags override the [output] table
        let settings = &mut config.output;
        if let Some(crs) = args.get_one::<String>("crs") {
            settings.crs = CoordinateSystemFactory::from_string(crs)?;
        }
        if let Some(compression) = args.get_one::<String>("compression") {
            settings.compression = compression.parse().map_err(MosaicError::Configuration)?;
        }
        if let Some(resampling) = args.get_one::<String>("resampling") {
            settings.resampling = resampling.parse()?;
        }
        settings.convert_to_cog |= args.get_flag("cog");
        settings.overwrite |= args.get_flag("overwrite");
        settings.quiet = args.get_flag("quiet");

        let image_only = args.get_flag("image-only");
        let request = MosaicRequest::new(
            output.as_str(),
            &[bbox.west, bbox.south, bbox.east, bbox.north],
            zoom,
            source,
        )
        .with_settings(config.output.clone())
        .return_image(image_only);

        debug!("Mosaic request: {:?}", request);
        Ok(MosaicCommand { config, request, image_only })
    }

    fn save_image(&self, image: DynamicImage) -> MosaicResult<()> {
        let path = &self.request.output;
        let is_jpeg = path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| matches!(ext.to_lowercase().as_str(), "jpg" | "jpeg"))
            .unwrap_or(false);

        // JPEG has no alpha channel
        let image = if is_jpeg { DynamicImage::ImageRgb8(image.to_rgb8()) } else { image };
        image.save(path)?;
        info!("Saved {}x{} image to {}", image.width(), image.height(), path.display());
        Ok(())
    }
}

impl Command for MosaicCommand {
    fn execute(&self) -> MosaicResult<()> {
        let output: &PathBuf = &self.request.output;
        if self.image_only && output.exists() && !self.request.output_settings.overwrite {
            warn!("{} already exists, skipping (use --overwrite to replace it)", output.display());
            return Ok(());
        }

        if self.request.output_settings.crs != CoordinateSystem::WebMercator {
            ProjDataLocator::ensure_env();
        }

        let mosaic = TileMosaic::from_config(self.config.clone())?;
        let runtime = tokio::runtime::Runtime::new()?;
        let outcome = runtime.block_on(mosaic.build_mosaic_geotiff(&self.request))?;

        match outcome {
            MosaicOutcome::Written { path, width, height, bands } => {
                info!("Wrote {}x{} GeoTIFF with {} bands to {}", width, height, bands, path.display());
            }
            MosaicOutcome::Image(image) => self.save_image(image.into_dynamic_image()?)?,
            MosaicOutcome::AlreadyExists(path) => {
                info!("{} already exists, nothing to do", path.display());
            }
        }

        Ok(())
    }
}
