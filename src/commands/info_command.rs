//! GeoTIFF structure summary command
//!
//! Prints the IFDs of a TIFF file with their layout, compression and
//! georeferencing.

use std::path::PathBuf;
use clap::ArgMatches;
use log::{debug, info};

use crate::commands::command_traits::Command;
use crate::compression::CompressionFactory;
use crate::errors::{MosaicError, MosaicResult};
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::tags;
use crate::tiff::{GeoKeyParser, TiffReader, IFD, TIFF};
use crate::utils::tag_utils::{get_compression_name, get_photometric_name};

/// Command for summarising a GeoTIFF file
pub struct InfoCommand {
    /// Path to the input file
    input_file: PathBuf,
    verbose: bool,
}

impl InfoCommand {
    pub fn new(args: &ArgMatches) -> MosaicResult<Self> {
        let input_file = args.get_one::<String>("path")
            .ok_or_else(|| MosaicError::config("Missing input file"))?;

        Ok(InfoCommand {
            input_file: PathBuf::from(input_file),
            verbose: args.get_flag("verbose"),
        })
    }

    fn display_tiff_summary(&self, tiff: &TIFF) {
        info!("File: {}", self.input_file.display());
        info!("  {}", tiff);
        info!("  Overviews: {}", tiff.overviews().len());
    }

    fn display_ifd_summary(&self, ifd: &IFD) {
        info!("IFD #{} (offset: {})", ifd.number, ifd.offset);
        match ifd.get_dimensions() {
            Some((width, height)) => info!("  Dimensions: {}x{}", width, height),
            None => info!("  Dimensions: Not available"),
        }
        info!("  Samples per pixel: {}", ifd.get_samples_per_pixel());

        if let Some(photometric) = ifd.get_tag_value(tags::PHOTOMETRIC_INTERPRETATION) {
            info!("  Photometric: {}", get_photometric_name(photometric));
        }
        match ifd.get_tile_size() {
            Some((w, h)) if ifd.is_tiled() => info!("  Layout: tiled {}x{}", w, h),
            _ => info!("  Layout: strips"),
        }
        if ifd.is_reduced_resolution() {
            info!("  Reduced resolution (overview)");
        }
    }

    fn display_compression_info(&self, ifd: &IFD) {
        let code = ifd.get_tag_value(tags::COMPRESSION).unwrap_or(1);
        let supported = u16::try_from(code).ok()
            .map(|code| CompressionFactory::create_handler(code).is_ok())
            .unwrap_or(false);
        info!("  Compression: {} ({}){}", code, get_compression_name(code),
              if supported { "" } else { ", not decodable by this build" });
    }

    fn display_geotiff_details(&self, tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD) -> MosaicResult<()> {
        let geo = GeoKeyParser::extract_geo_info(tiff_reader, reader, ifd)?;
        if !geo.is_georeferenced() && geo.epsg_code == 0 {
            info!("  Not georeferenced");
            return Ok(());
        }

        info!("  CRS: {}", GeoKeyParser::format_projection_string(&geo));
        if let Some(scale) = geo.pixel_scale {
            info!("  Pixel size: X={:.6} Y={:.6}", scale[0], scale[1]);
        }
        if let Some(tie) = geo.tiepoint {
            info!("  Tiepoint: Raster({:.1},{:.1}) -> Model({:.6},{:.6})", tie[0], tie[1], tie[3], tie[4]);
        }
        if let Some((width, height)) = ifd.get_dimensions() {
            if let Some((min_x, min_y, max_x, max_y)) = geo.get_bounds(width as u32, height as u32) {
                info!("  Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})", min_x, min_y, max_x, max_y);
            }
        }

        for (key, value) in GeoKeyParser::format_geo_keys(tiff_reader, reader, ifd)? {
            info!("    Key {} ({}): {}", key.key_id, key.name(), value);
        }
        Ok(())
    }

    fn display_tag_summary(&self, ifd: &IFD) {
        for entry in ifd.sorted_entries() {
            debug!("    {}", entry.description());
        }
    }
}

impl Command for InfoCommand {
    fn execute(&self) -> MosaicResult<()> {
        let mut tiff_reader = TiffReader::new();
        let tiff = tiff_reader.load(&self.input_file)?;
        let mut reader = tiff_reader.create_reader()?;

        self.display_tiff_summary(&tiff);

        for ifd in &tiff.ifds {
            self.display_ifd_summary(ifd);
            self.display_compression_info(ifd);
            // Georeferencing lives on the main image
            if !ifd.is_reduced_resolution() {
                self.display_geotiff_details(&tiff_reader, &mut reader, ifd)?;
            }
            if self.verbose {
                self.display_tag_summary(ifd);
            }
        }

        Ok(())
    }
}
