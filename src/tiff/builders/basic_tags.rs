//! Basic TIFF tag strategies
//!
//! Structural tags of an 8-bit chunky raster: dimensions, sample layout,
//! photometric interpretation and tiling.

use std::collections::BTreeMap;
use log::debug;

use crate::tiff::constants::{extra_samples, field_types, new_subfile_type, photometric, planar_config, sample_format, tags};
use crate::tiff::ifd::{IFD, IFDEntry};

/// Shape and encoding of one raster level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterLayout {
    pub width: u32,
    pub height: u32,
    /// Interleaved 8-bit samples per pixel (1 to 4)
    pub samples: u16,
    /// Edge of the square internal tiles
    pub tile_size: u32,
    /// TIFF `Compression` code of the chunk data
    pub compression: u16,
    /// Marks the level as an overview
    pub reduced_resolution: bool,
}

impl RasterLayout {
    pub fn tiles_across(&self) -> u32 {
        (self.width + self.tile_size - 1) / self.tile_size
    }

    pub fn tiles_down(&self) -> u32 {
        (self.height + self.tile_size - 1) / self.tile_size
    }

    pub fn tile_count(&self) -> usize {
        self.tiles_across() as usize * self.tiles_down() as usize
    }

    /// Bytes of one uncompressed tile
    pub fn tile_bytes(&self) -> usize {
        self.tile_size as usize * self.tile_size as usize * self.samples as usize
    }

    /// Alpha is the last sample of 2- and 4-band rasters
    pub fn has_alpha(&self) -> bool {
        self.samples == 2 || self.samples == 4
    }
}

/// Adds basic TIFF tags to an IFD
pub struct BasicTagsBuilder;

impl BasicTagsBuilder {
    /// Adds every structural tag for `layout`
    pub fn add_raster_tags(
        ifd: &mut IFD,
        external_data: &mut BTreeMap<(usize, u16), Vec<u8>>,
        ifd_index: usize,
        layout: &RasterLayout,
    ) {
        debug!("Adding raster tags to IFD #{}: {}x{}, {} samples, tile {}",
               ifd_index, layout.width, layout.height, layout.samples, layout.tile_size);

        if layout.reduced_resolution {
            ifd.add_entry(IFDEntry::new(tags::NEW_SUBFILE_TYPE, field_types::LONG, 1,
                                        new_subfile_type::REDUCED_RESOLUTION as u64));
        }

        ifd.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, field_types::LONG, 1, layout.width as u64));
        ifd.add_entry(IFDEntry::new(tags::IMAGE_LENGTH, field_types::LONG, 1, layout.height as u64));

        let bits = vec![8u16; layout.samples as usize];
        Self::add_short_array(ifd, external_data, ifd_index, tags::BITS_PER_SAMPLE, &bits);

        ifd.add_entry(IFDEntry::new(tags::COMPRESSION, field_types::SHORT, 1, layout.compression as u64));

        let interpretation = if layout.samples >= 3 { photometric::RGB } else { photometric::BLACK_IS_ZERO };
        ifd.add_entry(IFDEntry::new(tags::PHOTOMETRIC_INTERPRETATION, field_types::SHORT, 1, interpretation as u64));
        ifd.add_entry(IFDEntry::new(tags::SAMPLES_PER_PIXEL, field_types::SHORT, 1, layout.samples as u64));
        ifd.add_entry(IFDEntry::new(tags::PLANAR_CONFIGURATION, field_types::SHORT, 1, planar_config::CHUNKY as u64));

        ifd.add_entry(IFDEntry::new(tags::TILE_WIDTH, field_types::LONG, 1, layout.tile_size as u64));
        ifd.add_entry(IFDEntry::new(tags::TILE_LENGTH, field_types::LONG, 1, layout.tile_size as u64));

        if layout.has_alpha() {
            ifd.add_entry(IFDEntry::new(tags::EXTRA_SAMPLES, field_types::SHORT, 1,
                                        extra_samples::UNASSOCIATED_ALPHA as u64));
        }

        let formats = vec![sample_format::UNSIGNED; layout.samples as usize];
        Self::add_short_array(ifd, external_data, ifd_index, tags::SAMPLE_FORMAT, &formats);
    }

    /// Registers compressed tiles and their byte counts
    ///
    /// `TileOffsets` gets a placeholder entry; the writer fills in the
    /// offsets, and widens them to LONG8 for BigTIFF, once the layout is known.
    pub fn setup_tiles(
        ifd: &mut IFD,
        external_data: &mut BTreeMap<(usize, u16), Vec<u8>>,
        chunk_data: &mut BTreeMap<usize, Vec<Vec<u8>>>,
        ifd_index: usize,
        tiles: Vec<Vec<u8>>,
    ) {
        let count = tiles.len() as u64;
        let byte_counts: Vec<u32> = tiles.iter().map(|tile| tile.len() as u32).collect();
        debug!("Setting up {} tiles for IFD #{} ({} bytes)",
               count, ifd_index, byte_counts.iter().map(|&c| c as u64).sum::<u64>());

        ifd.add_entry(IFDEntry::new(tags::TILE_OFFSETS, field_types::LONG, count, 0));
        Self::add_long_array(ifd, external_data, ifd_index, tags::TILE_BYTE_COUNTS, &byte_counts);

        chunk_data.insert(ifd_index, tiles);
    }

    /// SHORT values: a single value goes in the entry, several as data
    fn add_short_array(
        ifd: &mut IFD,
        external_data: &mut BTreeMap<(usize, u16), Vec<u8>>,
        ifd_index: usize,
        tag: u16,
        values: &[u16],
    ) {
        if values.len() == 1 {
            ifd.add_entry(IFDEntry::new(tag, field_types::SHORT, 1, values[0] as u64));
            return;
        }

        let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        ifd.add_entry(IFDEntry::new(tag, field_types::SHORT, values.len() as u64, 0));
        external_data.insert((ifd_index, tag), data);
    }

    fn add_long_array(
        ifd: &mut IFD,
        external_data: &mut BTreeMap<(usize, u16), Vec<u8>>,
        ifd_index: usize,
        tag: u16,
        values: &[u32],
    ) {
        if values.len() == 1 {
            ifd.add_entry(IFDEntry::new(tag, field_types::LONG, 1, values[0] as u64));
            return;
        }

        let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        ifd.add_entry(IFDEntry::new(tag, field_types::LONG, values.len() as u64, 0));
        external_data.insert((ifd_index, tag), data);
    }
}
