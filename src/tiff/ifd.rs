//! Image File Directory (IFD) structures and methods
//!
//! An IFD is a list of tag entries describing one image of a TIFF file.
//! Entries are kept in insertion order; a lookup index keyed by tag gives
//! direct access and guarantees at most one entry per tag.

use std::collections::BTreeMap;
use std::fmt;
use log::trace;

use crate::tiff::constants::{new_subfile_type, tags};
use crate::utils::tag_utils;

/// Represents an Image File Directory (IFD) in a TIFF file
#[derive(Debug, Clone, PartialEq)]
pub struct IFD {
    /// Entries in this IFD
    pub entries: Vec<IFDEntry>,
    /// IFD number (0-based)
    pub number: usize,
    /// Offset to this IFD in the file (0 while building)
    pub offset: u64,
    /// Position of each tag in `entries`
    tag_map: BTreeMap<u16, usize>,
}

/// Represents an entry in an Image File Directory (IFD)
///
/// For values that fit the entry, `value_offset` holds the value itself
/// (a single value decoded, several values packed little-endian); otherwise
/// it is the file offset of the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IFDEntry {
    /// TIFF tag identifier
    pub tag: u16,
    /// Field type
    pub field_type: u16,
    /// Number of values
    pub count: u64,
    /// Value or offset to values
    pub value_offset: u64,
}

impl IFDEntry {
    pub fn new(tag: u16, field_type: u16, count: u64, value_offset: u64) -> Self {
        Self {
            tag,
            field_type,
            count,
            value_offset,
        }
    }

    /// Size in bytes of one value of this entry's field type
    pub fn get_field_type_size(&self) -> usize {
        tag_utils::field_type_size(self.field_type)
    }

    /// Total size of the entry's values in bytes
    pub fn data_size(&self) -> u64 {
        self.get_field_type_size() as u64 * self.count
    }

    /// Whether the values fit in the entry's value field
    pub fn is_value_inline(&self, is_big_tiff: bool) -> bool {
        let inline_size = if is_big_tiff { 8 } else { 4 };
        let is_inline = self.data_size() <= inline_size;

        trace!("Tag {} ({}) needs {} bytes, {} inline",
               self.tag, tag_utils::get_tag_name(self.tag), self.data_size(),
               if is_inline { "stored" } else { "not stored" });

        is_inline
    }

    /// Returns a human-readable description of this entry
    pub fn description(&self) -> String {
        format!("Tag: {} ({}), Type: {} ({}), Count: {}, Value/Offset: {}",
                self.tag, tag_utils::get_tag_name(self.tag),
                self.field_type, tag_utils::get_field_type_name(self.field_type),
                self.count, describe_value(self))
    }
}

fn describe_value(entry: &IFDEntry) -> String {
    match entry.tag {
        tags::COMPRESSION => format!("{} ({})",
                                     entry.value_offset,
                                     tag_utils::get_compression_name(entry.value_offset)),
        tags::PHOTOMETRIC_INTERPRETATION => format!("{} ({})",
                                                    entry.value_offset,
                                                    tag_utils::get_photometric_name(entry.value_offset)),
        _ => entry.value_offset.to_string(),
    }
}

impl IFD {
    pub fn new(number: usize, offset: u64) -> Self {
        Self {
            entries: Vec::new(),
            number,
            offset,
            tag_map: BTreeMap::new(),
        }
    }

    /// Adds an entry, replacing any earlier entry with the same tag
    pub fn add_entry(&mut self, entry: IFDEntry) {
        trace!("Adding entry to IFD #{}: {}", self.number, entry.description());

        match self.tag_map.get(&entry.tag) {
            Some(&index) => self.entries[index] = entry,
            None => {
                self.tag_map.insert(entry.tag, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Gets the raw value/offset field of a tag
    pub fn get_tag_value(&self, tag: u16) -> Option<u64> {
        self.get_entry(tag).map(|entry| entry.value_offset)
    }

    pub fn has_tag(&self, tag: u16) -> bool {
        self.tag_map.contains_key(&tag)
    }

    pub fn get_entry(&self, tag: u16) -> Option<&IFDEntry> {
        self.tag_map.get(&tag).map(|&index| &self.entries[index])
    }

    /// Entries in ascending tag order, as they must appear on disk
    pub fn sorted_entries(&self) -> Vec<&IFDEntry> {
        self.tag_map.values().map(|&index| &self.entries[index]).collect()
    }

    /// Width and height of the image described by this IFD
    pub fn get_dimensions(&self) -> Option<(u64, u64)> {
        let width = self.get_tag_value(tags::IMAGE_WIDTH)?;
        let height = self.get_tag_value(tags::IMAGE_LENGTH)?;
        Some((width, height))
    }

    /// Number of samples per pixel, 1 when the tag is absent
    pub fn get_samples_per_pixel(&self) -> u64 {
        self.get_tag_value(tags::SAMPLES_PER_PIXEL).unwrap_or(1)
    }

    /// Tile width and length for tiled images
    pub fn get_tile_size(&self) -> Option<(u64, u64)> {
        let width = self.get_tag_value(tags::TILE_WIDTH)?;
        let length = self.get_tag_value(tags::TILE_LENGTH)?;
        Some((width, length))
    }

    pub fn is_tiled(&self) -> bool {
        self.has_tag(tags::TILE_OFFSETS)
    }

    /// True for overview levels (NewSubfileType has the reduced-resolution bit)
    pub fn is_reduced_resolution(&self) -> bool {
        self.get_tag_value(tags::NEW_SUBFILE_TYPE)
            .map(|flags| flags & new_subfile_type::REDUCED_RESOLUTION as u64 != 0)
            .unwrap_or(false)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for IFD {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IFD #{} (offset: {})", self.number, self.offset)?;
        writeln!(f, "  Number of entries: {}", self.entries.len())?;

        if let Some((width, height)) = self.get_dimensions() {
            writeln!(f, "  Dimensions: {}x{}", width, height)?;
        }
        writeln!(f, "  Samples per pixel: {}", self.get_samples_per_pixel())?;
        if self.is_reduced_resolution() {
            writeln!(f, "  Overview level")?;
        }

        writeln!(f, "  Tags:")?;
        for entry in self.sorted_entries() {
            writeln!(f, "    {} ({}): {} x{} [{}]",
                     entry.tag, tag_utils::get_tag_name(entry.tag), describe_value(entry),
                     entry.count, tag_utils::get_field_type_name(entry.field_type))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff::constants::field_types;

    #[test]
    fn later_entry_replaces_earlier_one() {
        let mut ifd = IFD::new(0, 0);
        ifd.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, field_types::LONG, 1, 10));
        ifd.add_entry(IFDEntry::new(tags::COMPRESSION, field_types::SHORT, 1, 1));
        ifd.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, field_types::LONG, 1, 20));

        assert_eq!(ifd.entry_count(), 2);
        assert_eq!(ifd.get_tag_value(tags::IMAGE_WIDTH), Some(20));
    }

    #[test]
    fn sorted_entries_follow_tag_order() {
        let mut ifd = IFD::new(0, 0);
        ifd.add_entry(IFDEntry::new(tags::TILE_OFFSETS, field_types::LONG, 4, 0));
        ifd.add_entry(IFDEntry::new(tags::IMAGE_LENGTH, field_types::LONG, 1, 5));
        ifd.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, field_types::LONG, 1, 7));

        let order: Vec<u16> = ifd.sorted_entries().iter().map(|e| e.tag).collect();
        assert_eq!(order, vec![tags::IMAGE_WIDTH, tags::IMAGE_LENGTH, tags::TILE_OFFSETS]);
        assert_eq!(ifd.get_dimensions(), Some((7, 5)));
    }

    #[test]
    fn inline_depends_on_format() {
        let doubles = IFDEntry::new(tags::MODEL_PIXEL_SCALE_TAG, field_types::DOUBLE, 1, 0);
        assert!(!doubles.is_value_inline(false));
        assert!(doubles.is_value_inline(true));

        let shorts = IFDEntry::new(tags::BITS_PER_SAMPLE, field_types::SHORT, 3, 0);
        assert!(!shorts.is_value_inline(false));
        assert!(shorts.is_value_inline(true));
    }

    #[test]
    fn overview_flag() {
        let mut ifd = IFD::new(1, 0);
        assert!(!ifd.is_reduced_resolution());
        ifd.add_entry(IFDEntry::new(tags::NEW_SUBFILE_TYPE, field_types::LONG, 1, 1));
        assert!(ifd.is_reduced_resolution());
    }
}
