//! TIFF file writing
//!
//! Files are laid out in a fixed order: header, every IFD, tag data blocks
//! (ordered by IFD index then tag), then tile data with the last IFD's
//! tiles first so overviews precede the full-resolution image. Nothing in
//! the layout depends on hash ordering, so equal inputs give equal bytes.

use std::collections::BTreeMap;
use std::io::Write;
use byteorder::{LittleEndian, WriteBytesExt};
use log::{debug, info};

use crate::tiff::constants::{field_types, header, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::utils::write_utils;

/// Classic TIFF or BigTIFF selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TiffFormat {
    /// Classic unless offsets overflow 32 bits
    #[default]
    Auto,
    Classic,
    BigTiff,
}

/// File positions of everything the writer emits
#[derive(Debug)]
struct Layout {
    big_tiff: bool,
    ifd_offsets: Vec<u64>,
    block_offsets: BTreeMap<(usize, u16), u64>,
    chunk_offsets: BTreeMap<usize, Vec<u64>>,
    total_size: u64,
}

/// Writes a TIFF file
pub struct WriterBuilder;

impl WriterBuilder {
    /// Writes the file and returns its size in bytes
    pub fn write<W: Write>(
        writer: &mut W,
        ifds: &[IFD],
        external_data: &BTreeMap<(usize, u16), Vec<u8>>,
        chunk_data: &BTreeMap<usize, Vec<Vec<u8>>>,
        format: TiffFormat,
    ) -> TiffResult<u64> {
        if ifds.is_empty() {
            return Err(TiffError::GenericError("No IFDs to write".to_string()));
        }

        let layout = Self::choose_layout(ifds, external_data, chunk_data, format)?;
        info!("Writing {} IFDs, {} bytes ({})", ifds.len(), layout.total_size,
              if layout.big_tiff { "BigTIFF" } else { "classic TIFF" });

        let blocks = Self::resolve_blocks(external_data, chunk_data, &layout);

        let mut position = Self::write_header(writer, &layout)?;
        for (index, ifd) in ifds.iter().enumerate() {
            position = Self::write_ifd(writer, ifd, index, &blocks, &layout, position)?;
        }

        for (key, data) in &blocks {
            if let Some(&offset) = layout.block_offsets.get(key) {
                position = write_utils::pad_to(writer, position, offset)?;
                writer.write_all(data)?;
                position += data.len() as u64;
            }
        }

        for (index, chunks) in chunk_data.iter().rev() {
            let offsets = &layout.chunk_offsets[index];
            for (chunk, &offset) in chunks.iter().zip(offsets) {
                position = write_utils::pad_to(writer, position, offset)?;
                writer.write_all(chunk)?;
                position += chunk.len() as u64;
            }
        }

        debug!("Wrote {} bytes", position);
        Ok(position)
    }

    fn choose_layout(
        ifds: &[IFD],
        external_data: &BTreeMap<(usize, u16), Vec<u8>>,
        chunk_data: &BTreeMap<usize, Vec<Vec<u8>>>,
        format: TiffFormat,
    ) -> TiffResult<Layout> {
        match format {
            TiffFormat::BigTiff => Ok(Self::plan(ifds, external_data, chunk_data, true)),
            TiffFormat::Classic | TiffFormat::Auto => {
                let classic = Self::plan(ifds, external_data, chunk_data, false);
                if classic.total_size <= u32::MAX as u64 {
                    Ok(classic)
                } else if format == TiffFormat::Auto {
                    info!("{} bytes exceed the classic TIFF limit, switching to BigTIFF", classic.total_size);
                    Ok(Self::plan(ifds, external_data, chunk_data, true))
                } else {
                    Err(TiffError::FileTooLarge(classic.total_size))
                }
            }
        }
    }

    fn plan(
        ifds: &[IFD],
        external_data: &BTreeMap<(usize, u16), Vec<u8>>,
        chunk_data: &BTreeMap<usize, Vec<Vec<u8>>>,
        big_tiff: bool,
    ) -> Layout {
        let inline_size = inline_size(big_tiff);
        let mut position = if big_tiff { header::BIG_HEADER_SIZE } else { header::CLASSIC_HEADER_SIZE };

        let mut ifd_offsets = Vec::with_capacity(ifds.len());
        for ifd in ifds {
            ifd_offsets.push(position);
            position += ifd_size(ifd.entry_count(), big_tiff);
        }

        let mut block_sizes: BTreeMap<(usize, u16), u64> = external_data.iter()
            .map(|(key, data)| (*key, data.len() as u64))
            .collect();
        for (index, chunks) in chunk_data {
            block_sizes.insert((*index, tags::TILE_OFFSETS), chunks.len() as u64 * offset_size(big_tiff));
        }

        let mut block_offsets = BTreeMap::new();
        for (key, size) in block_sizes {
            if size > inline_size {
                position = write_utils::align_to_4_bytes(position);
                block_offsets.insert(key, position);
                position += size;
            }
        }

        let mut chunk_offsets = BTreeMap::new();
        for (index, chunks) in chunk_data.iter().rev() {
            let mut offsets = Vec::with_capacity(chunks.len());
            for chunk in chunks {
                position = write_utils::align_to_4_bytes(position);
                offsets.push(position);
                position += chunk.len() as u64;
            }
            chunk_offsets.insert(*index, offsets);
        }

        Layout {
            big_tiff,
            ifd_offsets,
            block_offsets,
            chunk_offsets,
            total_size: position,
        }
    }

    /// External data plus the generated tile offset arrays
    fn resolve_blocks(
        external_data: &BTreeMap<(usize, u16), Vec<u8>>,
        chunk_data: &BTreeMap<usize, Vec<Vec<u8>>>,
        layout: &Layout,
    ) -> BTreeMap<(usize, u16), Vec<u8>> {
        let mut blocks = external_data.clone();
        for index in chunk_data.keys() {
            let offsets = &layout.chunk_offsets[index];
            let data: Vec<u8> = if layout.big_tiff {
                offsets.iter().flat_map(|o| o.to_le_bytes()).collect()
            } else {
                offsets.iter().flat_map(|&o| (o as u32).to_le_bytes()).collect()
            };
            blocks.insert((*index, tags::TILE_OFFSETS), data);
        }
        blocks
    }

    fn write_header<W: Write>(writer: &mut W, layout: &Layout) -> TiffResult<u64> {
        writer.write_all(&header::LITTLE_ENDIAN_MARKER)?;
        if layout.big_tiff {
            writer.write_u16::<LittleEndian>(header::BIG_TIFF_VERSION)?;
            writer.write_u16::<LittleEndian>(header::BIGTIFF_OFFSET_SIZE)?;
            writer.write_u16::<LittleEndian>(0)?;
            writer.write_u64::<LittleEndian>(layout.ifd_offsets[0])?;
            Ok(header::BIG_HEADER_SIZE)
        } else {
            writer.write_u16::<LittleEndian>(header::TIFF_VERSION)?;
            writer.write_u32::<LittleEndian>(layout.ifd_offsets[0] as u32)?;
            Ok(header::CLASSIC_HEADER_SIZE)
        }
    }

    fn write_ifd<W: Write>(
        writer: &mut W,
        ifd: &IFD,
        index: usize,
        blocks: &BTreeMap<(usize, u16), Vec<u8>>,
        layout: &Layout,
        position: u64,
    ) -> TiffResult<u64> {
        let entries = ifd.sorted_entries();
        if layout.big_tiff {
            writer.write_u64::<LittleEndian>(entries.len() as u64)?;
        } else {
            writer.write_u16::<LittleEndian>(entries.len() as u16)?;
        }

        for entry in entries {
            let field_type = if entry.tag == tags::TILE_OFFSETS && layout.big_tiff {
                field_types::LONG8
            } else {
                entry.field_type
            };

            let value = match blocks.get(&(index, entry.tag)) {
                Some(data) => match layout.block_offsets.get(&(index, entry.tag)) {
                    Some(&offset) => encode_scalar(field_types::LONG8, offset),
                    None => pack_inline(data),
                },
                None => encode_scalar(entry.field_type, entry.value_offset),
            };

            Self::write_entry(writer, entry, field_type, &value, layout.big_tiff)?;
        }

        let next = layout.ifd_offsets.get(index + 1).copied().unwrap_or(0);
        if layout.big_tiff {
            writer.write_u64::<LittleEndian>(next)?;
        } else {
            writer.write_u32::<LittleEndian>(next as u32)?;
        }

        Ok(position + ifd_size(ifd.entry_count(), layout.big_tiff))
    }

    fn write_entry<W: Write>(
        writer: &mut W,
        entry: &IFDEntry,
        field_type: u16,
        value: &[u8; 8],
        big_tiff: bool,
    ) -> TiffResult<()> {
        writer.write_u16::<LittleEndian>(entry.tag)?;
        writer.write_u16::<LittleEndian>(field_type)?;
        if big_tiff {
            writer.write_u64::<LittleEndian>(entry.count)?;
            writer.write_all(value)?;
        } else {
            writer.write_u32::<LittleEndian>(entry.count as u32)?;
            writer.write_all(&value[..4])?;
        }
        Ok(())
    }
}

fn inline_size(big_tiff: bool) -> u64 {
    if big_tiff { 8 } else { 4 }
}

fn offset_size(big_tiff: bool) -> u64 {
    if big_tiff { 8 } else { 4 }
}

fn ifd_size(entry_count: usize, big_tiff: bool) -> u64 {
    if big_tiff {
        8 + 20 * entry_count as u64 + 8
    } else {
        2 + 12 * entry_count as u64 + 4
    }
}

/// One value of `field_type`, little-endian, left-justified in the field
fn encode_scalar(field_type: u16, value: u64) -> [u8; 8] {
    let mut field = [0u8; 8];
    match crate::utils::tag_utils::field_type_size(field_type) {
        1 => field[0] = value as u8,
        2 => field[..2].copy_from_slice(&(value as u16).to_le_bytes()),
        4 => field[..4].copy_from_slice(&(value as u32).to_le_bytes()),
        _ => field = value.to_le_bytes(),
    }
    field
}

fn pack_inline(data: &[u8]) -> [u8; 8] {
    let mut field = [0u8; 8];
    field[..data.len()].copy_from_slice(data);
    field
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_tile_ifd() -> (Vec<IFD>, BTreeMap<(usize, u16), Vec<u8>>, BTreeMap<usize, Vec<Vec<u8>>>) {
        let mut ifd = IFD::new(0, 0);
        ifd.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, field_types::LONG, 1, 2));
        ifd.add_entry(IFDEntry::new(tags::TILE_OFFSETS, field_types::LONG, 1, 0));
        let mut external = BTreeMap::new();
        external.insert((0, tags::MODEL_PIXEL_SCALE_TAG), vec![7u8; 24]);
        ifd.add_entry(IFDEntry::new(tags::MODEL_PIXEL_SCALE_TAG, field_types::DOUBLE, 3, 0));
        let mut chunks = BTreeMap::new();
        chunks.insert(0, vec![vec![9u8; 3]]);
        (vec![ifd], external, chunks)
    }

    #[test]
    fn classic_layout() {
        let (ifds, external, chunks) = single_tile_ifd();
        let mut out = Vec::new();
        let size = WriterBuilder::write(&mut out, &ifds, &external, &chunks, TiffFormat::Auto).unwrap();

        assert_eq!(size as usize, out.len());
        assert_eq!(&out[..4], &[0x49, 0x49, 42, 0]);
        assert_eq!(&out[4..8], &8u32.to_le_bytes());
        // 3 entries: IFD ends at 8 + 2 + 36 + 4 = 50, data aligned to 52
        assert_eq!(&out[52..76], &[7u8; 24][..]);
        assert_eq!(&out[76..79], &[9, 9, 9]);
    }

    #[test]
    fn single_offset_is_inline() {
        let (ifds, external, chunks) = single_tile_ifd();
        let mut out = Vec::new();
        WriterBuilder::write(&mut out, &ifds, &external, &chunks, TiffFormat::Classic).unwrap();

        // Entries sorted: ImageWidth(256), TileOffsets(324), ModelPixelScale(33550)
        let tile_entry = 10 + 12;
        assert_eq!(&out[tile_entry..tile_entry + 2], &324u16.to_le_bytes());
        assert_eq!(&out[tile_entry + 8..tile_entry + 12], &76u32.to_le_bytes());
    }

    #[test]
    fn bigtiff_header() {
        let (ifds, external, chunks) = single_tile_ifd();
        let mut out = Vec::new();
        WriterBuilder::write(&mut out, &ifds, &external, &chunks, TiffFormat::BigTiff).unwrap();

        assert_eq!(&out[..8], &[0x49, 0x49, 43, 0, 8, 0, 0, 0]);
        assert_eq!(&out[8..16], &16u64.to_le_bytes());
    }

    #[test]
    fn output_is_deterministic() {
        let (ifds, external, chunks) = single_tile_ifd();
        let mut first = Vec::new();
        let mut second = Vec::new();
        WriterBuilder::write(&mut first, &ifds, &external, &chunks, TiffFormat::Auto).unwrap();
        WriterBuilder::write(&mut second, &ifds, &external, &chunks, TiffFormat::Auto).unwrap();
        assert_eq!(first, second);
    }
}
