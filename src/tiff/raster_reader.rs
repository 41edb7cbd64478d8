//! Pixel data decoding
//!
//! Decodes the whole image of one IFD, tiled or stripped, into an
//! interleaved 8-bit buffer. Both layouts are treated as a grid of chunks:
//! a strip is a chunk as wide as the image.

use std::io::SeekFrom;
use log::debug;

use crate::compression::{CompressionFactory, CompressionHandler};
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{planar_config, predictor, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;
use crate::tiff::validation;

/// Interleaved 8-bit pixels of one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRaster {
    pub width: u32,
    pub height: u32,
    pub samples: u16,
    pub data: Vec<u8>,
}

/// Chunk geometry of an IFD
#[derive(Debug, Clone, Copy)]
struct ChunkGrid {
    chunk_width: u32,
    chunk_height: u32,
    across: u32,
}

/// Reads pixel data for one IFD
pub struct RasterReader<'a, R: SeekableReader> {
    reader: R,
    ifd: &'a IFD,
    tiff_reader: &'a TiffReader,
}

impl<'a, R: SeekableReader> RasterReader<'a, R> {
    pub fn new(reader: R, ifd: &'a IFD, tiff_reader: &'a TiffReader) -> Self {
        RasterReader { reader, ifd, tiff_reader }
    }

    fn grid(&self, width: u32, height: u32) -> ChunkGrid {
        match self.ifd.get_tile_size() {
            Some((tile_width, tile_height)) if self.ifd.is_tiled() && tile_width > 0 && tile_height > 0 => ChunkGrid {
                chunk_width: tile_width as u32,
                chunk_height: tile_height as u32,
                across: (width + tile_width as u32 - 1) / tile_width as u32,
            },
            _ => ChunkGrid {
                chunk_width: width,
                chunk_height: self.ifd.get_tag_value(tags::ROWS_PER_STRIP)
                    .map(|rows| (rows as u32).min(height))
                    .unwrap_or(height),
                across: 1,
            },
        }
    }

    /// Decodes the full image
    pub fn read_image(&mut self) -> TiffResult<DecodedRaster> {
        let (width, height) = self.ifd.get_dimensions().ok_or(TiffError::MissingDimensions)?;
        let (width, height) = (width as u32, height as u32);
        let samples = self.ifd.get_samples_per_pixel() as u16;

        let bits = self.tiff_reader.read_tag_values(&mut self.reader, self.ifd, tags::BITS_PER_SAMPLE)
            .unwrap_or_else(|_| vec![8]);
        let planar = self.ifd.get_tag_value(tags::PLANAR_CONFIGURATION).unwrap_or(planar_config::CHUNKY as u64);
        let bits_per_sample = bits.first().copied().unwrap_or(8);
        if bits.iter().any(|&b| b != bits_per_sample) {
            return Err(TiffError::UnsupportedLayout(format!("mixed bits per sample {:?}", bits)));
        }
        validation::validate_sample_layout(bits_per_sample, planar)?;

        let compression = self.ifd.get_tag_value(tags::COMPRESSION).unwrap_or(1) as u16;
        let handler = CompressionFactory::create_handler(compression)?;
        let predictor = self.ifd.get_tag_value(tags::PREDICTOR).unwrap_or(predictor::NONE as u64) as u16;

        let (offsets_tag, counts_tag) = if self.ifd.is_tiled() {
            (tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS)
        } else {
            (tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS)
        };
        let offsets = self.tiff_reader.read_tag_values(&mut self.reader, self.ifd, offsets_tag)?;
        let byte_counts = self.tiff_reader.read_tag_values(&mut self.reader, self.ifd, counts_tag)?;
        if offsets.len() != byte_counts.len() {
            return Err(TiffError::GenericError(format!(
                "{} chunk offsets but {} byte counts", offsets.len(), byte_counts.len()
            )));
        }

        let grid = self.grid(width, height);
        debug!("Decoding {}x{} image, {} samples, {} chunks of {}x{} with {}",
               width, height, samples, offsets.len(), grid.chunk_width, grid.chunk_height, handler.name());

        let file_size = self.reader.byte_len()?;
        let mut data = vec![0u8; width as usize * height as usize * samples as usize];

        for (index, (&offset, &byte_count)) in offsets.iter().zip(&byte_counts).enumerate() {
            validation::validate_data_range(offset, byte_count, file_size)?;
            let mut chunk = self.read_chunk(offset, byte_count, handler.as_ref())?;
            if predictor == predictor::HORIZONTAL_DIFFERENCING {
                undo_horizontal_predictor(&mut chunk, grid.chunk_width as usize, samples as usize);
            }

            let chunk_x = index as u32 % grid.across;
            let chunk_y = index as u32 / grid.across;
            copy_chunk(&chunk, &mut data, &grid, (chunk_x, chunk_y), (width, height), samples as usize, index)?;
        }

        Ok(DecodedRaster { width, height, samples, data })
    }

    fn read_chunk(&mut self, offset: u64, byte_count: u64, handler: &dyn CompressionHandler) -> TiffResult<Vec<u8>> {
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut compressed = vec![0u8; byte_count as usize];
        self.reader.read_exact(&mut compressed)?;
        handler.decompress(&compressed)
    }
}

/// Reverses horizontal differencing, sample by sample within each row
fn undo_horizontal_predictor(data: &mut [u8], row_pixels: usize, samples: usize) {
    let row_len = row_pixels * samples;
    if row_len == 0 {
        return;
    }
    for row in data.chunks_mut(row_len) {
        for i in samples..row.len() {
            row[i] = row[i].wrapping_add(row[i - samples]);
        }
    }
}

fn copy_chunk(
    chunk: &[u8],
    image: &mut [u8],
    grid: &ChunkGrid,
    (chunk_x, chunk_y): (u32, u32),
    (width, height): (u32, u32),
    samples: usize,
    index: usize,
) -> TiffResult<()> {
    let start_x = chunk_x * grid.chunk_width;
    let start_y = chunk_y * grid.chunk_height;
    if start_x >= width || start_y >= height {
        return Ok(());
    }

    let columns = (width - start_x).min(grid.chunk_width) as usize;
    let rows = (height - start_y).min(grid.chunk_height) as usize;
    let chunk_row_len = grid.chunk_width as usize * samples;
    let image_row_len = width as usize * samples;
    let copy_len = columns * samples;

    for row in 0..rows {
        let src = row * chunk_row_len;
        let src_end = src + copy_len;
        if src_end > chunk.len() {
            return Err(TiffError::GenericError(format!(
                "Chunk {} holds {} bytes, row {} needs {}", index, chunk.len(), row, src_end
            )));
        }
        let dst = (start_y as usize + row) * image_row_len + start_x as usize * samples;
        image[dst..dst + copy_len].copy_from_slice(&chunk[src..src_end]);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predictor_is_per_sample() {
        let mut row = vec![10, 20, 1, 2, 1, 2];
        undo_horizontal_predictor(&mut row, 3, 2);
        assert_eq!(row, vec![10, 20, 11, 22, 12, 24]);
    }

    #[test]
    fn edge_chunk_is_clipped() {
        let grid = ChunkGrid { chunk_width: 2, chunk_height: 2, across: 2 };
        let mut image = vec![0u8; 3 * 3];
        let chunk = vec![1, 2, 3, 4];
        copy_chunk(&chunk, &mut image, &grid, (1, 1), (3, 3), 1, 3).unwrap();
        assert_eq!(image, vec![0, 0, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn short_chunk_is_an_error() {
        let grid = ChunkGrid { chunk_width: 2, chunk_height: 2, across: 1 };
        let mut image = vec![0u8; 4];
        assert!(copy_chunk(&[1, 2, 3], &mut image, &grid, (0, 0), (2, 2), 1, 0).is_err());
    }
}
