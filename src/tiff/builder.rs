//! TIFF file construction
//!
//! [`TiffBuilder`] collects IFDs, their out-of-line tag data and their
//! compressed tiles, then hands everything to the writer in one go.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use log::{debug, info};
use tempfile::NamedTempFile;

use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::constants::{field_types, tags};
use crate::tiff::builders::basic_tags::{BasicTagsBuilder, RasterLayout};
use crate::tiff::builders::geo_tags::{GeoTagsBuilder, GeoTiffTags};
use crate::tiff::builders::writer::{TiffFormat, WriterBuilder};

/// Builder for creating TIFF files
#[derive(Debug, Default)]
pub struct TiffBuilder {
    format: TiffFormat,
    pub ifds: Vec<IFD>,
    external_data: BTreeMap<(usize, u16), Vec<u8>>,
    chunk_data: BTreeMap<usize, Vec<Vec<u8>>>,
}

impl TiffBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(format: TiffFormat) -> Self {
        TiffBuilder {
            format,
            ..Self::default()
        }
    }

    /// Add an IFD and return its index
    pub fn add_ifd(&mut self, ifd: IFD) -> usize {
        let ifd_index = self.ifds.len();
        debug!("Adding IFD #{} to TiffBuilder", ifd_index);
        self.ifds.push(ifd);
        ifd_index
    }

    fn ifd_mut(ifds: &mut [IFD], ifd_index: usize) -> TiffResult<&mut IFD> {
        let count = ifds.len();
        ifds.get_mut(ifd_index).ok_or_else(|| TiffError::GenericError(format!(
            "Invalid IFD index {}, only have {} IFDs", ifd_index, count
        )))
    }

    /// Set out-of-line data for a tag
    pub fn set_external_data(&mut self, ifd_index: usize, tag: u16, data: Vec<u8>) -> TiffResult<()> {
        Self::ifd_mut(&mut self.ifds, ifd_index)?;
        self.external_data.insert((ifd_index, tag), data);
        Ok(())
    }

    /// Structural tags of one raster level
    pub fn add_raster_tags(&mut self, ifd_index: usize, layout: &RasterLayout) -> TiffResult<()> {
        let ifd = Self::ifd_mut(&mut self.ifds, ifd_index)?;
        BasicTagsBuilder::add_raster_tags(ifd, &mut self.external_data, ifd_index, layout);
        Ok(())
    }

    /// Compressed tiles of one raster level, in row-major tile order
    pub fn set_tiles(&mut self, ifd_index: usize, tiles: Vec<Vec<u8>>) -> TiffResult<()> {
        let ifd = Self::ifd_mut(&mut self.ifds, ifd_index)?;
        BasicTagsBuilder::setup_tiles(ifd, &mut self.external_data, &mut self.chunk_data, ifd_index, tiles);
        Ok(())
    }

    /// GeoTIFF georeferencing tags
    pub fn add_geo_tags(&mut self, ifd_index: usize, geo: &GeoTiffTags) -> TiffResult<()> {
        let ifd = Self::ifd_mut(&mut self.ifds, ifd_index)?;
        GeoTagsBuilder::add_georeference(ifd, &mut self.external_data, ifd_index, geo)
    }

    /// ASCII tag such as `Software`
    pub fn add_ascii(&mut self, ifd_index: usize, tag: u16, text: &str) -> TiffResult<()> {
        let mut data = text.as_bytes().to_vec();
        data.push(0);
        Self::ifd_mut(&mut self.ifds, ifd_index)?
            .add_entry(IFDEntry::new(tag, field_types::ASCII, data.len() as u64, 0));
        self.external_data.insert((ifd_index, tag), data);
        Ok(())
    }

    /// Name this crate in the `Software` tag of the first IFD
    pub fn add_software_tag(&mut self) -> TiffResult<()> {
        let software = format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        self.add_ascii(0, tags::SOFTWARE, &software)
    }

    /// Write to any sink, returning the number of bytes written
    pub fn write_to<W: Write>(&self, writer: &mut W) -> TiffResult<u64> {
        WriterBuilder::write(writer, &self.ifds, &self.external_data, &self.chunk_data, self.format)
    }

    /// Serialize into memory
    pub fn to_bytes(&self) -> TiffResult<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Write the file atomically
    ///
    /// Data goes to a temporary file next to `path` that replaces `path`
    /// only once it is complete.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> TiffResult<u64> {
        let path = path.as_ref();
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        };
        fs::create_dir_all(&directory)?;

        let temp = NamedTempFile::new_in(&directory)?;
        let size = {
            let mut writer = BufWriter::new(temp.as_file());
            let size = self.write_to(&mut writer)?;
            writer.flush()?;
            size
        };
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| TiffError::IoError(e.error))?;

        info!("Wrote {} ({} bytes)", path.display(), size);
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_ifd() {
        let mut builder = TiffBuilder::new();
        assert!(builder.set_external_data(0, tags::SOFTWARE, vec![0]).is_err());
        assert!(builder.set_tiles(3, vec![]).is_err());
    }

    #[test]
    fn writes_atomically_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.tif");

        let mut builder = TiffBuilder::new();
        let index = builder.add_ifd(IFD::new(0, 0));
        builder.add_software_tag().unwrap();
        builder.set_tiles(index, vec![vec![1, 2, 3]]).unwrap();
        let size = builder.write(&path).unwrap();

        let written = fs::read(&path).unwrap();
        assert_eq!(written.len() as u64, size);
        assert_eq!(written, builder.to_bytes().unwrap());
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }
}
