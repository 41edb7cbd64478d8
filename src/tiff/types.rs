//! Parsed TIFF file

use std::fmt;
use crate::tiff::ifd::IFD;

/// IFD chain of one file
#[derive(Debug, Clone)]
pub struct TIFF {
    /// IFDs in chain order
    pub ifds: Vec<IFD>,
    pub is_big_tiff: bool,
}

impl TIFF {
    pub fn new(is_big_tiff: bool) -> Self {
        TIFF { ifds: Vec::new(), is_big_tiff }
    }

    /// The image at full resolution
    ///
    /// Overviews (`NewSubfileType` bit 0) may precede it in the chain, so
    /// this is not always the first IFD.
    pub fn full_resolution_ifd(&self) -> Option<&IFD> {
        self.ifds.iter().find(|ifd| !ifd.is_reduced_resolution())
    }

    pub fn ifd_count(&self) -> usize {
        self.ifds.len()
    }

    pub fn overviews(&self) -> Vec<&IFD> {
        self.ifds.iter().filter(|ifd| ifd.is_reduced_resolution()).collect()
    }

    /// Dimensions of every level, full resolution first, overviews by size
    pub fn pyramid(&self) -> Vec<(u64, u64)> {
        let mut levels: Vec<(u64, u64)> = self.ifds.iter().filter_map(IFD::get_dimensions).collect();
        levels.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
        levels
    }
}

impl fmt::Display for TIFF {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let levels = self.pyramid()
            .iter()
            .map(|(w, h)| format!("{}x{}", w, h))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} with {} IFDs [{}]", if self.is_big_tiff { "BigTIFF" } else { "TIFF" }, self.ifds.len(), levels)
    }
}
