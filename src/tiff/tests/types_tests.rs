//! Tests for the parsed IFD chain

use crate::tiff::types::TIFF;
use crate::tiff::ifd::{IFD, IFDEntry};

fn level(number: usize, width: u64, height: u64, overview: bool) -> IFD {
    let mut ifd = IFD::new(number, 16 + number as u64 * 100);
    if overview {
        ifd.add_entry(IFDEntry::new(254, 4, 1, 1));
    }
    ifd.add_entry(IFDEntry::new(256, 4, 1, width));
    ifd.add_entry(IFDEntry::new(257, 4, 1, height));
    ifd
}

#[test]
fn empty_chain() {
    let tiff = TIFF::new(false);
    assert_eq!(tiff.ifd_count(), 0);
    assert!(tiff.full_resolution_ifd().is_none());
    assert!(tiff.pyramid().is_empty());
}

#[test]
fn full_resolution_after_overviews() {
    let mut tiff = TIFF::new(true);
    tiff.ifds.push(level(0, 256, 192, true));
    tiff.ifds.push(level(1, 512, 384, true));
    tiff.ifds.push(level(2, 1024, 768, false));

    assert_eq!(tiff.overviews().len(), 2);
    assert_eq!(tiff.full_resolution_ifd().map(|ifd| ifd.number), Some(2));
    assert_eq!(tiff.pyramid(), vec![(1024, 768), (512, 384), (256, 192)]);
    assert_eq!(tiff.to_string(), "BigTIFF with 3 IFDs [1024x768, 512x384, 256x192]");
}
