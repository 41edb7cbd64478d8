//! Mosaic assembly
//!
//! Decoded tiles are pasted into a single [`Canvas`] and then cut down to
//! the requested bounding box.

mod pixel_buffer;
mod assembler;
mod cropper;

pub use pixel_buffer::{ChannelMode, PixelBuffer};
pub use assembler::{AssemblyStats, Canvas, MosaicAssembler, DEFAULT_TILE_SIZE};
pub use cropper::{CropWindow, Cropper};
