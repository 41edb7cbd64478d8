//! Low-level reading shared by the TIFF layer

pub mod seekable;
pub mod byte_order;
