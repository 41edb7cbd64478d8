//! Utility modules for common functionality

pub mod logger;
pub(crate) mod progress;
pub(crate) mod tag_utils;
pub(crate) mod write_utils;
