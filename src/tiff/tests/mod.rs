//! Unit tests for the TIFF layer

mod test_utils;
mod byte_order_tests;
mod types_tests;
mod roundtrip_tests;
