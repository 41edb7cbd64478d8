//! Tests for byte order detection and the endian handlers

use std::io::Cursor;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use crate::io::byte_order::{BigEndianHandler, ByteOrder, ByteOrderHandler, LittleEndianHandler};

#[test]
fn detects_header_markers() {
    let cases: [(&[u8], Option<ByteOrder>); 4] = [
        (b"II*\0", Some(ByteOrder::LittleEndian)),
        (b"MM\0*", Some(ByteOrder::BigEndian)),
        (b"IM*\0", None),
        (&[0x34, 0x12], None),
    ];

    for (header, expected) in cases {
        let detected = ByteOrder::detect(&mut Cursor::new(header.to_vec())).ok();
        assert_eq!(detected, expected, "header {:?}", header);
    }
}

#[test]
fn handler_matches_detected_order() {
    assert_eq!(ByteOrder::BigEndian.create_handler().byte_order(), ByteOrder::BigEndian);
    assert_eq!(ByteOrder::LittleEndian.create_handler().byte_order(), ByteOrder::LittleEndian);
}

#[test]
fn little_endian_values() {
    let mut buffer = Vec::new();
    buffer.write_u16::<LittleEndian>(43).unwrap();
    buffer.write_u64::<LittleEndian>(0x1_0000_0010).unwrap();
    buffer.write_f64::<LittleEndian>(-9255613.25).unwrap();
    let mut cursor = Cursor::new(buffer);

    let handler = LittleEndianHandler::new();
    assert_eq!(handler.read_u16(&mut cursor).unwrap(), 43);
    assert_eq!(handler.read_u64(&mut cursor).unwrap(), 0x1_0000_0010);
    assert_eq!(handler.read_f64(&mut cursor).unwrap(), -9255613.25);
}

#[test]
fn big_endian_values() {
    let mut buffer = Vec::new();
    buffer.write_u32::<BigEndian>(3857).unwrap();
    buffer.write_f32::<BigEndian>(0.5).unwrap();
    buffer.write_u32::<BigEndian>(72).unwrap();
    buffer.write_u32::<BigEndian>(1).unwrap();
    let mut cursor = Cursor::new(buffer);

    let handler = BigEndianHandler::new();
    assert_eq!(handler.read_u32(&mut cursor).unwrap(), 3857);
    assert_eq!(handler.read_f32(&mut cursor).unwrap(), 0.5);
    assert_eq!(handler.read_rational(&mut cursor).unwrap(), (72, 1));
}

#[test]
fn truncated_input_is_an_error() {
    let mut cursor = Cursor::new(vec![0x01]);
    assert!(LittleEndianHandler::new().read_u32(&mut cursor).is_err());
}
