use std::io::Cursor;
use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};

/// Classic little-endian TIFF with one IFD holding width and height
pub fn create_test_tiff_buffer() -> Cursor<Vec<u8>> {
    let mut buffer = Vec::new();

    buffer.write_u16::<LittleEndian>(0x4949).unwrap(); // II
    buffer.write_u16::<LittleEndian>(42).unwrap();
    buffer.write_u32::<LittleEndian>(8).unwrap();      // IFD offset

    buffer.write_u16::<LittleEndian>(2).unwrap();      // Entry count

    buffer.write_u16::<LittleEndian>(256).unwrap();    // ImageWidth
    buffer.write_u16::<LittleEndian>(4).unwrap();      // LONG
    buffer.write_u32::<LittleEndian>(1).unwrap();
    buffer.write_u32::<LittleEndian>(800).unwrap();

    buffer.write_u16::<LittleEndian>(257).unwrap();    // ImageLength
    buffer.write_u16::<LittleEndian>(4).unwrap();
    buffer.write_u32::<LittleEndian>(1).unwrap();
    buffer.write_u32::<LittleEndian>(600).unwrap();

    buffer.write_u32::<LittleEndian>(0).unwrap();      // No next IFD

    Cursor::new(buffer)
}

/// BigTIFF little-endian file with one IFD holding width and height
pub fn create_test_bigtiff_buffer() -> Cursor<Vec<u8>> {
    let mut buffer = Vec::new();

    buffer.write_u16::<LittleEndian>(0x4949).unwrap();
    buffer.write_u16::<LittleEndian>(43).unwrap();     // BigTIFF version
    buffer.write_u16::<LittleEndian>(8).unwrap();      // Offset size
    buffer.write_u16::<LittleEndian>(0).unwrap();      // Reserved
    buffer.write_u64::<LittleEndian>(16).unwrap();     // IFD offset

    buffer.write_u64::<LittleEndian>(2).unwrap();

    buffer.write_u16::<LittleEndian>(256).unwrap();
    buffer.write_u16::<LittleEndian>(4).unwrap();
    buffer.write_u64::<LittleEndian>(1).unwrap();
    buffer.write_u64::<LittleEndian>(1024).unwrap();

    buffer.write_u16::<LittleEndian>(257).unwrap();
    buffer.write_u16::<LittleEndian>(4).unwrap();
    buffer.write_u64::<LittleEndian>(1).unwrap();
    buffer.write_u64::<LittleEndian>(768).unwrap();

    buffer.write_u64::<LittleEndian>(0).unwrap();

    Cursor::new(buffer)
}

/// Big-endian 2x2 RGB strip image, uncompressed, one strip
///
/// Pixels are (10,20,30) (40,50,60) / (70,80,90) (100,110,120); BitsPerSample
/// is stored out of line, SamplesPerPixel and the SHORT values inline.
pub fn create_big_endian_rgb_strip() -> Cursor<Vec<u8>> {
    let mut buffer = Vec::new();
    let entries: u16 = 7;
    let ifd_offset: u32 = 8;
    let ifd_len = 2 + entries as u32 * 12 + 4;
    let bits_offset = ifd_offset + ifd_len;
    let pixels_offset = bits_offset + 6;

    buffer.extend_from_slice(b"MM");
    buffer.write_u16::<BigEndian>(42).unwrap();
    buffer.write_u32::<BigEndian>(ifd_offset).unwrap();

    buffer.write_u16::<BigEndian>(entries).unwrap();
    let mut entry = |tag: u16, field_type: u16, count: u32, value: [u8; 4]| {
        buffer.write_u16::<BigEndian>(tag).unwrap();
        buffer.write_u16::<BigEndian>(field_type).unwrap();
        buffer.write_u32::<BigEndian>(count).unwrap();
        buffer.extend_from_slice(&value);
    };
    let short = |v: u16| { let mut b = [0u8; 4]; BigEndian::write_u16(&mut b, v); b };
    let long = |v: u32| { let mut b = [0u8; 4]; BigEndian::write_u32(&mut b, v); b };

    entry(256, 3, 1, short(2));                // ImageWidth
    entry(257, 3, 1, short(2));                // ImageLength
    entry(258, 3, 3, long(bits_offset));       // BitsPerSample
    entry(259, 3, 1, short(1));                // Compression none
    entry(273, 4, 1, long(pixels_offset));     // StripOffsets
    entry(277, 3, 1, short(3));                // SamplesPerPixel
    entry(279, 4, 1, long(12));                // StripByteCounts

    buffer.write_u32::<BigEndian>(0).unwrap();
    for _ in 0..3 {
        buffer.write_u16::<BigEndian>(8).unwrap();
    }
    buffer.extend_from_slice(&[10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120]);

    Cursor::new(buffer)
}
