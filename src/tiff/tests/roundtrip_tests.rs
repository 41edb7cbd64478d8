//! Files written by the builder, read back by the reader

use std::io::Cursor;

use crate::compression::{CompressionFactory, CompressionKind};
use crate::tiff::builder::TiffBuilder;
use crate::tiff::builders::{GeoTiffTags, RasterLayout, TiffFormat};
use crate::tiff::constants::{field_types, tags};
use crate::tiff::geo_key_parser::GeoKeyParser;
use crate::tiff::ifd::IFD;
use crate::tiff::raster_reader::RasterReader;
use crate::tiff::reader::TiffReader;

const WIDTH: u32 = 20;
const HEIGHT: u32 = 18;
const SAMPLES: u16 = 4;
const TILE: u32 = 16;

fn pixels() -> Vec<u8> {
    (0..WIDTH * HEIGHT * SAMPLES as u32).map(|i| (i % 251) as u8).collect()
}

fn split_tiles(data: &[u8], layout: &RasterLayout) -> Vec<Vec<u8>> {
    let samples = layout.samples as usize;
    let mut tiles = Vec::new();
    for tile_y in 0..layout.tiles_down() {
        for tile_x in 0..layout.tiles_across() {
            let mut tile = vec![0u8; layout.tile_bytes()];
            for row in 0..layout.tile_size {
                let y = tile_y * layout.tile_size + row;
                if y >= layout.height {
                    break;
                }
                let x0 = tile_x * layout.tile_size;
                let columns = (layout.width - x0).min(layout.tile_size) as usize;
                let src = (y as usize * layout.width as usize + x0 as usize) * samples;
                let dst = row as usize * layout.tile_size as usize * samples;
                tile[dst..dst + columns * samples].copy_from_slice(&data[src..src + columns * samples]);
            }
            tiles.push(tile);
        }
    }
    tiles
}

fn build(format: TiffFormat, kind: CompressionKind) -> Vec<u8> {
    let handler = CompressionFactory::for_kind(kind).unwrap();
    let layout = RasterLayout {
        width: WIDTH,
        height: HEIGHT,
        samples: SAMPLES,
        tile_size: TILE,
        compression: handler.code(),
        reduced_resolution: false,
    };
    let tiles = split_tiles(&pixels(), &layout)
        .iter()
        .map(|tile| handler.compress(tile).unwrap())
        .collect();

    let mut builder = TiffBuilder::with_format(format);
    let index = builder.add_ifd(IFD::new(0, 0));
    builder.add_raster_tags(index, &layout).unwrap();
    builder.set_tiles(index, tiles).unwrap();
    builder.add_geo_tags(index, &GeoTiffTags {
        pixel_scale: [2.5, 2.5, 0.0],
        tiepoint: [0.0, 0.0, 0.0, -9255613.0, 5212916.0, 0.0],
        epsg: 3857,
        geographic: false,
    }).unwrap();
    builder.add_software_tag().unwrap();

    let overview = RasterLayout { width: WIDTH / 2, height: HEIGHT / 2, reduced_resolution: true, ..layout };
    let overview_index = builder.add_ifd(IFD::new(1, 0));
    builder.add_raster_tags(overview_index, &overview).unwrap();
    let overview_tiles = split_tiles(&vec![7u8; (WIDTH / 2 * HEIGHT / 2 * 4) as usize], &overview)
        .iter()
        .map(|tile| handler.compress(tile).unwrap())
        .collect();
    builder.set_tiles(overview_index, overview_tiles).unwrap();

    builder.to_bytes().unwrap()
}

#[test]
fn deflate_classic_round_trip() {
    let mut cursor = Cursor::new(build(TiffFormat::Auto, CompressionKind::Deflate));
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    assert!(!tiff.is_big_tiff);
    assert_eq!(tiff.ifd_count(), 2);
    assert_eq!(tiff.overviews().len(), 1);

    let main = tiff.full_resolution_ifd().unwrap();
    assert_eq!(main.get_tile_size(), Some((16, 16)));
    assert_eq!(reader.read_tag_values(&mut cursor, main, tags::TILE_OFFSETS).unwrap().len(), 4);

    let raster = RasterReader::new(&mut cursor, main, &reader).read_image().unwrap();
    assert_eq!((raster.width, raster.height, raster.samples), (WIDTH, HEIGHT, SAMPLES));
    assert_eq!(raster.data, pixels());

    let overview = RasterReader::new(&mut cursor, tiff.overviews()[0], &reader).read_image().unwrap();
    assert_eq!((overview.width, overview.height), (10, 9));
    assert!(overview.data.iter().all(|&v| v == 7));

    let software = reader.read_tag_ascii(&mut cursor, main, tags::SOFTWARE).unwrap();
    assert!(software.starts_with("tilemosaic"));
}

#[test]
fn georeference_round_trip() {
    let mut cursor = Cursor::new(build(TiffFormat::Auto, CompressionKind::None));
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();
    let main = tiff.full_resolution_ifd().unwrap();

    let geo = GeoKeyParser::extract_geo_info(&reader, &mut cursor, main).unwrap();
    assert_eq!(geo.epsg_code, 3857);
    assert!(!geo.geographic);
    assert_eq!(geo.pixel_scale, Some([2.5, 2.5, 0.0]));
    assert_eq!(geo.get_bounds(WIDTH, HEIGHT), Some((-9255613.0, 5212871.0, -9255563.0, 5212916.0)));

    let keys = GeoKeyParser::format_geo_keys(&reader, &mut cursor, main).unwrap();
    assert_eq!(keys.len(), 3);
    assert_eq!(keys[2].1, "3857");
}

#[test]
fn forced_bigtiff_round_trip() {
    let mut cursor = Cursor::new(build(TiffFormat::BigTiff, CompressionKind::Deflate));
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    assert!(tiff.is_big_tiff);
    let main = tiff.full_resolution_ifd().unwrap();
    assert_eq!(main.get_entry(tags::TILE_OFFSETS).map(|e| e.field_type), Some(field_types::LONG8));

    let raster = RasterReader::new(&mut cursor, main, &reader).read_image().unwrap();
    assert_eq!(raster.data, pixels());
}

#[test]
fn identical_input_gives_identical_bytes() {
    assert_eq!(
        build(TiffFormat::Auto, CompressionKind::Deflate),
        build(TiffFormat::Auto, CompressionKind::Deflate)
    );
}
