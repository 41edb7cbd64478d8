//! End-to-end tests of the mosaic pipeline against an in-memory tile server

use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use approx::assert_abs_diff_eq;
use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use rand::Rng;

use tilemosaic::coordinate::{CoordinateMapper, TileRange};
use tilemosaic::georef::GeoRaster;
use tilemosaic::{
    BoundingBox, CoordinateSystem, FetchAttemptError, MosaicError, MosaicOutcome, MosaicRequest,
    OutputSettings, TileClient, TileMosaic, TileResponse, TiffReader, ZoomSpec,
};

const TEMPLATE: &str = "http://tiles.test/{z}/{x}/{y}.png";
const REFERENCE_BBOX: [f64; 4] = [-83.1440, 42.3561, -83.1437, 42.3562];
const WIDE_BBOX: [f64; 4] = [-83.150, 42.350, -83.140, 42.356];

/// Serves a solid 256x256 PNG per tile, coloured by its x/y
struct SolidTileServer {
    calls: AtomicUsize,
    missing: HashSet<(u32, u32)>,
    failing: HashSet<(u32, u32)>,
    max_delay_ms: u64,
}

impl SolidTileServer {
    fn new() -> Self {
        SolidTileServer {
            calls: AtomicUsize::new(0),
            missing: HashSet::new(),
            failing: HashSet::new(),
            max_delay_ms: 0,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn color(x: u32, y: u32) -> [u8; 3] {
        [(x % 200 + 20) as u8, (y % 200 + 20) as u8, 77]
    }

    fn png(color: [u8; 3]) -> Vec<u8> {
        let tile = ImageBuffer::from_pixel(256, 256, Rgb(color));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(tile)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn parse(url: &str) -> (u32, u32) {
        let parts: Vec<&str> = url.rsplit('/').take(2).collect();
        let y = parts[0].trim_end_matches(".png").parse().unwrap();
        let x = parts[1].parse().unwrap();
        (x, y)
    }
}

#[async_trait]
impl TileClient for SolidTileServer {
    async fn get(&self, url: &str) -> Result<TileResponse, FetchAttemptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.max_delay_ms > 0 {
            let delay = rand::thread_rng().gen_range(0..=self.max_delay_ms);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let (x, y) = Self::parse(url);
        if self.missing.contains(&(x, y)) {
            return Ok(TileResponse::new(404, Vec::new()));
        }
        if self.failing.contains(&(x, y)) {
            return Ok(TileResponse::new(500, Vec::new()));
        }
        Ok(TileResponse::new(200, Self::png(Self::color(x, y))))
    }
}

fn tile_range(bbox: &[f64]) -> TileRange {
    TileRange::from_bbox(&BoundingBox::from_slice(bbox).unwrap(), 15).unwrap()
}

fn request(output: &Path, bbox: &[f64]) -> MosaicRequest {
    MosaicRequest::new(output, bbox, ZoomSpec::Zoom(15), TEMPLATE)
}

async fn build(server: &Arc<SolidTileServer>, request: &MosaicRequest) -> Result<MosaicOutcome, MosaicError> {
    let client: Arc<dyn TileClient> = server.clone();
    TileMosaic::with_client(client).build_mosaic_geotiff(request).await
}

#[tokio::test]
async fn reference_box_is_georeferenced_within_a_pixel() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("mosaic.tif");
    let server = Arc::new(SolidTileServer::new());

    let outcome = build(&server, &request(&output, &REFERENCE_BBOX)).await.unwrap();
    assert_eq!(outcome, MosaicOutcome::Written { path: output.clone(), width: 7, height: 3, bands: 3 });

    let raster = GeoRaster::load(&output).unwrap();
    assert_eq!((raster.width(), raster.height()), (7, 3));
    assert_eq!(raster.crs, CoordinateSystem::WebMercator);

    let [west, south, east, north] = REFERENCE_BBOX;
    let pixel_lon = (east - west) / 7.0;
    let pixel_lat = (north - south) / 3.0;
    let (min_x, min_y, max_x, max_y) = raster.bounds();
    let (south_read, west_read) = CoordinateMapper::projected_meters_to_deg(min_x, min_y);
    let (north_read, east_read) = CoordinateMapper::projected_meters_to_deg(max_x, max_y);

    assert_abs_diff_eq!(west_read, west, epsilon = pixel_lon);
    assert_abs_diff_eq!(east_read, east, epsilon = pixel_lon);
    assert_abs_diff_eq!(south_read, south, epsilon = pixel_lat);
    assert_abs_diff_eq!(north_read, north, epsilon = pixel_lat);

    let range = tile_range(&REFERENCE_BBOX);
    let expected = SolidTileServer::color(range.min_x(), range.min_y());
    assert_eq!(raster.image.pixel(0, 0), &expected[..]);
}

#[tokio::test]
async fn existing_output_is_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("mosaic.tif");
    let server = Arc::new(SolidTileServer::new());

    build(&server, &request(&output, &REFERENCE_BBOX)).await.unwrap();
    let calls = server.calls();
    let written = std::fs::read(&output).unwrap();

    let outcome = build(&server, &request(&output, &REFERENCE_BBOX)).await.unwrap();
    assert_eq!(outcome, MosaicOutcome::AlreadyExists(output.clone()));
    assert_eq!(server.calls(), calls);
    assert_eq!(std::fs::read(&output).unwrap(), written);
}

#[tokio::test]
async fn missing_tile_stays_blank() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("holes.tif");
    let range = tile_range(&WIDE_BBOX);

    let mut server = SolidTileServer::new();
    server.missing.insert((range.min_x(), range.min_y()));
    let server = Arc::new(server);

    build(&server, &request(&output, &WIDE_BBOX)).await.unwrap();
    assert_eq!(server.calls() as u64, range.tile_count());

    let raster = GeoRaster::load(&output).unwrap();
    assert_eq!(raster.image.pixel(0, 0), &[0, 0, 0][..]);
    let (w, h) = (raster.width(), raster.height());
    let expected = SolidTileServer::color(range.max_x() - 1, range.max_y() - 1);
    assert_eq!(raster.image.pixel(w - 1, h - 1), &expected[..]);
}

#[tokio::test]
async fn failing_tile_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("failed.tif");
    let range = tile_range(&WIDE_BBOX);

    let mut server = SolidTileServer::new();
    server.failing.insert((range.min_x(), range.min_y()));
    let server = Arc::new(server);

    let error = build(&server, &request(&output, &WIDE_BBOX)).await.unwrap_err();
    assert!(matches!(error, MosaicError::Fetch { .. }), "unexpected error: {}", error);
    assert!(!output.exists());
}

#[tokio::test]
async fn output_does_not_depend_on_arrival_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = SolidTileServer::new();
    server.max_delay_ms = 15;
    let server = Arc::new(server);

    let first = dir.path().join("first.tif");
    let second = dir.path().join("second.tif");
    build(&server, &request(&first, &WIDE_BBOX)).await.unwrap();
    build(&server, &request(&second, &WIDE_BBOX)).await.unwrap();

    assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
}

#[tokio::test]
async fn cog_output_has_overviews() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("cog.tif");
    let server = Arc::new(SolidTileServer::new());
    let settings = OutputSettings { tile_size: 64, convert_to_cog: true, ..OutputSettings::default() };

    let outcome = build(&server, &request(&output, &WIDE_BBOX).with_settings(settings)).await.unwrap();
    let (width, height) = match outcome {
        MosaicOutcome::Written { width, height, .. } => (width, height),
        other => panic!("unexpected outcome {:?}", other),
    };

    let mut reader = TiffReader::new();
    let tiff = reader.load(&output).unwrap();
    assert!(!tiff.overviews().is_empty());
    let full = tiff.full_resolution_ifd().unwrap();
    assert_eq!(full.get_dimensions(), Some((width as u64, height as u64)));
    assert!(full.is_tiled());
}

#[tokio::test]
async fn reprojects_to_geographic() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("wgs84.tif");
    let server = Arc::new(SolidTileServer::new());

    let request = request(&output, &WIDE_BBOX).crs(CoordinateSystem::WGS84);
    build(&server, &request).await.unwrap();

    let raster = GeoRaster::load(&output).unwrap();
    assert_eq!(raster.crs.epsg_code(), 4326);

    let [west, south, east, north] = WIDE_BBOX;
    let pixel = raster.transform.pixel_width;
    let (min_x, min_y, max_x, max_y) = raster.bounds();
    assert_abs_diff_eq!(min_x, west, epsilon = 1e-9);
    assert_abs_diff_eq!(max_y, north, epsilon = 1e-9);
    assert_abs_diff_eq!(max_x, east, epsilon = pixel);
    assert_abs_diff_eq!(min_y, south, epsilon = pixel);
}

#[tokio::test]
async fn image_mode_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("unused.tif");
    let server = Arc::new(SolidTileServer::new());

    let outcome = build(&server, &request(&output, &REFERENCE_BBOX).return_image(true)).await.unwrap();
    match outcome {
        MosaicOutcome::Image(image) => assert_eq!(image.dimensions(), (7, 3)),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(!output.exists());
}

#[tokio::test]
async fn configuration_errors_precede_any_request() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("never.tif");
    let server = Arc::new(SolidTileServer::new());

    let inverted = [-83.1437, 42.3562, -83.1440, 42.3561];
    let error = build(&server, &request(&output, &inverted)).await.unwrap_err();
    assert!(matches!(error, MosaicError::Configuration(_)));

    let unknown = MosaicRequest::new(&output, &REFERENCE_BBOX, ZoomSpec::Zoom(15), "no-such-provider");
    let error = build(&server, &unknown).await.unwrap_err();
    assert!(error.is_pre_flight());

    assert_eq!(server.calls(), 0);
    assert!(!output.exists());
}

#[tokio::test]
async fn oversized_range_is_rejected_before_fetching() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("huge.tif");
    let server = Arc::new(SolidTileServer::new());

    let error = build(&server, &request(&output, &[-10.0, -10.0, 10.0, 10.0])).await.unwrap_err();
    assert!(matches!(error, MosaicError::Configuration(_)), "unexpected error: {}", error);
    assert_eq!(server.calls(), 0);
    assert!(!output.exists());
}
