//! Integration test: run a GPS track through the full pipeline and check
//! that both compositors reveal exactly the pixels the geometry says are
//! revealed, before and after a pan.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use fogmap_core::{
    FogConfig, FogPipeline, Frame, GeoPoint, GeometryStyle, MapRegion, PixelPoint,
    RevealGeometry, build_reveal,
};
use fogmap_render::{
    Compositor, CompositorKind, PolygonCompositor, StrokeMaskCompositor, apply_fog,
};
use image::{GrayImage, Rgba, RgbaImage};

const SIZE: u32 = 200;
const FOG: Rgba<u8> = Rgba([20, 20, 40, 255]);
const MAP: Rgba<u8> = Rgba([240, 230, 200, 255]);

/// 0.01 degrees over 200 px: about 5.6 m per pixel, so a 50 m radius is
/// roughly 9 px.
fn region(center_longitude: f64) -> MapRegion {
    MapRegion::new(0.0, center_longitude, 0.01, 0.01, f64::from(SIZE), f64::from(SIZE))
}

/// A zig-zag walk east with a teleport half way.
fn track() -> Vec<GeoPoint> {
    let mut points: Vec<GeoPoint> = (0..25)
        .map(|i| {
            let lat = 0.0003 * f64::from(i % 4) - 0.002;
            GeoPoint::new(lat, -0.004 + 0.00015 * f64::from(i), i64::from(i) * 5_000)
        })
        .collect();
    // ~600 m north of the last fix: a new chain.
    points.extend((0..10).map(|i| {
        GeoPoint::new(0.0035, -0.0004 + 0.0002 * f64::from(i), 200_000 + i64::from(i) * 5_000)
    }));
    points
}

/// Pixel `(x, y)` is revealed (or not) with a safety margin around its
/// center, so anti-aliasing and polygon approximation cannot flip it.
fn classify(geometry: &RevealGeometry, x: f64, y: f64, margin: f64) -> Option<bool> {
    let probes = [-margin, 0.0, margin];
    let mut inside = 0;
    let mut total = 0;
    for ox in probes {
        for oy in probes {
            total += 1;
            if geometry.is_revealed(PixelPoint::new(x + 0.5 + ox, y + 0.5 + oy)) {
                inside += 1;
            }
        }
    }
    if inside == total {
        Some(true)
    } else if inside == 0 {
        Some(false)
    } else {
        None
    }
}

/// Equal up to anti-aliasing rounding.
fn same_color(a: Rgba<u8>, b: Rgba<u8>) -> bool {
    a.0.iter().zip(b.0).all(|(&x, y)| x.abs_diff(y) <= 3)
}

fn assert_mask_matches(geometry: &RevealGeometry, mask: &GrayImage, label: &str) {
    let mut checked_inside = 0;
    let mut checked_outside = 0;
    for (x, y, pixel) in mask.enumerate_pixels() {
        match classify(geometry, f64::from(x), f64::from(y), 1.5) {
            Some(true) => {
                checked_inside += 1;
                assert!(pixel[0] > 250, "{label}: pixel ({x}, {y}) should be revealed");
            }
            Some(false) => {
                checked_outside += 1;
                assert!(pixel[0] < 5, "{label}: pixel ({x}, {y}) should be fogged");
            }
            None => {}
        }
    }
    eprintln!("{label}: {checked_inside} revealed, {checked_outside} fogged pixels checked");
    assert!(checked_inside > 100, "{label}: too few revealed pixels");
    assert!(checked_outside > 1000, "{label}: too few fogged pixels");
}

#[test]
fn stroke_mask_reveals_exactly_the_geometry() {
    let (geometry, diagnostics) = build_reveal(&track(), &region(0.0), &FogConfig::default());
    assert_eq!(diagnostics.summary.chain_count, 2);
    let mask = StrokeMaskCompositor.reveal_mask(&geometry, SIZE, SIZE).unwrap();
    assert_mask_matches(&geometry, &mask, "stroke mask");
}

#[test]
fn polygon_compositor_reveals_exactly_the_geometry() {
    let config = FogConfig {
        geometry: GeometryStyle::Polygon,
        ..FogConfig::default()
    };
    let (geometry, _) = build_reveal(&track(), &region(0.0), &config);
    assert_eq!(geometry.style(), GeometryStyle::Polygon);
    let mask = PolygonCompositor::default()
        .reveal_mask(&geometry, SIZE, SIZE)
        .unwrap();
    assert_mask_matches(&geometry, &mask, "polygon");
}

#[test]
fn compositors_agree_on_stroke_geometry() {
    let (geometry, _) = build_reveal(&track(), &region(0.0), &FogConfig::default());
    let strokes = CompositorKind::StrokeMask
        .reveal_mask(&geometry, SIZE, SIZE)
        .unwrap();
    let polygon = CompositorKind::Polygon
        .reveal_mask(&geometry, SIZE, SIZE)
        .unwrap();
    assert_mask_matches(&geometry, &strokes, "kind stroke mask");
    assert_mask_matches(&geometry, &polygon, "kind polygon");
}

#[test]
fn teleport_gap_stays_fogged() {
    let (geometry, _) = build_reveal(&track(), &region(0.0), &FogConfig::default());
    let mask = StrokeMaskCompositor.reveal_mask(&geometry, SIZE, SIZE).unwrap();
    // Midway between the end of the first chain and the start of the
    // second, well clear of both.
    let points = track();
    let projector = fogmap_core::GeoProjector::new(region(0.0));
    let a = projector.project(&points[24]);
    let b = projector.project(&points[25]);
    let mid_x = (a.x + b.x) / 2.0;
    let mid_y = (a.y + b.y) / 2.0;
    assert_eq!(classify(&geometry, mid_x, mid_y, 1.5), Some(false));
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pixel = mask.get_pixel(mid_x as u32, mid_y as u32);
    assert_eq!(pixel[0], 0);
}

#[test]
fn panned_frame_composites_like_the_translated_geometry() {
    let mut pipeline = FogPipeline::new(FogConfig::default()).unwrap();
    for fix in track() {
        pipeline.record_fix(fix).unwrap();
    }
    assert!(matches!(
        pipeline.update_region(region(0.0)),
        Frame::Rebuilt { .. }
    ));
    let built = pipeline.current().unwrap().value().clone();
    let mask = StrokeMaskCompositor.reveal_mask(&built, SIZE, SIZE).unwrap();

    // Pan a fifth of the viewport east: well inside the overscan.
    let Frame::Translated { dx, dy } = pipeline.update_region(region(0.002)) else {
        panic!("expected a translated frame");
    };
    assert!((dx + 40.0).abs() < 1e-6, "dx = {dx}");
    assert!(dy.abs() < 1e-9);

    let base = RgbaImage::from_pixel(SIZE, SIZE, MAP);
    let composited = apply_fog(&base, &mask, FOG, (dx, dy));

    let shifted = built.translated(dx, dy);
    let (fresh, _) = build_reveal(&track(), &region(0.002), &FogConfig::default());
    let mut checked = 0;
    for (x, y, pixel) in composited.enumerate_pixels() {
        let (fx, fy) = (f64::from(x), f64::from(y));
        // Nearest-neighbour sampling moves the probe by up to half a pixel.
        if let Some(revealed) = classify(&shifted, fx, fy, 1.5) {
            checked += 1;
            let expected = if revealed { MAP } else { FOG };
            assert!(same_color(*pixel, expected), "pixel ({x}, {y})");
        }
        // A from-scratch rebuild at the new camera agrees away from edges.
        if let Some(revealed) = classify(&fresh, fx, fy, 3.0) {
            let expected = if revealed { MAP } else { FOG };
            assert!(
                same_color(*pixel, expected),
                "fresh rebuild disagrees at ({x}, {y})"
            );
        }
    }
    assert!(checked > 1000);
}

#[test]
fn unusable_region_keeps_previous_geometry() {
    let mut pipeline = FogPipeline::new(FogConfig::default()).unwrap();
    for fix in track() {
        pipeline.record_fix(fix).unwrap();
    }
    pipeline.update_region(region(0.0));
    let before = pipeline.current().unwrap().id();
    let broken = MapRegion::new(0.0, 0.0, 0.01, 0.01, 0.0, f64::from(SIZE));
    assert_eq!(pipeline.update_region(broken), Frame::Skipped);
    assert_eq!(pipeline.current().unwrap().id(), before);
    let mask = CompositorKind::default()
        .reveal_mask(pipeline.current().unwrap().value(), SIZE, SIZE)
        .unwrap();
    assert!(mask.pixels().any(|p| p[0] == 255));
}
