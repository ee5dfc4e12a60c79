//! Luminance-mask compositor: draw the revealed area straight into the
//! mask with `tiny-skia`.
//!
//! Discs are filled circles and each polyline is stroked at twice the
//! reveal radius with round caps and joins, so consecutive discs merge
//! into one seamless corridor. Polygon geometry is filled ring by ring
//! under the non-zero rule after orienting every ring the same way, so
//! overlaps never cancel out.

use fogmap_core::{PolygonGeometry, RevealGeometry, StrokeGeometry};
use geo::{Area, LineString};
use image::GrayImage;
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::compositor::{Compositor, RenderError, alpha_to_mask, new_pixmap};

/// Draws discs and round-capped strokes as opaque coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StrokeMaskCompositor;

impl Compositor for StrokeMaskCompositor {
    fn reveal_mask(
        &self,
        geometry: &RevealGeometry,
        width: u32,
        height: u32,
    ) -> Result<GrayImage, RenderError> {
        let mut pixmap = new_pixmap(width, height)?;
        match geometry {
            RevealGeometry::Strokes(strokes) => draw_strokes(&mut pixmap, strokes),
            RevealGeometry::Polygon(polygon) => fill_rings(&mut pixmap, polygon),
        }
        Ok(alpha_to_mask(&pixmap, false))
    }
}

/// Opaque anti-aliased paint. Only alpha matters for the mask.
pub(crate) fn coverage_paint() -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(0, 0, 0, 255);
    paint.anti_alias = true;
    paint
}

#[allow(clippy::cast_possible_truncation)]
fn draw_strokes(pixmap: &mut Pixmap, strokes: &StrokeGeometry) {
    if !(strokes.radius_px.is_finite() && strokes.radius_px > 0.0) {
        return;
    }
    let paint = coverage_paint();
    let r = strokes.radius_px as f32;

    let mut discs = PathBuilder::new();
    for c in &strokes.discs {
        discs.push_circle(c.x as f32, c.y as f32, r);
    }
    if let Some(path) = discs.finish() {
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }

    let mut lines = PathBuilder::new();
    for polyline in &strokes.polylines {
        let points = polyline.points();
        let Some(first) = points.first() else {
            continue;
        };
        lines.move_to(first.x as f32, first.y as f32);
        for p in &points[1..] {
            lines.line_to(p.x as f32, p.y as f32);
        }
    }
    let Some(path) = lines.finish() else {
        return;
    };
    let stroke = Stroke {
        width: strokes.stroke_width() as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}

fn fill_rings(pixmap: &mut Pixmap, polygon: &PolygonGeometry) {
    let mut pb = PathBuilder::new();
    for ring in &polygon.rings {
        push_ring(&mut pb, ring.exterior(), ring.signed_area() < 0.0);
    }
    if let Some(path) = pb.finish() {
        pixmap.fill_path(
            &path,
            &coverage_paint(),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }
}

/// Append a closed ring to `pb`, optionally walking it backwards.
///
/// Rings with fewer than three coordinates are skipped.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn push_ring(pb: &mut PathBuilder, ring: &LineString<f64>, reverse: bool) {
    if ring.0.len() < 3 {
        return;
    }
    let mut coords: Vec<_> = ring.coords().copied().collect();
    if reverse {
        coords.reverse();
    }
    let first = coords[0];
    pb.move_to(first.x as f32, first.y as f32);
    for c in &coords[1..] {
        pb.line_to(c.x as f32, c.y as f32);
    }
    pb.close();
}
