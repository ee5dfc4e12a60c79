//! Polygon-difference compositor.
//!
//! The fog is a world rectangle covering the output surface with the
//! union of every reveal ring cut out of it. The remaining multipolygon
//! (holes included) is filled under the even-odd rule and the mask is the
//! inverse of its coverage. Stroke geometry is polygonised first with
//! [`StrokeGeometry::to_polygon`](fogmap_core::StrokeGeometry::to_polygon).

use fogmap_core::{FogConfig, PolygonGeometry, RevealGeometry};
use geo::{BooleanOps, MultiPolygon, Rect, coord, unary_union};
use image::GrayImage;
use tiny_skia::{FillRule, PathBuilder, Transform};
use tracing::debug;

use crate::compositor::{Compositor, RenderError, alpha_to_mask, new_pixmap};
use crate::mask::{coverage_paint, push_ring};

/// Subtracts the revealed area from an opaque world rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolygonCompositor {
    /// Sides per disc when polygonising stroke geometry.
    pub disc_segments: usize,
}

impl Default for PolygonCompositor {
    fn default() -> Self {
        Self {
            disc_segments: FogConfig::DEFAULT_DISC_SEGMENTS,
        }
    }
}

impl PolygonCompositor {
    /// The fog area for a `width` x `height` surface: the world rectangle
    /// minus the union of the reveal rings.
    #[must_use]
    pub fn fog_area(
        &self,
        geometry: &RevealGeometry,
        width: f64,
        height: f64,
    ) -> MultiPolygon<f64> {
        let world = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: width, y: height });
        let world = MultiPolygon::new(vec![world.to_polygon()]);
        let polygonised;
        let rings: &PolygonGeometry = match geometry {
            RevealGeometry::Polygon(p) => p,
            RevealGeometry::Strokes(s) => {
                polygonised = s.to_polygon(self.disc_segments);
                &polygonised
            }
        };
        if rings.rings.is_empty() {
            return world;
        }
        let revealed = unary_union(rings.rings.iter());
        debug!(
            rings = rings.rings.len(),
            pieces = revealed.0.len(),
            "unioned reveal rings"
        );
        world.difference(&revealed)
    }
}

impl Compositor for PolygonCompositor {
    fn reveal_mask(
        &self,
        geometry: &RevealGeometry,
        width: u32,
        height: u32,
    ) -> Result<GrayImage, RenderError> {
        let mut pixmap = new_pixmap(width, height)?;
        let fog = self.fog_area(geometry, f64::from(width), f64::from(height));

        let mut pb = PathBuilder::new();
        for polygon in fog.iter() {
            push_ring(&mut pb, polygon.exterior(), false);
            for hole in polygon.interiors() {
                push_ring(&mut pb, hole, false);
            }
        }
        if let Some(path) = pb.finish() {
            pixmap.fill_path(
                &path,
                &coverage_paint(),
                FillRule::EvenOdd,
                Transform::identity(),
                None,
            );
        }
        Ok(alpha_to_mask(&pixmap, true))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fogmap_core::{GeometryStyle, MapRegion, PixelPoint, Polyline, StrokeGeometry};
    use geo::Area;

    use super::*;

    fn region() -> MapRegion {
        MapRegion::new(0.0, 0.0, 0.1, 0.1, 64.0, 64.0)
    }

    fn single_disc(radius_px: f64) -> RevealGeometry {
        RevealGeometry::Strokes(StrokeGeometry {
            discs: vec![PixelPoint::new(32.0, 32.0)],
            polylines: Vec::new(),
            radius_px,
            region: region(),
        })
    }

    #[test]
    fn empty_geometry_fogs_everything() {
        let geometry = RevealGeometry::empty(GeometryStyle::Polygon, region());
        let compositor = PolygonCompositor::default();
        let fog = compositor.fog_area(&geometry, 64.0, 64.0);
        assert!((fog.unsigned_area() - 64.0 * 64.0).abs() < 1e-9);
        let mask = compositor.reveal_mask(&geometry, 64, 64).unwrap();
        assert!(mask.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn disc_becomes_hole() {
        let compositor = PolygonCompositor::default();
        let fog = compositor.fog_area(&single_disc(8.0), 64.0, 64.0);
        let hole = 64.0f64.mul_add(64.0, -fog.unsigned_area());
        let disc = std::f64::consts::PI * 64.0;
        // Circumscribing 24-gon is slightly larger than the disc.
        assert!(hole > disc && hole < disc * 1.02, "hole area {hole}");
    }

    #[test]
    fn disc_revealed_in_mask() {
        let mask = PolygonCompositor::default()
            .reveal_mask(&single_disc(8.0), 64, 64)
            .unwrap();
        assert_eq!(mask.get_pixel(32, 32)[0], 255);
        assert_eq!(mask.get_pixel(32, 44)[0], 0);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn overlapping_shapes_union() {
        let a = PixelPoint::new(20.0, 32.0);
        let b = PixelPoint::new(44.0, 32.0);
        let geometry = RevealGeometry::Strokes(StrokeGeometry {
            discs: vec![a, b],
            polylines: vec![Polyline::new(vec![a, b])],
            radius_px: 6.0,
            region: region(),
        });
        let compositor = PolygonCompositor::default();
        let fog = compositor.fog_area(&geometry, 64.0, 64.0);
        // One fog piece with a single hole: the capsule.
        assert_eq!(fog.0.len(), 1);
        assert_eq!(fog.0[0].interiors().len(), 1);
        let mask = compositor.reveal_mask(&geometry, 64, 64).unwrap();
        assert_eq!(mask.get_pixel(32, 32)[0], 255);
        assert_eq!(mask.get_pixel(32, 45)[0], 0);
    }

    #[test]
    fn reveal_touching_the_edge_opens_the_boundary() {
        let geometry = RevealGeometry::Strokes(StrokeGeometry {
            discs: vec![PixelPoint::new(0.0, 0.0)],
            polylines: Vec::new(),
            radius_px: 10.0,
            region: region(),
        });
        let mask = PolygonCompositor::default()
            .reveal_mask(&geometry, 64, 64)
            .unwrap();
        assert_eq!(mask.get_pixel(0, 0)[0], 255);
        assert_eq!(mask.get_pixel(40, 40)[0], 0);
    }
}
