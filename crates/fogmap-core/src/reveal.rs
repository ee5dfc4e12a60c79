//! Reveal geometry: the contract between the engine and a compositor.
//!
//! A pixel is revealed iff it lies within the on-screen reveal radius of
//! some kept fix, or of the segment joining two consecutive fixes of the
//! same chain. Two interchangeable encodings of that area are produced:
//!
//! - [`StrokeGeometry`]: one disc per kept fix plus one simplified
//!   polyline per chain, stroked at `2 * radius_px` with round caps and
//!   joins. Suited to luminance-mask rasterisers.
//! - [`PolygonGeometry`]: convex rings whose union is the revealed area
//!   (a circumscribing n-gon per fix and a rectangle per polyline
//!   segment). Suited to polygon-difference compositors.
//!
//! Both are expressed in the pixel space of the region they were built
//! against, which is the stable compute region during a pan.

use geo::{Closest, ClosestPoint, Coord, Intersects, Line, LineString, Polygon, Translate};

use crate::projection::{GeoProjector, meters_to_pixels};
use crate::simplify::{simplify_chains, tolerance_for_radius};
use crate::types::{
    Chain, FogConfig, GeometryStyle, MapRegion, PixelPoint, Polyline, SafeAreaInsets,
};

/// Discs and round-capped strokes.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeGeometry {
    /// One center per kept fix.
    pub discs: Vec<PixelPoint>,
    /// One simplified polyline per chain with at least two fixes.
    pub polylines: Vec<Polyline>,
    /// Reveal radius in pixels.
    pub radius_px: f64,
    /// Region the pixels are relative to.
    pub region: MapRegion,
}

impl StrokeGeometry {
    /// Stroke width that joins consecutive discs without seams.
    #[must_use]
    pub fn stroke_width(&self) -> f64 {
        2.0 * self.radius_px
    }

    /// Returns `true` if `pixel` is within the radius of a disc or of a
    /// polyline segment.
    #[must_use]
    pub fn is_revealed(&self, pixel: PixelPoint) -> bool {
        if self.radius_px <= 0.0 {
            return false;
        }
        let r_sq = self.radius_px * self.radius_px;
        if self.discs.iter().any(|d| d.distance_squared(pixel) <= r_sq) {
            return true;
        }
        let query = geo::Point::new(pixel.x, pixel.y);
        self.polylines.iter().any(|pl| {
            pl.points().windows(2).any(|w| {
                let line = Line::new(to_coord(w[0]), to_coord(w[1]));
                let nearest = closest_coord_on_line(&line, &query);
                PixelPoint::new(nearest.x, nearest.y).distance_squared(pixel) <= r_sq
            })
        })
    }

    /// Shift every pixel by `(dx, dy)`.
    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            discs: self.discs.iter().map(|d| d.offset(dx, dy)).collect(),
            polylines: self
                .polylines
                .iter()
                .map(|pl| Polyline::new(pl.points().iter().map(|p| p.offset(dx, dy)).collect()))
                .collect(),
            radius_px: self.radius_px,
            region: self.region,
        }
    }

    /// The same area as convex rings: a circumscribing `segments`-gon
    /// per disc and a rectangle per polyline segment.
    ///
    /// The rings cover at least the stroked area. `segments` below 3 is
    /// raised to 3.
    #[must_use]
    pub fn to_polygon(&self, segments: usize) -> PolygonGeometry {
        if !(self.radius_px.is_finite() && self.radius_px > 0.0) {
            return PolygonGeometry {
                rings: Vec::new(),
                region: self.region,
            };
        }
        let segments = segments.max(3);
        let mut rings: Vec<Polygon<f64>> = self
            .discs
            .iter()
            .map(|&c| disc_ring(c, self.radius_px, segments))
            .collect();
        rings.extend(self.polylines.iter().flat_map(|pl| {
            pl.points()
                .windows(2)
                .filter_map(|w| corridor_ring(w[0], w[1], self.radius_px))
        }));
        PolygonGeometry {
            rings,
            region: self.region,
        }
    }
}

/// Convex rings whose union is the revealed area.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonGeometry {
    /// Disc n-gons and segment corridors, in pixels.
    pub rings: Vec<Polygon<f64>>,
    /// Region the pixels are relative to.
    pub region: MapRegion,
}

impl PolygonGeometry {
    /// Returns `true` if `pixel` lies inside or on some ring.
    #[must_use]
    pub fn is_revealed(&self, pixel: PixelPoint) -> bool {
        let c = to_coord(pixel);
        self.rings.iter().any(|ring| ring.intersects(&c))
    }

    /// Shift every ring by `(dx, dy)`.
    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            rings: self.rings.iter().map(|r| r.translate(dx, dy)).collect(),
            region: self.region,
        }
    }
}

/// Output of one full recompute.
#[derive(Debug, Clone, PartialEq)]
pub enum RevealGeometry {
    /// Discs plus round-capped polylines.
    Strokes(StrokeGeometry),
    /// Convex rings.
    Polygon(PolygonGeometry),
}

impl RevealGeometry {
    /// Geometry that reveals nothing.
    #[must_use]
    pub const fn empty(style: GeometryStyle, region: MapRegion) -> Self {
        match style {
            GeometryStyle::Strokes => Self::Strokes(StrokeGeometry {
                discs: Vec::new(),
                polylines: Vec::new(),
                radius_px: 0.0,
                region,
            }),
            GeometryStyle::Polygon => Self::Polygon(PolygonGeometry {
                rings: Vec::new(),
                region,
            }),
        }
    }

    /// Which variant this is.
    #[must_use]
    pub const fn style(&self) -> GeometryStyle {
        match self {
            Self::Strokes(_) => GeometryStyle::Strokes,
            Self::Polygon(_) => GeometryStyle::Polygon,
        }
    }

    /// Region the geometry was built against.
    #[must_use]
    pub const fn region(&self) -> &MapRegion {
        match self {
            Self::Strokes(s) => &s.region,
            Self::Polygon(p) => &p.region,
        }
    }

    /// Returns `true` if nothing is revealed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Strokes(s) => s.discs.is_empty() || s.radius_px <= 0.0,
            Self::Polygon(p) => p.rings.is_empty(),
        }
    }

    /// Total vertex count, a rough measure of compositor work.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        match self {
            Self::Strokes(s) => {
                s.discs.len() + s.polylines.iter().map(Polyline::len).sum::<usize>()
            }
            Self::Polygon(p) => p.rings.iter().map(|r| r.exterior().0.len()).sum(),
        }
    }

    /// Returns `true` if `pixel` is revealed.
    #[must_use]
    pub fn is_revealed(&self, pixel: PixelPoint) -> bool {
        match self {
            Self::Strokes(s) => s.is_revealed(pixel),
            Self::Polygon(p) => p.is_revealed(pixel),
        }
    }

    /// The same geometry shifted by a pan offset.
    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        match self {
            Self::Strokes(s) => Self::Strokes(s.translated(dx, dy)),
            Self::Polygon(p) => Self::Polygon(p.translated(dx, dy)),
        }
    }
}

/// Turns culled chains into [`RevealGeometry`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealGeometryBuilder {
    style: GeometryStyle,
    disc_segments: usize,
    simplify_fraction: f64,
    insets: SafeAreaInsets,
}

impl RevealGeometryBuilder {
    /// Builder for `style` with default tuning.
    #[must_use]
    pub const fn new(style: GeometryStyle) -> Self {
        Self {
            style,
            disc_segments: FogConfig::DEFAULT_DISC_SEGMENTS,
            simplify_fraction: FogConfig::DEFAULT_SIMPLIFY_FRACTION,
            insets: SafeAreaInsets { top: 0.0, bottom: 0.0 },
        }
    }

    /// Builder configured from a [`FogConfig`].
    #[must_use]
    pub const fn from_config(config: &FogConfig) -> Self {
        Self {
            style: config.geometry,
            disc_segments: config.disc_segments,
            simplify_fraction: config.simplify_fraction,
            insets: config.safe_area,
        }
    }

    /// Project, simplify and assemble in one go.
    ///
    /// Degenerate input (no chains, an unusable region, a radius that
    /// rounds to zero pixels) yields [`RevealGeometry::empty`].
    #[must_use]
    pub fn build(
        &self,
        chains: &[Chain],
        radius_meters: f64,
        region: &MapRegion,
    ) -> RevealGeometry {
        let radius_px = meters_to_pixels(radius_meters, region);
        let projected = self.project_chains(chains, region);
        let tolerance = tolerance_for_radius(radius_px, self.simplify_fraction);
        let simplified = simplify_chains(&projected, tolerance);
        self.assemble(&projected, simplified, radius_px, region)
    }

    /// Project every chain into `region`'s pixel space.
    ///
    /// Fixes that cannot be projected are dropped; an unusable region
    /// yields no polylines.
    #[must_use]
    pub fn project_chains(&self, chains: &[Chain], region: &MapRegion) -> Vec<Polyline> {
        if !region.is_usable() {
            return Vec::new();
        }
        let projector = GeoProjector::with_insets(*region, self.insets);
        chains
            .iter()
            .map(|c| {
                Polyline::new(
                    c.points()
                        .iter()
                        .filter_map(|p| projector.try_project(p))
                        .collect(),
                )
            })
            .filter(|pl| !pl.is_empty())
            .collect()
    }

    /// Simplification tolerance in pixels for a given radius.
    #[must_use]
    pub fn tolerance(&self, radius_px: f64) -> f64 {
        tolerance_for_radius(radius_px, self.simplify_fraction)
    }

    /// Build the output from projected chains (disc centers) and their
    /// simplified counterparts (stroke paths).
    #[must_use]
    pub fn assemble(
        &self,
        projected: &[Polyline],
        simplified: Vec<Polyline>,
        radius_px: f64,
        region: &MapRegion,
    ) -> RevealGeometry {
        if !(radius_px.is_finite() && radius_px > 0.0) || projected.is_empty() {
            return RevealGeometry::empty(self.style, *region);
        }
        let discs: Vec<PixelPoint> = projected
            .iter()
            .flat_map(|pl| pl.points().iter().copied())
            .collect();
        let polylines: Vec<Polyline> = simplified.into_iter().filter(|pl| pl.len() >= 2).collect();

        let strokes = StrokeGeometry {
            discs,
            polylines,
            radius_px,
            region: *region,
        };
        match self.style {
            GeometryStyle::Strokes => RevealGeometry::Strokes(strokes),
            GeometryStyle::Polygon => {
                RevealGeometry::Polygon(strokes.to_polygon(self.disc_segments))
            }
        }
    }
}

impl Default for RevealGeometryBuilder {
    fn default() -> Self {
        Self::from_config(&FogConfig::default())
    }
}

const fn to_coord(p: PixelPoint) -> Coord<f64> {
    Coord { x: p.x, y: p.y }
}

fn closest_coord_on_line(line: &Line<f64>, query: &geo::Point<f64>) -> Coord<f64> {
    match line.closest_point(query) {
        Closest::Intersection(p) | Closest::SinglePoint(p) => p.into(),
        Closest::Indeterminate => line.start,
    }
}

/// Regular n-gon circumscribing the disc of `radius` at `center`.
///
/// Vertices sit at `radius / cos(pi / n)` so every edge is tangent to
/// the true circle and the n-gon never under-reveals.
#[allow(clippy::cast_precision_loss)]
fn disc_ring(center: PixelPoint, radius: f64, segments: usize) -> Polygon<f64> {
    let step = std::f64::consts::TAU / segments as f64;
    let outer = radius / (step / 2.0).cos();
    let coords: Vec<Coord<f64>> = (0..segments)
        .map(|i| {
            let angle = step * i as f64;
            Coord {
                x: outer.mul_add(angle.cos(), center.x),
                y: outer.mul_add(angle.sin(), center.y),
            }
        })
        .collect();
    Polygon::new(LineString::from(coords), Vec::new())
}

/// Rectangle of half-width `radius` along the segment `a`-`b`.
///
/// Returns `None` for a zero-length segment; the end discs already cover
/// it.
fn corridor_ring(a: PixelPoint, b: PixelPoint, radius: f64) -> Option<Polygon<f64>> {
    let length = a.distance(b);
    if length <= 0.0 || !length.is_finite() {
        return None;
    }
    let nx = -(b.y - a.y) / length * radius;
    let ny = (b.x - a.x) / length * radius;
    let coords = vec![
        Coord { x: a.x + nx, y: a.y + ny },
        Coord { x: b.x + nx, y: b.y + ny },
        Coord { x: b.x - nx, y: b.y - ny },
        Coord { x: a.x - nx, y: a.y - ny },
    ];
    Some(Polygon::new(LineString::from(coords), Vec::new()))
}
