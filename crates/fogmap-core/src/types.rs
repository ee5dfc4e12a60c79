//! Shared types for the fogmap reveal engine.

use serde::{Deserialize, Serialize};

/// A single GPS fix.
///
/// Values are plain data and `Copy`; a [`Path`] never hands out mutable
/// access to stored fixes, so a point is immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, `-90..=90`.
    pub latitude: f64,
    /// Longitude in degrees, `-180..=180`.
    pub longitude: f64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Horizontal accuracy radius in meters, when the source reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl GeoPoint {
    /// Create a point without an accuracy estimate.
    ///
    /// No validation happens here; use [`validate`](Self::validate) or
    /// let [`Path::push`] reject out-of-range values.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, timestamp: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
            accuracy: None,
        }
    }

    /// Attach a horizontal accuracy estimate (meters).
    #[must_use]
    pub const fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    /// Returns `true` if the coordinates are finite and in range, and the
    /// accuracy (if any) is finite and non-negative.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && self.accuracy.is_none_or(|a| a.is_finite() && a >= 0.0)
    }

    /// Return `self` if valid.
    ///
    /// # Errors
    ///
    /// Returns [`FogError::InvalidPoint`] when [`is_valid`](Self::is_valid)
    /// is `false`.
    pub fn validate(self) -> Result<Self, FogError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(FogError::InvalidPoint {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

/// A 2D point in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl PixelPoint {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// This point shifted by `(dx, dy)`.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// A sequence of screen-space points forming one stroke or ring.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polyline(Vec<PixelPoint>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<PixelPoint>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&PixelPoint> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&PixelPoint> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[PixelPoint] {
        &self.0
    }

    /// Consumes the polyline and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<PixelPoint> {
        self.0
    }
}

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    /// Northern edge (maximum latitude).
    pub north: f64,
    /// Southern edge (minimum latitude).
    pub south: f64,
    /// Eastern edge (maximum longitude).
    pub east: f64,
    /// Western edge (minimum longitude).
    pub west: f64,
}

impl GeoBounds {
    /// Returns `true` if the coordinate lies inside or on the box.
    #[must_use]
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.south..=self.north).contains(&latitude)
            && (self.west..=self.east).contains(&longitude)
    }

    /// Returns `true` if the box spanned by two points touches `self`.
    #[must_use]
    pub fn intersects_span(&self, a: &GeoPoint, b: &GeoPoint) -> bool {
        let south = a.latitude.min(b.latitude);
        let north = a.latitude.max(b.latitude);
        let west = a.longitude.min(b.longitude);
        let east = a.longitude.max(b.longitude);
        south <= self.north && north >= self.south && west <= self.east && east >= self.west
    }
}

/// The window a map camera is showing.
///
/// A region is *usable* only when every field is finite and the deltas
/// and pixel dimensions are strictly positive; see
/// [`is_usable`](Self::is_usable).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapRegion {
    /// Latitude at the viewport center, degrees.
    pub center_latitude: f64,
    /// Longitude at the viewport center, degrees.
    pub center_longitude: f64,
    /// Latitude span of the viewport, degrees.
    pub latitude_delta: f64,
    /// Longitude span of the viewport, degrees.
    pub longitude_delta: f64,
    /// Viewport width in pixels.
    pub pixel_width: f64,
    /// Viewport height in pixels.
    pub pixel_height: f64,
}

impl MapRegion {
    /// Create a region.
    #[must_use]
    pub const fn new(
        center_latitude: f64,
        center_longitude: f64,
        latitude_delta: f64,
        longitude_delta: f64,
        pixel_width: f64,
        pixel_height: f64,
    ) -> Self {
        Self {
            center_latitude,
            center_longitude,
            latitude_delta,
            longitude_delta,
            pixel_width,
            pixel_height,
        }
    }

    /// Returns `true` if the region can be projected against.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.center_latitude.is_finite()
            && self.center_longitude.is_finite()
            && self.latitude_delta.is_finite()
            && self.longitude_delta.is_finite()
            && self.pixel_width.is_finite()
            && self.pixel_height.is_finite()
            && self.latitude_delta > 0.0
            && self.longitude_delta > 0.0
            && self.pixel_width > 0.0
            && self.pixel_height > 0.0
    }

    /// The region center as a point (timestamp 0).
    #[must_use]
    pub const fn center(&self) -> GeoPoint {
        GeoPoint::new(self.center_latitude, self.center_longitude, 0)
    }

    /// Screen center in pixels.
    #[must_use]
    pub fn pixel_center(&self) -> PixelPoint {
        PixelPoint::new(self.pixel_width / 2.0, self.pixel_height / 2.0)
    }

    /// Region bounds expanded by `overscan` (a fraction of each delta)
    /// on every side. Non-finite or negative overscan counts as zero.
    #[must_use]
    pub fn bounds(&self, overscan: f64) -> GeoBounds {
        let overscan = if overscan.is_finite() && overscan > 0.0 {
            overscan
        } else {
            0.0
        };
        let half_lat = self.latitude_delta.mul_add(overscan, self.latitude_delta / 2.0);
        let half_lon = self
            .longitude_delta
            .mul_add(overscan, self.longitude_delta / 2.0);
        GeoBounds {
            north: self.center_latitude + half_lat,
            south: self.center_latitude - half_lat,
            east: self.center_longitude + half_lon,
            west: self.center_longitude - half_lon,
        }
    }

    /// Returns `true` if both regions have identical pixel dimensions.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn same_dimensions(&self, other: &Self) -> bool {
        self.pixel_width == other.pixel_width && self.pixel_height == other.pixel_height
    }
}

/// Vertical safe-area insets in pixels (status bar, home indicator).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SafeAreaInsets {
    /// Inset at the top edge.
    pub top: f64,
    /// Inset at the bottom edge.
    pub bottom: f64,
}

/// An edge between two consecutive path entries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Earlier fix.
    pub start: GeoPoint,
    /// Later fix.
    pub end: GeoPoint,
    /// `false` when the pair is a teleport and must not be stroked.
    pub connected: bool,
}

/// A run of fixes joined by connected segments.
///
/// Consecutive entries are always connected; chains are split wherever
/// the connection filter detects a teleport. A chain of one point is an
/// isolated fix that still reveals its own disk.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Chain(Vec<GeoPoint>);

impl Chain {
    /// Create a chain from points already known to be connected.
    #[must_use]
    pub const fn new(points: Vec<GeoPoint>) -> Self {
        Self(points)
    }

    /// Returns `true` if the chain has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[GeoPoint] {
        &self.0
    }

    /// Consumes the chain and returns its points.
    #[must_use]
    pub fn into_points(self) -> Vec<GeoPoint> {
        self.0
    }
}

/// Ordered, append-only record of accepted fixes.
///
/// Only validated points are stored. Existing entries are never edited;
/// the path grows by [`push`](Self::push) or is reset wholesale by the
/// administrative operations. Every mutation bumps
/// [`revision`](Self::revision).
///
/// Serialises as a plain array of fixes. Deserialising validates every
/// entry and starts a fresh revision count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<GeoPoint>", into = "Vec<GeoPoint>")]
pub struct Path {
    points: Vec<GeoPoint>,
    revision: u64,
}

impl Path {
    /// An empty path.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            points: Vec::new(),
            revision: 0,
        }
    }

    /// Append a fix.
    ///
    /// # Errors
    ///
    /// Returns [`FogError::InvalidPoint`] if the point fails validation;
    /// the path is left untouched.
    pub fn push(&mut self, point: GeoPoint) -> Result<(), FogError> {
        self.points.push(point.validate()?);
        self.revision += 1;
        Ok(())
    }

    /// Replace the whole path, skipping invalid entries.
    ///
    /// Returns how many entries were skipped.
    pub fn replace(&mut self, points: impl IntoIterator<Item = GeoPoint>) -> usize {
        let (kept, skipped) = partition_valid(points);
        self.points = kept;
        self.revision += 1;
        skipped
    }

    /// Insert history before the current first entry, skipping invalid
    /// entries.
    ///
    /// Returns how many entries were skipped.
    pub fn prepend(&mut self, points: impl IntoIterator<Item = GeoPoint>) -> usize {
        let (mut kept, skipped) = partition_valid(points);
        kept.append(&mut self.points);
        self.points = kept;
        self.revision += 1;
        skipped
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.points.clear();
        self.revision += 1;
    }

    /// All recorded fixes, oldest first.
    #[must_use]
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Number of recorded fixes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Counter bumped on every mutation.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }
}

impl TryFrom<Vec<GeoPoint>> for Path {
    type Error = FogError;

    fn try_from(points: Vec<GeoPoint>) -> Result<Self, Self::Error> {
        let points = points
            .into_iter()
            .map(GeoPoint::validate)
            .collect::<Result<_, _>>()?;
        Ok(Self {
            points,
            revision: 0,
        })
    }
}

impl From<Path> for Vec<GeoPoint> {
    fn from(path: Path) -> Self {
        path.points
    }
}

fn partition_valid(points: impl IntoIterator<Item = GeoPoint>) -> (Vec<GeoPoint>, usize) {
    let mut skipped = 0;
    let kept = points
        .into_iter()
        .filter(|p| {
            let ok = p.is_valid();
            if !ok {
                skipped += 1;
            }
            ok
        })
        .collect();
    (kept, skipped)
}

/// Which [`RevealGeometry`](crate::reveal::RevealGeometry) variant the
/// builder emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeometryStyle {
    /// Disks plus round-capped polylines, for luminance-mask compositors.
    #[default]
    Strokes,
    /// Convex rings (disk n-gons and corridor rectangles), for
    /// polygon-difference compositors.
    Polygon,
}

/// Configuration for the reveal pipeline.
///
/// Every constant here is a tunable. Use
/// [`validate`](Self::validate) before handing a hand-built config to
/// anything long-lived; [`FogPipeline::new`](crate::FogPipeline::new)
/// does so itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogConfig {
    /// Radius revealed around every fix, in meters.
    pub reveal_radius_meters: f64,

    /// Consecutive fixes farther apart than this are a teleport.
    pub max_segment_meters: f64,

    /// Consecutive fixes further apart in time than this are a teleport.
    /// `None` disables the time check.
    pub max_time_gap_ms: Option<i64>,

    /// Reject fixes whose reported accuracy is worse than this.
    /// `None` accepts any accuracy.
    pub max_fix_accuracy_meters: Option<f64>,

    /// Margin kept around the viewport, as a fraction of each delta.
    pub overscan: f64,

    /// Minimum on-screen distance between kept points.
    pub min_pixel_gap: f64,

    /// Last-resort cap on points processed per frame.
    pub max_points_per_frame: usize,

    /// Simplification tolerance as a fraction of the on-screen radius.
    pub simplify_fraction: f64,

    /// Relative delta change that forces a recompute.
    pub zoom_threshold: f64,

    /// Fraction of the overscan a pan may consume before recomputing.
    pub pan_fraction: f64,

    /// Which geometry variant to build.
    pub geometry: GeometryStyle,

    /// Vertex count of disk polygons in [`GeometryStyle::Polygon`].
    pub disc_segments: usize,

    /// Vertical safe-area compensation applied by the projector.
    pub safe_area: SafeAreaInsets,
}

impl FogConfig {
    /// Default reveal radius in meters.
    pub const DEFAULT_REVEAL_RADIUS_METERS: f64 = 50.0;
    /// Default teleport threshold in meters.
    pub const DEFAULT_MAX_SEGMENT_METERS: f64 = 500.0;
    /// Default viewport overscan fraction.
    pub const DEFAULT_OVERSCAN: f64 = 0.5;
    /// Default minimum pixel gap between kept points.
    pub const DEFAULT_MIN_PIXEL_GAP: f64 = 5.0;
    /// Default per-frame point cap.
    pub const DEFAULT_MAX_POINTS_PER_FRAME: usize = 5000;
    /// Default simplification fraction of the on-screen radius.
    pub const DEFAULT_SIMPLIFY_FRACTION: f64 = 0.15;
    /// Default relative zoom change that forces a recompute.
    pub const DEFAULT_ZOOM_THRESHOLD: f64 = 0.02;
    /// Default fraction of overscan a pan may consume.
    pub const DEFAULT_PAN_FRACTION: f64 = 0.8;
    /// Default disk polygon vertex count.
    pub const DEFAULT_DISC_SEGMENTS: usize = 24;

    /// Check every field, reporting the first offending one.
    ///
    /// # Errors
    ///
    /// Returns [`FogError::InvalidConfig`] naming the field and value.
    pub fn validate(&self) -> Result<(), FogError> {
        positive("reveal_radius_meters", self.reveal_radius_meters)?;
        positive("max_segment_meters", self.max_segment_meters)?;
        if let Some(gap) = self.max_time_gap_ms
            && gap < 0
        {
            return Err(invalid("max_time_gap_ms", gap));
        }
        if let Some(limit) = self.max_fix_accuracy_meters {
            positive("max_fix_accuracy_meters", limit)?;
        }
        non_negative("overscan", self.overscan)?;
        non_negative("min_pixel_gap", self.min_pixel_gap)?;
        if self.max_points_per_frame == 0 {
            return Err(invalid("max_points_per_frame", self.max_points_per_frame));
        }
        non_negative("simplify_fraction", self.simplify_fraction)?;
        non_negative("zoom_threshold", self.zoom_threshold)?;
        if !(self.pan_fraction.is_finite() && (0.0..=1.0).contains(&self.pan_fraction)) {
            return Err(invalid("pan_fraction", self.pan_fraction));
        }
        if self.disc_segments < 3 {
            return Err(invalid("disc_segments", self.disc_segments));
        }
        non_negative("safe_area.top", self.safe_area.top)?;
        non_negative("safe_area.bottom", self.safe_area.bottom)?;
        Ok(())
    }
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            reveal_radius_meters: Self::DEFAULT_REVEAL_RADIUS_METERS,
            max_segment_meters: Self::DEFAULT_MAX_SEGMENT_METERS,
            max_time_gap_ms: None,
            max_fix_accuracy_meters: None,
            overscan: Self::DEFAULT_OVERSCAN,
            min_pixel_gap: Self::DEFAULT_MIN_PIXEL_GAP,
            max_points_per_frame: Self::DEFAULT_MAX_POINTS_PER_FRAME,
            simplify_fraction: Self::DEFAULT_SIMPLIFY_FRACTION,
            zoom_threshold: Self::DEFAULT_ZOOM_THRESHOLD,
            pan_fraction: Self::DEFAULT_PAN_FRACTION,
            geometry: GeometryStyle::default(),
            disc_segments: Self::DEFAULT_DISC_SEGMENTS,
            safe_area: SafeAreaInsets::default(),
        }
    }
}

fn invalid(field: &str, value: impl std::fmt::Display) -> FogError {
    FogError::InvalidConfig(format!("{field} has invalid value {value}"))
}

fn positive(field: &str, value: f64) -> Result<(), FogError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value))
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), FogError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value))
    }
}

/// Errors raised when data is rejected at the engine boundary.
///
/// The geometry math itself never fails; these only come from
/// validating fixes, configs, and tile coordinates.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum FogError {
    /// A fix had non-finite or out-of-range coordinates or accuracy.
    #[error("invalid fix at ({latitude}, {longitude})")]
    InvalidPoint {
        /// Rejected latitude.
        latitude: f64,
        /// Rejected longitude.
        longitude: f64,
    },

    /// A fix was less accurate than the configured limit.
    #[error("fix accuracy {accuracy} m exceeds limit {limit} m")]
    InaccurateFix {
        /// Reported accuracy radius.
        accuracy: f64,
        /// Configured maximum.
        limit: f64,
    },

    /// Pipeline configuration is invalid.
    #[error("invalid fog configuration: {0}")]
    InvalidConfig(String),

    /// A tile coordinate was outside the grid for its zoom.
    #[error("tile {z}/{x}/{y} is outside the tile grid")]
    InvalidTile {
        /// Zoom level.
        z: u8,
        /// Column.
        x: u32,
        /// Row.
        y: u32,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- GeoPoint ---

    #[test]
    fn geo_point_in_range_is_valid() {
        assert!(GeoPoint::new(37.77, -122.42, 0).is_valid());
        assert!(GeoPoint::new(90.0, 180.0, 0).is_valid());
        assert!(GeoPoint::new(-90.0, -180.0, 0).is_valid());
    }

    #[test]
    fn geo_point_out_of_range_is_invalid() {
        assert!(!GeoPoint::new(90.1, 0.0, 0).is_valid());
        assert!(!GeoPoint::new(0.0, -180.5, 0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0, 0).is_valid());
        assert!(!GeoPoint::new(0.0, f64::INFINITY, 0).is_valid());
    }

    #[test]
    fn geo_point_bad_accuracy_is_invalid() {
        assert!(!GeoPoint::new(0.0, 0.0, 0).with_accuracy(-1.0).is_valid());
        assert!(!GeoPoint::new(0.0, 0.0, 0).with_accuracy(f64::NAN).is_valid());
        assert!(GeoPoint::new(0.0, 0.0, 0).with_accuracy(12.0).is_valid());
    }

    #[test]
    fn geo_point_serde_omits_missing_accuracy() {
        let json = serde_json::to_string(&GeoPoint::new(1.0, 2.0, 3)).unwrap();
        assert!(!json.contains("accuracy"));
        let back: GeoPoint =
            serde_json::from_str(r#"{"latitude":1.0,"longitude":2.0,"timestamp":3}"#).unwrap();
        assert!(back.accuracy.is_none());
    }

    // --- Path ---

    #[test]
    fn path_push_rejects_invalid_and_keeps_revision() {
        let mut path = Path::new();
        assert!(path.push(GeoPoint::new(10.0, 10.0, 1)).is_ok());
        let rev = path.revision();
        let result = path.push(GeoPoint::new(100.0, 10.0, 2));
        assert!(matches!(result, Err(FogError::InvalidPoint { .. })));
        assert_eq!(path.len(), 1);
        assert_eq!(path.revision(), rev);
    }

    #[test]
    fn path_deserialize_validates_every_fix() {
        let bad = r#"[{"latitude":999.0,"longitude":-500.0,"timestamp":0}]"#;
        assert!(serde_json::from_str::<Path>(bad).is_err());

        let mut path = Path::new();
        path.push(GeoPoint::new(1.0, 2.0, 3)).unwrap();
        path.push(GeoPoint::new(1.5, 2.5, 4)).unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert!(json.starts_with('['));
        assert!(!json.contains("revision"));
        let back: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(back.points(), path.points());
        assert_eq!(back.revision(), 0);
    }

    #[test]
    fn path_replace_skips_invalid() {
        let mut path = Path::new();
        let skipped = path.replace(vec![
            GeoPoint::new(1.0, 1.0, 0),
            GeoPoint::new(f64::NAN, 1.0, 1),
            GeoPoint::new(2.0, 2.0, 2),
        ]);
        assert_eq!(skipped, 1);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn path_prepend_puts_history_first() {
        let mut path = Path::new();
        path.push(GeoPoint::new(5.0, 5.0, 5)).unwrap();
        path.prepend(vec![GeoPoint::new(1.0, 1.0, 1)]);
        assert_eq!(path.points()[0].timestamp, 1);
        assert_eq!(path.points()[1].timestamp, 5);
    }

    #[test]
    fn path_clear_bumps_revision() {
        let mut path = Path::new();
        path.push(GeoPoint::new(5.0, 5.0, 5)).unwrap();
        let rev = path.revision();
        path.clear();
        assert!(path.is_empty());
        assert!(path.revision() > rev);
    }

    // --- MapRegion ---

    #[test]
    fn region_usable_requires_positive_finite_fields() {
        let ok = MapRegion::new(0.0, 0.0, 0.1, 0.1, 300.0, 300.0);
        assert!(ok.is_usable());
        assert!(!MapRegion { latitude_delta: 0.0, ..ok }.is_usable());
        assert!(!MapRegion { pixel_width: -1.0, ..ok }.is_usable());
        assert!(!MapRegion { center_latitude: f64::NAN, ..ok }.is_usable());
        assert!(!MapRegion { longitude_delta: f64::INFINITY, ..ok }.is_usable());
    }

    #[test]
    fn region_bounds_with_overscan() {
        let region = MapRegion::new(10.0, 20.0, 1.0, 2.0, 100.0, 100.0);
        let b = region.bounds(0.5);
        assert!((b.north - 11.0).abs() < 1e-12);
        assert!((b.south - 9.0).abs() < 1e-12);
        assert!((b.east - 22.0).abs() < 1e-12);
        assert!((b.west - 18.0).abs() < 1e-12);

        let tight = region.bounds(f64::NAN);
        assert!((tight.north - 10.5).abs() < 1e-12);
    }

    #[test]
    fn bounds_span_intersection() {
        let b = MapRegion::new(0.0, 0.0, 1.0, 1.0, 100.0, 100.0).bounds(0.0);
        // Both endpoints outside but the span crosses the box.
        let a = GeoPoint::new(0.0, -5.0, 0);
        let c = GeoPoint::new(0.0, 5.0, 0);
        assert!(b.intersects_span(&a, &c));
        let far = GeoPoint::new(3.0, 3.0, 0);
        let farther = GeoPoint::new(4.0, 4.0, 0);
        assert!(!b.intersects_span(&far, &farther));
    }

    // --- FogConfig ---

    #[test]
    fn default_config_is_valid() {
        assert!(FogConfig::default().validate().is_ok());
    }

    #[test]
    fn config_rejects_bad_fields() {
        let bad_radius = FogConfig {
            reveal_radius_meters: 0.0,
            ..FogConfig::default()
        };
        assert!(matches!(
            bad_radius.validate(),
            Err(FogError::InvalidConfig(msg)) if msg.contains("reveal_radius_meters")
        ));

        let bad_pan = FogConfig {
            pan_fraction: 1.5,
            ..FogConfig::default()
        };
        assert!(bad_pan.validate().is_err());

        let bad_cap = FogConfig {
            max_points_per_frame: 0,
            ..FogConfig::default()
        };
        assert!(bad_cap.validate().is_err());

        let bad_gap = FogConfig {
            max_time_gap_ms: Some(-5),
            ..FogConfig::default()
        };
        assert!(bad_gap.validate().is_err());
    }

    #[test]
    fn config_deserializes_with_missing_fields() {
        let config: FogConfig =
            serde_json::from_str(r#"{"reveal_radius_meters": 25.0}"#).unwrap();
        assert!((config.reveal_radius_meters - 25.0).abs() < f64::EPSILON);
        assert_eq!(
            config.max_points_per_frame,
            FogConfig::DEFAULT_MAX_POINTS_PER_FRAME
        );
    }

    #[test]
    fn error_serde_roundtrip() {
        let err = FogError::InvalidTile { z: 2, x: 9, y: 1 };
        let json = serde_json::to_string(&err).unwrap();
        let back: FogError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
