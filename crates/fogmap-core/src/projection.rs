//! Geographic to screen projection for a single map region.
//!
//! The map camera describes what it shows as a center plus latitude and
//! longitude spans. Within one region the mapping is linear: a fix's
//! fractional offset from the center, scaled by the deltas, lands in
//! `[0, pixel_width] x [0, pixel_height]`. Because the mapping is affine,
//! two regions that differ only by center are related by a pure
//! translation, which [`pan_offset`] computes exactly.
//!
//! Invalid inputs never fail: projection falls back to the screen
//! center, [`meters_per_pixel`] to `1.0`, and [`meters_to_pixels`] to
//! `0.0`, each with a `tracing` warning.

use tracing::warn;

use crate::types::{GeoPoint, MapRegion, PixelPoint, SafeAreaInsets};

/// Meters spanned by one degree of longitude at the equator.
pub const METERS_PER_DEGREE_LONGITUDE: f64 = 111_320.0;

/// Floor for `cos(latitude)` so scale math stays finite near the poles.
const MIN_COS_LATITUDE: f64 = 0.01;

/// Projects fixes into the pixel space of one [`MapRegion`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoProjector {
    region: MapRegion,
    vertical_scale: f64,
}

impl GeoProjector {
    /// Projector with no safe-area compensation.
    #[must_use]
    pub const fn new(region: MapRegion) -> Self {
        Self {
            region,
            vertical_scale: 1.0,
        }
    }

    /// Projector whose vertical axis is compressed to the area between
    /// the insets.
    #[must_use]
    pub fn with_insets(region: MapRegion, insets: SafeAreaInsets) -> Self {
        Self {
            region,
            vertical_scale: vertical_scale(&region, insets),
        }
    }

    /// The region this projector maps into.
    #[must_use]
    pub const fn region(&self) -> &MapRegion {
        &self.region
    }

    /// Vertical scale factor (1.0 without insets).
    #[must_use]
    pub const fn vertical_scale(&self) -> f64 {
        self.vertical_scale
    }

    /// Project a fix, or `None` if the region or the fix is not finite.
    #[must_use]
    pub fn try_project(&self, point: &GeoPoint) -> Option<PixelPoint> {
        if !self.region.is_usable() || !point.latitude.is_finite() || !point.longitude.is_finite()
        {
            return None;
        }
        let r = &self.region;
        let fx = (point.longitude - r.center_longitude) / r.longitude_delta;
        let fy = (point.latitude - r.center_latitude) / r.latitude_delta;
        let x = r.pixel_width.mul_add(fx, r.pixel_width / 2.0);
        let y = (-r.pixel_height * self.vertical_scale).mul_add(fy, r.pixel_height / 2.0);
        Some(PixelPoint::new(x, y))
    }

    /// Project a fix, falling back to the screen center on bad input.
    #[must_use]
    pub fn project(&self, point: &GeoPoint) -> PixelPoint {
        self.try_project(point).unwrap_or_else(|| {
            warn!(
                latitude = point.latitude,
                longitude = point.longitude,
                region = ?self.region,
                "projection input not finite, using screen center"
            );
            self.region.pixel_center()
        })
    }

    /// Invert [`project`](Self::project): pixel to `(latitude, longitude)`.
    ///
    /// Returns `None` for an unusable region or a non-finite pixel.
    #[must_use]
    pub fn unproject(&self, pixel: PixelPoint) -> Option<(f64, f64)> {
        if !self.region.is_usable() || !pixel.x.is_finite() || !pixel.y.is_finite() {
            return None;
        }
        let r = &self.region;
        let fx = (pixel.x - r.pixel_width / 2.0) / r.pixel_width;
        let fy = (r.pixel_height / 2.0 - pixel.y) / (r.pixel_height * self.vertical_scale);
        Some((
            r.latitude_delta.mul_add(fy, r.center_latitude),
            r.longitude_delta.mul_add(fx, r.center_longitude),
        ))
    }

    /// Screen offset that carries geometry built for this region onto
    /// `live`, assuming both share deltas and pixel dimensions.
    #[must_use]
    pub fn pan_offset(&self, live: &MapRegion) -> (f64, f64) {
        pan_offset(&self.region, live, self.vertical_scale)
    }
}

/// Vertical scale factor for the given safe-area insets.
///
/// `(pixel_height - top - bottom) / pixel_height`; `1.0` when the insets
/// are zero or leave no usable height.
#[must_use]
pub fn vertical_scale(region: &MapRegion, insets: SafeAreaInsets) -> f64 {
    if insets.top == 0.0 && insets.bottom == 0.0 {
        return 1.0;
    }
    let height = region.pixel_height;
    let usable = height - insets.top - insets.bottom;
    if !(height.is_finite() && height > 0.0 && usable.is_finite() && usable > 0.0) {
        warn!(?insets, height, "degenerate safe-area insets, ignoring");
        return 1.0;
    }
    usable / height
}

/// Project a fix against `region` with no inset compensation.
///
/// Projecting the region's own center returns exactly
/// `(pixel_width / 2, pixel_height / 2)`.
#[must_use]
pub fn project_to_pixel(point: &GeoPoint, region: &MapRegion) -> PixelPoint {
    GeoProjector::new(*region).project(point)
}

/// Translation `(dx, dy)` that maps pixels projected against `from` onto
/// pixels projected against `to`, using `from`'s deltas and dimensions.
///
/// Exact when the regions differ only by center.
#[must_use]
pub fn pan_offset(from: &MapRegion, to: &MapRegion, vertical_scale: f64) -> (f64, f64) {
    let dx = (from.center_longitude - to.center_longitude) / from.longitude_delta
        * from.pixel_width;
    let dy = (to.center_latitude - from.center_latitude) / from.latitude_delta
        * from.pixel_height
        * vertical_scale;
    (dx, dy)
}

/// Ground meters covered by one horizontal pixel at the region center.
///
/// Returns `1.0` if the latitude, longitude delta, or width is not finite,
/// or if the delta or width is not positive.
#[must_use]
pub fn meters_per_pixel(region: &MapRegion) -> f64 {
    let latitude = region.center_latitude;
    let delta = region.longitude_delta;
    let width = region.pixel_width;
    if !(latitude.is_finite() && delta.is_finite() && width.is_finite())
        || width <= 0.0
        || delta <= 0.0
    {
        warn!(latitude, delta, width, "invalid region for meters per pixel, using 1.0");
        return 1.0;
    }
    let cos_latitude = latitude.to_radians().cos().max(MIN_COS_LATITUDE);
    delta * METERS_PER_DEGREE_LONGITUDE * cos_latitude / width
}

/// Convert a ground distance to on-screen pixels at the region center.
///
/// Returns `0.0` for non-finite, zero, or negative `meters`, and when the
/// scale itself comes out non-finite or non-positive.
#[must_use]
pub fn meters_to_pixels(meters: f64, region: &MapRegion) -> f64 {
    if !meters.is_finite() || meters <= 0.0 {
        return 0.0;
    }
    let scale = meters_per_pixel(region);
    if !scale.is_finite() || scale <= 0.0 {
        return 0.0;
    }
    meters / scale
}
