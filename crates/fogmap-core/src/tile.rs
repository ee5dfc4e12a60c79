//! Web-Mercator slippy-map tile math.
//!
//! Standalone utility: the reveal pipeline never calls into it. Tile
//! overlays use it to decide which `z/x/y` tiles a camera needs.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{FogError, MapRegion};

/// Latitude limit of the Web-Mercator square.
pub const MAX_MERCATOR_LATITUDE: f64 = 85.0511;

/// Highest zoom for which tile indices fit in a `u32`.
pub const MAX_TILE_ZOOM: u8 = 30;

/// Zoom range returned by [`region_to_zoom`].
pub const MAX_REGION_ZOOM: u8 = 20;

/// A slippy-map tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoordinate {
    /// Zoom level.
    pub z: u8,
    /// Column, west to east.
    pub x: u32,
    /// Row, north to south.
    pub y: u32,
}

impl TileCoordinate {
    /// Create a tile, checking `x, y < 2^z` and `z <= 30`.
    ///
    /// # Errors
    ///
    /// Returns [`FogError::InvalidTile`] when the address is outside the
    /// grid.
    pub fn new(z: u8, x: u32, y: u32) -> Result<Self, FogError> {
        if z > MAX_TILE_ZOOM
            || u64::from(x) >= tiles_per_axis(z)
            || u64::from(y) >= tiles_per_axis(z)
        {
            return Err(FogError::InvalidTile { z, x, y });
        }
        Ok(Self { z, x, y })
    }

    /// Geographic bounds of this tile.
    #[must_use]
    pub fn bounds(&self) -> TileBounds {
        tile_bounds(self)
    }
}

impl std::fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Geographic bounds of a tile, degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileBounds {
    /// Northern edge.
    pub north: f64,
    /// Southern edge.
    pub south: f64,
    /// Eastern edge.
    pub east: f64,
    /// Western edge.
    pub west: f64,
}

impl TileBounds {
    /// Returns `true` if the coordinate lies inside or on the tile edge.
    #[must_use]
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.south..=self.north).contains(&latitude)
            && (self.west..=self.east).contains(&longitude)
    }
}

/// The tile containing `(latitude, longitude)` at `zoom`.
///
/// Latitude is clamped to the Mercator limit, longitude normalized to
/// `[-180, 180)`, and zoom clamped to [`MAX_TILE_ZOOM`]. Non-finite
/// coordinates map to tile `0/0` of the zoom with a warning.
#[must_use]
pub fn lat_lon_to_tile(latitude: f64, longitude: f64, zoom: u8) -> TileCoordinate {
    let z = zoom.min(MAX_TILE_ZOOM);
    if !latitude.is_finite() || !longitude.is_finite() {
        warn!(latitude, longitude, zoom, "non-finite tile lookup, using origin tile");
        return TileCoordinate { z, x: 0, y: 0 };
    }
    let (x, y) = tile_xy(latitude, normalize_longitude(longitude), z);
    TileCoordinate { z, x, y }
}

/// Inverse of [`lat_lon_to_tile`]: the tile's edges in degrees.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn tile_bounds(tile: &TileCoordinate) -> TileBounds {
    let n = tiles_per_axis(tile.z) as f64;
    let lon_at = |x: f64| x / n * 360.0 - 180.0;
    let lat_at = |y: f64| (PI * 2.0f64.mul_add(-y / n, 1.0)).sinh().atan().to_degrees();
    let x = f64::from(tile.x);
    let y = f64::from(tile.y);
    TileBounds {
        north: lat_at(y),
        south: lat_at(y + 1.0),
        east: lon_at(x + 1.0),
        west: lon_at(x),
    }
}

/// Approximate tile zoom for a camera spanning `latitude_delta` degrees.
///
/// `round(log2(360 / latitude_delta))`, clamped to `0..=20`. Returns `0`
/// for a non-finite or non-positive delta.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn region_to_zoom(latitude_delta: f64) -> u8 {
    if !(latitude_delta.is_finite() && latitude_delta > 0.0) {
        return 0;
    }
    let zoom = (360.0 / latitude_delta).log2().round();
    zoom.clamp(0.0, f64::from(MAX_REGION_ZOOM)) as u8
}

/// Every tile at `zoom` whose bounds intersect `region`, row-major.
///
/// The region is not wrapped across the antimeridian; its longitudes are
/// clamped to the map edge. An unusable region covers nothing.
#[must_use]
pub fn tiles_for_region(region: &MapRegion, zoom: u8) -> Vec<TileCoordinate> {
    if !region.is_usable() {
        return Vec::new();
    }
    let z = zoom.min(MAX_TILE_ZOOM);
    let bounds = region.bounds(0.0);
    let (x0, y0) = tile_xy(bounds.north, bounds.west, z);
    let (x1, y1) = tile_xy(bounds.south, bounds.east, z);
    (y0..=y1)
        .flat_map(|y| (x0..=x1).map(move |x| TileCoordinate { z, x, y }))
        .collect()
}

/// The `(2 * padding + 1)^2` neighborhood around the tile containing a
/// point, clipped to the grid, row-major.
#[must_use]
pub fn tiles_around(latitude: f64, longitude: f64, zoom: u8, padding: u32) -> Vec<TileCoordinate> {
    let center = lat_lon_to_tile(latitude, longitude, zoom);
    let last = max_index(center.z);
    let xs = center.x.saturating_sub(padding)..=center.x.saturating_add(padding).min(last);
    let ys = center.y.saturating_sub(padding)..=center.y.saturating_add(padding).min(last);
    ys.flat_map(|y| {
        xs.clone().map(move |x| TileCoordinate {
            z: center.z,
            x,
            y,
        })
    })
    .collect()
}

const fn tiles_per_axis(z: u8) -> u64 {
    1u64 << z
}

#[allow(clippy::cast_possible_truncation)]
const fn max_index(z: u8) -> u32 {
    (tiles_per_axis(z) - 1) as u32
}

fn normalize_longitude(longitude: f64) -> f64 {
    (longitude + 180.0).rem_euclid(360.0) - 180.0
}

/// Tile indices for a finite coordinate, clamping latitude and
/// longitude to the map and the result to the grid.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn tile_xy(latitude: f64, longitude: f64, z: u8) -> (u32, u32) {
    let n = tiles_per_axis(z) as f64;
    let last = f64::from(max_index(z));
    let lat = latitude.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);
    let lon = longitude.clamp(-180.0, 180.0);

    let x = ((lon + 180.0) / 360.0 * n).floor();
    let lat_rad = lat.to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor();
    (x.clamp(0.0, last) as u32, y.clamp(0.0, last) as u32)
}
