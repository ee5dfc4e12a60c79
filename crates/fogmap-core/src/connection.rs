//! Connection filtering: decide which consecutive fixes are joined.
//!
//! A GPS dropout, an app restart, or a manual location jump shows up as
//! two consecutive fixes far apart. Stroking between them would draw a
//! straight "wormhole" across unexplored map, so such pairs are marked
//! disconnected and split the path into separate [`Chain`]s.

use serde::{Deserialize, Serialize};

use crate::types::{Chain, FogConfig, GeoPoint, Segment};

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Great-circle distance between two fixes in meters.
#[must_use]
pub fn haversine_meters(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let sin_lat = (d_lat / 2.0).sin();
    let sin_lon = (d_lon / 2.0).sin();
    let h = (lat_a.cos() * lat_b.cos()).mul_add(sin_lon * sin_lon, sin_lat * sin_lat);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Classifies consecutive fixes as connected or teleports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectionFilter {
    /// Pairs farther apart than this are teleports.
    pub max_segment_meters: f64,
    /// Pairs further apart in time than this are teleports, when set.
    pub max_time_gap_ms: Option<i64>,
}

impl ConnectionFilter {
    /// Filter with a distance threshold only.
    #[must_use]
    pub const fn new(max_segment_meters: f64) -> Self {
        Self {
            max_segment_meters,
            max_time_gap_ms: None,
        }
    }

    /// Filter configured from a [`FogConfig`].
    #[must_use]
    pub const fn from_config(config: &FogConfig) -> Self {
        Self {
            max_segment_meters: config.max_segment_meters,
            max_time_gap_ms: config.max_time_gap_ms,
        }
    }

    /// Returns `true` if a stroke may be drawn from `a` to `b`.
    ///
    /// The boundary is inclusive: a pair exactly at the threshold is
    /// connected. A non-finite distance is never connected.
    #[must_use]
    pub fn is_connected(&self, a: &GeoPoint, b: &GeoPoint) -> bool {
        let distance = haversine_meters(a, b);
        if !distance.is_finite() || distance > self.max_segment_meters {
            return false;
        }
        self.max_time_gap_ms
            .is_none_or(|gap| b.timestamp.abs_diff(a.timestamp) <= gap.unsigned_abs())
    }

    /// Tag every consecutive pair of `path`.
    ///
    /// Returns `path.len() - 1` segments (none for fewer than 2 fixes).
    #[must_use = "returns the classified segments"]
    pub fn classify(&self, path: &[GeoPoint]) -> Vec<Segment> {
        path.windows(2)
            .map(|w| Segment {
                start: w[0],
                end: w[1],
                connected: self.is_connected(&w[0], &w[1]),
            })
            .collect()
    }

    /// Split `path` into maximal runs of connected fixes.
    ///
    /// Every fix lands in exactly one chain, so an isolated fix between
    /// two teleports becomes a single-point chain.
    #[must_use = "returns the extracted chains"]
    pub fn chains(&self, path: &[GeoPoint]) -> Vec<Chain> {
        chains_from_segments(path, &self.classify(path))
    }
}

/// Group fixes into chains using pre-classified segments.
///
/// `segments` must be the output of [`ConnectionFilter::classify`] for
/// the same `path`.
#[must_use = "returns the extracted chains"]
pub fn chains_from_segments(path: &[GeoPoint], segments: &[Segment]) -> Vec<Chain> {
    let Some(first) = path.first() else {
        return Vec::new();
    };

    let mut chains = Vec::new();
    let mut current = vec![*first];
    for segment in segments {
        if !segment.connected {
            chains.push(Chain::new(std::mem::take(&mut current)));
        }
        current.push(segment.end);
    }
    chains.push(Chain::new(current));
    chains
}
