//! Stable compute region: avoid rebuilding geometry on every pan tick.
//!
//! Geometry is built against a cached [`MapRegion`] snapshot (the
//! *compute region*) rather than the live camera. Within one region the
//! projection is affine, so while the camera only pans at a fixed zoom
//! the old geometry is exactly correct after a translation. The cache
//! is replaced only when:
//!
//! - the pixel dimensions change (rotation, resize),
//! - either delta changes by more than the zoom threshold,
//! - the ground scale at the live center (metres per pixel, which follows
//!   the cosine of the latitude) drifts by more than the zoom threshold,
//!   so a translated frame's reveal radius stays within that bound, or
//! - the pan has used up more than `pan_fraction` of the overscan on
//!   either axis, so fixes outside the culled working set could come into
//!   view.
//!
//! Everything else is an O(1) translate.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::projection::{meters_per_pixel, pan_offset, vertical_scale};
use crate::types::{FogConfig, MapRegion, SafeAreaInsets};

/// Why the compute region was replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecomputeReason {
    /// No compute region existed yet.
    Initial,
    /// Pixel dimensions changed.
    Resized,
    /// A delta changed beyond the zoom threshold.
    ZoomChanged,
    /// A latitude pan moved the ground scale beyond the zoom threshold.
    ScaleChanged,
    /// The pan consumed too much of the overscan margin.
    PanExceeded,
    /// The path changed and the geometry must include new fixes.
    PathChanged,
    /// The caller invalidated the cached geometry.
    Forced,
}

impl std::fmt::Display for RecomputeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Initial => "initial",
            Self::Resized => "resized",
            Self::ZoomChanged => "zoom changed",
            Self::ScaleChanged => "ground scale changed",
            Self::PanExceeded => "pan exceeded overscan",
            Self::PathChanged => "path changed",
            Self::Forced => "forced",
        };
        f.write_str(name)
    }
}

/// Outcome of evaluating a live camera region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionDecision {
    /// Rebuild everything against the live region.
    Recompute(RecomputeReason),
    /// Reuse the last geometry, shifted by `(dx, dy)` pixels.
    Translate {
        /// Horizontal shift in pixels.
        dx: f64,
        /// Vertical shift in pixels.
        dy: f64,
    },
    /// The live region is unusable; leave everything as it is.
    Skip,
}

/// Thresholds controlling when the compute region is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityThresholds {
    /// Relative delta (or ground scale) change that forces a recompute.
    pub zoom_threshold: f64,
    /// Fraction of the overscan a pan may consume.
    pub pan_fraction: f64,
    /// Overscan margin the working set was culled with.
    pub overscan: f64,
}

impl StabilityThresholds {
    /// Thresholds taken from a [`FogConfig`].
    #[must_use]
    pub const fn from_config(config: &FogConfig) -> Self {
        Self {
            zoom_threshold: config.zoom_threshold,
            pan_fraction: config.pan_fraction,
            overscan: config.overscan,
        }
    }
}

impl Default for StabilityThresholds {
    fn default() -> Self {
        Self::from_config(&FogConfig::default())
    }
}

/// Owner of the cached compute region.
#[derive(Debug, Clone, PartialEq)]
pub struct StableComputeRegion {
    thresholds: StabilityThresholds,
    insets: SafeAreaInsets,
    compute: Option<MapRegion>,
}

impl StableComputeRegion {
    /// Empty state; the first usable region always recomputes.
    #[must_use]
    pub const fn new(thresholds: StabilityThresholds, insets: SafeAreaInsets) -> Self {
        Self {
            thresholds,
            insets,
            compute: None,
        }
    }

    /// The region the current geometry was built against.
    #[must_use]
    pub const fn compute_region(&self) -> Option<&MapRegion> {
        self.compute.as_ref()
    }

    /// Decide what `live` requires without changing state.
    #[must_use]
    pub fn evaluate(&self, live: &MapRegion) -> RegionDecision {
        if !live.is_usable() {
            return RegionDecision::Skip;
        }
        let Some(compute) = self.compute.as_ref() else {
            return RegionDecision::Recompute(RecomputeReason::Initial);
        };

        if !compute.same_dimensions(live) {
            return RegionDecision::Recompute(RecomputeReason::Resized);
        }

        let t = &self.thresholds;
        let zoom_lat = relative_change(compute.latitude_delta, live.latitude_delta);
        let zoom_lon = relative_change(compute.longitude_delta, live.longitude_delta);
        if zoom_lat > t.zoom_threshold || zoom_lon > t.zoom_threshold {
            return RegionDecision::Recompute(RecomputeReason::ZoomChanged);
        }
        let drift = relative_change(meters_per_pixel(compute), meters_per_pixel(live));
        if drift > t.zoom_threshold {
            return RegionDecision::Recompute(RecomputeReason::ScaleChanged);
        }

        let budget = t.pan_fraction * t.overscan;
        let pan_lat = (live.center_latitude - compute.center_latitude).abs();
        let pan_lon = (live.center_longitude - compute.center_longitude).abs();
        if pan_lat > budget * compute.latitude_delta || pan_lon > budget * compute.longitude_delta {
            return RegionDecision::Recompute(RecomputeReason::PanExceeded);
        }

        let (dx, dy) = pan_offset(compute, live, vertical_scale(compute, self.insets));
        RegionDecision::Translate { dx, dy }
    }

    /// Evaluate `live` and, on recompute, adopt it as the compute region.
    pub fn update(&mut self, live: &MapRegion) -> RegionDecision {
        let decision = self.evaluate(live);
        match decision {
            RegionDecision::Recompute(reason) => {
                debug!(%reason, ?live, "replacing compute region");
                self.compute = Some(*live);
            }
            RegionDecision::Skip => {
                warn!(?live, "ignoring unusable camera region");
            }
            RegionDecision::Translate { .. } => {}
        }
        decision
    }

    /// Adopt `live` unconditionally, reporting `reason`.
    ///
    /// Returns [`RegionDecision::Skip`] and keeps the old region if
    /// `live` is unusable.
    pub fn force(&mut self, live: &MapRegion, reason: RecomputeReason) -> RegionDecision {
        if !live.is_usable() {
            warn!(?live, "ignoring unusable camera region");
            return RegionDecision::Skip;
        }
        debug!(%reason, ?live, "replacing compute region");
        self.compute = Some(*live);
        RegionDecision::Recompute(reason)
    }

    /// Drop the compute region so the next update recomputes.
    pub fn invalidate(&mut self) {
        self.compute = None;
    }
}

/// `|new - old| / old`, infinite when `old` is not positive.
fn relative_change(old: f64, new: f64) -> f64 {
    if old > 0.0 {
        ((new - old) / old).abs()
    } else {
        f64::INFINITY
    }
}
