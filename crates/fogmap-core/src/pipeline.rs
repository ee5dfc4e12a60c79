//! The reveal pipeline and its context object.
//!
//! [`build_reveal`] is the stateless full recompute:
//!
//! 1. Connection filtering splits the path into chains at teleports.
//! 2. Chains are culled to the region plus overscan.
//! 3. Fixes closer than the minimum pixel gap are dropped.
//! 4. The per-frame cap drops the oldest survivors.
//! 5. Survivors are projected into the region's pixel space.
//! 6. Each chain is simplified with a radius-derived tolerance.
//! 7. Discs and strokes (or rings) are assembled.
//!
//! Culling runs before projection and simplification so their cost
//! scales with what is on screen rather than with the whole history.
//!
//! [`FogPipeline`] wraps it with the authoritative [`Path`], the
//! [`StableComputeRegion`] and the [`GenerationSlot`] holding the built
//! geometry. It has no global state; construct as many as needed.

use std::time::Duration;

use tracing::{debug, warn};
use web_time::Instant;

use crate::connection::{ConnectionFilter, chains_from_segments};
use crate::cull::{cap_chains, cull_chains, reduce_density_with};
use crate::diagnostics::{
    FrameDiagnostics, FrameSummary, StageDiagnostics, StageMetrics, chain_points, reduction_ratio,
    total_points,
};
use crate::generation::{Generation, GenerationSlot};
use crate::projection::{GeoProjector, meters_per_pixel, meters_to_pixels};
use crate::reveal::{RevealGeometry, RevealGeometryBuilder};
use crate::simplify::simplify_chains;
use crate::stable_region::{
    RecomputeReason, RegionDecision, StabilityThresholds, StableComputeRegion,
};
use crate::types::{Chain, FogConfig, FogError, GeoPoint, MapRegion, Path};

/// What a camera or path trigger did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Frame {
    /// New geometry was committed.
    Rebuilt {
        /// Generation id of the committed geometry.
        generation: u64,
        /// Why it was rebuilt.
        reason: RecomputeReason,
    },
    /// The current geometry is still valid once shifted by `(dx, dy)`.
    Translated {
        /// Horizontal shift in pixels.
        dx: f64,
        /// Vertical shift in pixels.
        dy: f64,
    },
    /// No usable region; the previous geometry (if any) stands.
    Skipped,
}

/// Run a full recompute of `points` against `region` with no caching.
#[must_use]
pub fn build_reveal(
    points: &[GeoPoint],
    region: &MapRegion,
    config: &FogConfig,
) -> (RevealGeometry, FrameDiagnostics) {
    let start = Instant::now();

    // 1. Connection filtering.
    let filter = ConnectionFilter::from_config(config);
    let ((chains, teleport_count), connection_time) = timed(|| {
        let segments = filter.classify(points);
        let teleports = segments.iter().filter(|s| !s.connected).count();
        (chains_from_segments(points, &segments), teleports)
    });
    let connection = StageDiagnostics {
        duration: connection_time,
        metrics: StageMetrics::Connection {
            input_points: points.len(),
            teleport_count,
            chain_count: chains.len(),
        },
    };

    // 2. Viewport culling.
    let (culled, cull_time) = timed(|| cull_chains(&chains, region, config.overscan));
    let culled_points = chain_points(&culled);
    let cull = StageDiagnostics {
        duration: cull_time,
        metrics: StageMetrics::Cull {
            overscan: config.overscan,
            chains_before: chains.len(),
            chains_after: culled.len(),
            points_before: points.len(),
            points_after: culled_points,
        },
    };

    // 3. Density reduction.
    let projector = GeoProjector::with_insets(*region, config.safe_area);
    let (thinned, density_time) = timed(|| {
        culled
            .iter()
            .map(|c| Chain::new(reduce_density_with(c.points(), &projector, config.min_pixel_gap)))
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
    });
    let density = StageDiagnostics {
        duration: density_time,
        metrics: StageMetrics::Density {
            min_pixel_gap: config.min_pixel_gap,
            points_before: culled_points,
            points_after: chain_points(&thinned),
        },
    };

    // 4. Point cap.
    let ((capped, points_dropped), cap_time) =
        timed(|| cap_chains(thinned, config.max_points_per_frame));
    if points_dropped > 0 {
        warn!(
            points_dropped,
            max = config.max_points_per_frame,
            "per-frame point cap reached, dropping oldest fixes"
        );
    }
    let cap = StageDiagnostics {
        duration: cap_time,
        metrics: StageMetrics::Cap {
            max_points: config.max_points_per_frame,
            points_dropped,
        },
    };

    // 5. Projection.
    let builder = RevealGeometryBuilder::from_config(config);
    let radius_px = meters_to_pixels(config.reveal_radius_meters, region);
    let (projected, projection_time) = timed(|| builder.project_chains(&capped, region));
    let projected_points = total_points(&projected);
    let projection = StageDiagnostics {
        duration: projection_time,
        metrics: StageMetrics::Projection {
            radius_px,
            meters_per_pixel: meters_per_pixel(region),
            polyline_count: projected.len(),
            point_count: projected_points,
        },
    };

    // 6. Simplification.
    let tolerance = builder.tolerance(radius_px);
    let (simplified, simplify_time) = timed(|| simplify_chains(&projected, tolerance));
    let simplified_points = total_points(&simplified);
    let simplification = StageDiagnostics {
        duration: simplify_time,
        metrics: StageMetrics::Simplification {
            tolerance,
            points_before: projected_points,
            points_after: simplified_points,
            reduction_ratio: reduction_ratio(projected_points, simplified_points),
        },
    };

    // 7. Assembly.
    let (geometry, assembly_time) =
        timed(|| builder.assemble(&projected, simplified, radius_px, region));
    let vertex_count = geometry.vertex_count();
    let assembly = StageDiagnostics {
        duration: assembly_time,
        metrics: StageMetrics::Assembly {
            style: geometry.style(),
            vertex_count,
        },
    };

    let diagnostics = FrameDiagnostics {
        reason: None,
        connection,
        cull,
        density,
        cap,
        projection,
        simplification,
        assembly,
        total_duration: start.elapsed(),
        summary: FrameSummary {
            path_points: points.len(),
            rendered_points: projected_points,
            chain_count: projected.len(),
            vertex_count,
        },
    };
    debug!(
        path_points = points.len(),
        rendered_points = projected_points,
        vertex_count,
        "reveal geometry built"
    );
    (geometry, diagnostics)
}

/// Explicit pipeline context: path, compute region and geometry.
///
/// Camera updates and new fixes are both "maybe recompute" triggers:
/// call [`update_region`](Self::update_region) on every camera tick and
/// [`refresh`](Self::refresh) after recording fixes. After presenting a
/// [`Frame::Rebuilt`] generation, call
/// [`release_retired`](Self::release_retired) to free its predecessor.
#[derive(Debug)]
pub struct FogPipeline {
    config: FogConfig,
    path: Path,
    stable: StableComputeRegion,
    live: Option<MapRegion>,
    built_revision: Option<u64>,
    force_rebuild: bool,
    geometry: GenerationSlot<RevealGeometry>,
    diagnostics: Option<FrameDiagnostics>,
}

impl FogPipeline {
    /// Create a pipeline with an empty path.
    ///
    /// # Errors
    ///
    /// Returns [`FogError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: FogConfig) -> Result<Self, FogError> {
        config.validate()?;
        let stable = StableComputeRegion::new(
            StabilityThresholds::from_config(&config),
            config.safe_area,
        );
        Ok(Self {
            config,
            path: Path::new(),
            stable,
            live: None,
            built_revision: None,
            force_rebuild: false,
            geometry: GenerationSlot::new(),
            diagnostics: None,
        })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &FogConfig {
        &self.config
    }

    /// The authoritative path.
    #[must_use]
    pub const fn path(&self) -> &Path {
        &self.path
    }

    /// Append a fix from the location source.
    ///
    /// # Errors
    ///
    /// Returns [`FogError::InvalidPoint`] for out-of-range or non-finite
    /// fixes, and [`FogError::InaccurateFix`] when the fix reports an
    /// accuracy worse than `max_fix_accuracy_meters`.
    pub fn record_fix(&mut self, fix: GeoPoint) -> Result<(), FogError> {
        let fix = fix.validate()?;
        if let Some(limit) = self.config.max_fix_accuracy_meters
            && let Some(accuracy) = fix.accuracy
            && accuracy > limit
        {
            return Err(FogError::InaccurateFix { accuracy, limit });
        }
        self.path.push(fix)
    }

    /// Replace the whole path, skipping invalid fixes.
    ///
    /// Returns the number of fixes skipped.
    pub fn replace_path(&mut self, points: impl IntoIterator<Item = GeoPoint>) -> usize {
        let skipped = self.path.replace(points);
        if skipped > 0 {
            warn!(skipped, "invalid fixes skipped while replacing path");
        }
        skipped
    }

    /// Insert older history before the current path, skipping invalid
    /// fixes. Returns the number skipped.
    pub fn prepend_path(&mut self, points: impl IntoIterator<Item = GeoPoint>) -> usize {
        let skipped = self.path.prepend(points);
        if skipped > 0 {
            warn!(skipped, "invalid fixes skipped while prepending history");
        }
        skipped
    }

    /// Camera trigger: evaluate a new live region.
    pub fn update_region(&mut self, region: MapRegion) -> Frame {
        let decision = self.stable.update(&region);
        match decision {
            RegionDecision::Skip => Frame::Skipped,
            RegionDecision::Recompute(reason) => {
                self.live = Some(region);
                self.rebuild(region, reason)
            }
            RegionDecision::Translate { dx, dy } => {
                self.live = Some(region);
                let reason = if self.force_rebuild {
                    Some(RecomputeReason::Forced)
                } else if self.built_revision != Some(self.path.revision()) {
                    Some(RecomputeReason::PathChanged)
                } else {
                    None
                };
                match reason {
                    Some(reason) => match self.stable.force(&region, reason) {
                        RegionDecision::Recompute(reason) => self.rebuild(region, reason),
                        _ => Frame::Skipped,
                    },
                    None => Frame::Translated { dx, dy },
                }
            }
        }
    }

    /// Path trigger: re-evaluate the last live region.
    ///
    /// Returns [`Frame::Skipped`] if no usable region has been seen yet.
    pub fn refresh(&mut self) -> Frame {
        match self.live {
            Some(live) => self.update_region(live),
            None => Frame::Skipped,
        }
    }

    /// Force the next trigger to rebuild.
    pub fn invalidate(&mut self) {
        self.force_rebuild = true;
    }

    /// The region the current geometry was built against.
    #[must_use]
    pub const fn compute_region(&self) -> Option<&MapRegion> {
        self.stable.compute_region()
    }

    /// The last committed geometry.
    #[must_use]
    pub const fn current(&self) -> Option<&Generation<RevealGeometry>> {
        self.geometry.current()
    }

    /// Free the geometry retired by the last rebuild, returning its id.
    pub fn release_retired(&mut self) -> Option<u64> {
        self.geometry.release_retired()
    }

    /// Diagnostics from the last rebuild.
    #[must_use]
    pub const fn last_diagnostics(&self) -> Option<&FrameDiagnostics> {
        self.diagnostics.as_ref()
    }

    fn rebuild(&mut self, region: MapRegion, reason: RecomputeReason) -> Frame {
        let (geometry, mut diagnostics) = build_reveal(self.path.points(), &region, &self.config);
        diagnostics.reason = Some(reason);
        let generation = self.geometry.commit(geometry);
        debug!(
            generation,
            %reason,
            duration_ms = diagnostics.total_duration.as_secs_f64() * 1000.0,
            "committed reveal geometry"
        );
        self.diagnostics = Some(diagnostics);
        self.built_revision = Some(self.path.revision());
        self.force_rebuild = false;
        Frame::Rebuilt { generation, reason }
    }
}

fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let out = f();
    (out, start.elapsed())
}
