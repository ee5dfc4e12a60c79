//! Frame diagnostics: timing and counts for each recompute stage.
//!
//! Permanent instrumentation for tuning the culling and simplification
//! parameters. Every full recompute, whether through
//! [`FogPipeline`](crate::FogPipeline) or
//! [`build_reveal`](crate::build_reveal), collects one
//! [`FrameDiagnostics`] alongside the geometry. Translate-only frames
//! cost nothing and record nothing.
//!
//! Timestamps are captured with `web-time`, which uses
//! `performance.now()` on WASM and `std::time::Instant` on native.
//! Durations are serialized as fractional seconds (`f64`), since
//! `std::time::Duration` does not implement serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::stable_region::RecomputeReason;
use crate::types::{Chain, GeometryStyle, Polyline};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from one full recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDiagnostics {
    /// Why the recompute ran; `None` for a standalone
    /// [`build_reveal`](crate::build_reveal) call.
    pub reason: Option<RecomputeReason>,
    /// Teleport detection and chain extraction.
    pub connection: StageDiagnostics,
    /// Viewport culling.
    pub cull: StageDiagnostics,
    /// Pixel-gap density reduction.
    pub density: StageDiagnostics,
    /// Per-frame point cap.
    pub cap: StageDiagnostics,
    /// Projection into compute-region pixels.
    pub projection: StageDiagnostics,
    /// Per-chain simplification.
    pub simplification: StageDiagnostics,
    /// Geometry assembly.
    pub assembly: StageDiagnostics,
    /// Total wall-clock duration of the recompute (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: FrameSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Connection filtering.
    Connection {
        /// Fixes in the path snapshot.
        input_points: usize,
        /// Consecutive pairs marked as teleports.
        teleport_count: usize,
        /// Chains extracted.
        chain_count: usize,
    },
    /// Viewport culling.
    Cull {
        /// Overscan fraction used.
        overscan: f64,
        /// Chains before culling.
        chains_before: usize,
        /// Chains after culling (may increase due to splits).
        chains_after: usize,
        /// Fixes before culling.
        points_before: usize,
        /// Fixes after culling.
        points_after: usize,
    },
    /// Density reduction.
    Density {
        /// Minimum pixel gap.
        min_pixel_gap: f64,
        /// Fixes before reduction.
        points_before: usize,
        /// Fixes after reduction.
        points_after: usize,
    },
    /// Point cap.
    Cap {
        /// Configured maximum.
        max_points: usize,
        /// Oldest fixes dropped from this frame.
        points_dropped: usize,
    },
    /// Projection.
    Projection {
        /// Reveal radius in pixels.
        radius_px: f64,
        /// Ground meters per horizontal pixel.
        meters_per_pixel: f64,
        /// Projected polylines.
        polyline_count: usize,
        /// Projected points.
        point_count: usize,
    },
    /// Simplification.
    Simplification {
        /// Tolerance in pixels.
        tolerance: f64,
        /// Total points before simplification.
        points_before: usize,
        /// Total points after simplification.
        points_after: usize,
        /// Reduction ratio: `1.0 - (after / before)`.
        reduction_ratio: f64,
    },
    /// Assembly.
    Assembly {
        /// Which variant was built.
        style: GeometryStyle,
        /// Vertices handed to the compositor.
        vertex_count: usize,
    },
}

/// High-level summary counts for one recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSummary {
    /// Fixes in the authoritative path.
    pub path_points: usize,
    /// Fixes that reached the geometry (one disc each).
    pub rendered_points: usize,
    /// Chains that reached the geometry.
    pub chain_count: usize,
    /// Vertices in the final geometry.
    pub vertex_count: usize,
}

impl FrameDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Frame Diagnostics Report\n{}", "=".repeat(60)));
        let reason = self
            .reason
            .map_or_else(|| "standalone".to_string(), |r| r.to_string());
        lines.push(format!("Recompute reason: {reason}"));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Connection", &self.connection),
            ("Cull", &self.cull),
            ("Density", &self.density),
            ("Cap", &self.cap),
            ("Projection", &self.projection),
            ("Simplification", &self.simplification),
            ("Assembly", &self.assembly),
        ];
        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Path: {}  |  Rendered: {}  |  Chains: {}  |  Vertices: {}",
            self.summary.path_points,
            self.summary.rendered_points,
            self.summary.chain_count,
            self.summary.vertex_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Connection {
            input_points,
            teleport_count,
            chain_count,
        } => format!("{input_points} pts, {teleport_count} teleports -> {chain_count} chains"),
        StageMetrics::Cull {
            overscan,
            chains_before,
            chains_after,
            points_before,
            points_after,
        } => format!(
            "overscan={overscan:.2} chains={chains_before}->{chains_after} pts={points_before}->{points_after}",
        ),
        StageMetrics::Density {
            min_pixel_gap,
            points_before,
            points_after,
        } => format!("gap={min_pixel_gap:.1}px {points_before}->{points_after} pts"),
        StageMetrics::Cap {
            max_points,
            points_dropped,
        } => format!("max={max_points} dropped={points_dropped}"),
        StageMetrics::Projection {
            radius_px,
            meters_per_pixel,
            polyline_count,
            point_count,
        } => format!(
            "r={radius_px:.1}px {meters_per_pixel:.3}m/px {polyline_count} polys, {point_count} pts",
        ),
        StageMetrics::Simplification {
            tolerance,
            points_before,
            points_after,
            reduction_ratio,
        } => format!(
            "tol={tolerance:.2} {points_before}->{points_after} pts ({:.1}% reduction)",
            reduction_ratio * 100.0,
        ),
        StageMetrics::Assembly {
            style,
            vertex_count,
        } => format!("{style:?} {vertex_count} vertices"),
    }
}

/// Total fixes across a slice of chains.
pub(crate) fn chain_points(chains: &[Chain]) -> usize {
    chains.iter().map(Chain::len).sum()
}

/// Total points across a slice of polylines.
pub(crate) fn total_points(polylines: &[Polyline]) -> usize {
    polylines.iter().map(Polyline::len).sum()
}

/// `1.0 - after / before`, or `0.0` when `before` is zero.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn reduction_ratio(before: usize, after: usize) -> f64 {
    if before == 0 {
        0.0
    } else {
        1.0 - after as f64 / before as f64
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{GeoPoint, PixelPoint};

    fn stage(ms: u64, metrics: StageMetrics) -> StageDiagnostics {
        StageDiagnostics {
            duration: Duration::from_millis(ms),
            metrics,
        }
    }

    fn sample() -> FrameDiagnostics {
        FrameDiagnostics {
            reason: Some(RecomputeReason::PanExceeded),
            connection: stage(
                1,
                StageMetrics::Connection {
                    input_points: 1000,
                    teleport_count: 2,
                    chain_count: 3,
                },
            ),
            cull: stage(
                2,
                StageMetrics::Cull {
                    overscan: 0.5,
                    chains_before: 3,
                    chains_after: 4,
                    points_before: 1000,
                    points_after: 400,
                },
            ),
            density: stage(
                1,
                StageMetrics::Density {
                    min_pixel_gap: 5.0,
                    points_before: 400,
                    points_after: 120,
                },
            ),
            cap: stage(
                0,
                StageMetrics::Cap {
                    max_points: 5000,
                    points_dropped: 0,
                },
            ),
            projection: stage(
                1,
                StageMetrics::Projection {
                    radius_px: 12.5,
                    meters_per_pixel: 4.0,
                    polyline_count: 4,
                    point_count: 120,
                },
            ),
            simplification: stage(
                1,
                StageMetrics::Simplification {
                    tolerance: 1.875,
                    points_before: 120,
                    points_after: 60,
                    reduction_ratio: 0.5,
                },
            ),
            assembly: stage(
                1,
                StageMetrics::Assembly {
                    style: GeometryStyle::Strokes,
                    vertex_count: 180,
                },
            ),
            total_duration: Duration::from_millis(7),
            summary: FrameSummary {
                path_points: 1000,
                rendered_points: 120,
                chain_count: 4,
                vertex_count: 180,
            },
        }
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let ms = duration_ms(Duration::from_millis(1234));
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn report_names_every_stage() {
        let report = sample().report();
        assert!(report.contains("Frame Diagnostics Report"));
        assert!(report.contains("pan exceeded overscan"));
        for stage in ["Connection", "Cull", "Density", "Cap", "Projection", "Simplification"] {
            assert!(report.contains(stage), "missing {stage}");
        }
        assert!(report.contains("2 teleports"));
        assert!(report.contains("Vertices: 180"));
    }

    #[test]
    fn serde_uses_fractional_seconds() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!((json["total_duration"].as_f64().unwrap() - 0.007).abs() < 1e-12);
        let back: FrameDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn negative_duration_is_rejected() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json["total_duration"] = serde_json::json!(-1.0);
        assert!(serde_json::from_value::<FrameDiagnostics>(json).is_err());
    }

    #[test]
    fn counting_helpers() {
        let chains = vec![
            Chain::new(vec![GeoPoint::new(0.0, 0.0, 0); 3]),
            Chain::new(vec![GeoPoint::new(0.0, 0.0, 0)]),
        ];
        assert_eq!(chain_points(&chains), 4);
        let polylines = vec![Polyline::new(vec![PixelPoint::new(0.0, 0.0); 5])];
        assert_eq!(total_points(&polylines), 5);
        assert!((reduction_ratio(10, 4) - 0.6).abs() < 1e-12);
        assert!(reduction_ratio(0, 0).abs() < f64::EPSILON);
    }
}
