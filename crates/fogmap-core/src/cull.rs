//! Viewport culling and density reduction.
//!
//! These steps shrink the per-frame working set. They never touch the
//! authoritative [`Path`](crate::Path); only the copy used to build one
//! frame's geometry is trimmed.
//!
//! - [`cull_to_viewport`] / [`cull_chain`] drop fixes outside the region
//!   plus an overscan margin, so a pan reveals no pop-in until the margin
//!   is used up.
//! - [`reduce_density`] drops fixes that land within a few pixels of the
//!   previously kept one.
//! - [`cap_points`] / [`cap_chains`] bound the total as a last resort,
//!   always keeping the newest fixes.

use tracing::warn;

use crate::projection::GeoProjector;
use crate::types::{Chain, GeoBounds, GeoPoint, MapRegion};

/// Keep only fixes inside `region` expanded by `overscan` (a fraction of
/// each delta) on every side.
///
/// An unusable region keeps nothing.
#[must_use = "returns the culled points"]
pub fn cull_to_viewport(points: &[GeoPoint], region: &MapRegion, overscan: f64) -> Vec<GeoPoint> {
    if !region.is_usable() {
        warn!(?region, "cannot cull against unusable region");
        return Vec::new();
    }
    let bounds = region.bounds(overscan);
    points
        .iter()
        .filter(|p| bounds.contains(p.latitude, p.longitude))
        .copied()
        .collect()
}

/// Cull a chain, keeping every segment whose extent touches `bounds`.
///
/// Keeping whole segments means a stroke that crosses the viewport with
/// both ends off-screen survives. Where segments are dropped the chain
/// is split, so no stroke is drawn across the dropped stretch. A
/// single-point chain survives only if its fix is inside `bounds`.
#[must_use = "returns the culled sub-chains"]
pub fn cull_chain(chain: &Chain, bounds: &GeoBounds) -> Vec<Chain> {
    let points = chain.points();
    match points {
        [] => Vec::new(),
        [only] => {
            if bounds.contains(only.latitude, only.longitude) {
                vec![chain.clone()]
            } else {
                Vec::new()
            }
        }
        _ => {
            let mut out = Vec::new();
            let mut current: Vec<GeoPoint> = Vec::new();
            for w in points.windows(2) {
                if bounds.intersects_span(&w[0], &w[1]) {
                    if current.is_empty() {
                        current.push(w[0]);
                    }
                    current.push(w[1]);
                } else if !current.is_empty() {
                    out.push(Chain::new(std::mem::take(&mut current)));
                }
            }
            if !current.is_empty() {
                out.push(Chain::new(current));
            }
            out
        }
    }
}

/// Cull every chain against `region` plus `overscan`.
///
/// An unusable region keeps nothing.
#[must_use = "returns the culled chains"]
pub fn cull_chains(chains: &[Chain], region: &MapRegion, overscan: f64) -> Vec<Chain> {
    if !region.is_usable() {
        warn!(?region, "cannot cull against unusable region");
        return Vec::new();
    }
    let bounds = region.bounds(overscan);
    chains.iter().flat_map(|c| cull_chain(c, &bounds)).collect()
}

/// Drop fixes that project closer than `min_pixel_gap` to the last kept
/// fix. The first fix is always kept.
///
/// Returns the input unchanged when the region is unusable or the gap is
/// not a positive finite number.
#[must_use = "returns the reduced points"]
pub fn reduce_density(
    points: &[GeoPoint],
    region: &MapRegion,
    min_pixel_gap: f64,
) -> Vec<GeoPoint> {
    reduce_density_with(points, &GeoProjector::new(*region), min_pixel_gap)
}

/// [`reduce_density`] with an explicit projector (for safe-area insets).
#[must_use = "returns the reduced points"]
pub fn reduce_density_with(
    points: &[GeoPoint],
    projector: &GeoProjector,
    min_pixel_gap: f64,
) -> Vec<GeoPoint> {
    if !(min_pixel_gap.is_finite() && min_pixel_gap > 0.0) {
        return points.to_vec();
    }
    let Some((first, rest)) = points.split_first() else {
        return Vec::new();
    };
    let Some(mut last_px) = projector.try_project(first) else {
        warn!(region = ?projector.region(), "cannot reduce density against unusable region");
        return points.to_vec();
    };

    let gap_sq = min_pixel_gap * min_pixel_gap;
    let mut kept = Vec::with_capacity(points.len());
    kept.push(*first);
    for p in rest {
        let Some(px) = projector.try_project(p) else {
            continue;
        };
        if px.distance_squared(last_px) >= gap_sq {
            kept.push(*p);
            last_px = px;
        }
    }
    kept
}

/// Keep at most `max` fixes, dropping the oldest.
#[must_use = "returns the capped points"]
pub fn cap_points(points: &[GeoPoint], max: usize) -> Vec<GeoPoint> {
    points[points.len().saturating_sub(max)..].to_vec()
}

/// Keep at most `max` fixes across all chains, dropping the oldest.
///
/// Chains are assumed to be in path order. Returns the surviving chains
/// and the number of fixes dropped.
#[must_use = "returns the capped chains"]
pub fn cap_chains(chains: Vec<Chain>, max: usize) -> (Vec<Chain>, usize) {
    let total: usize = chains.iter().map(Chain::len).sum();
    if total <= max {
        return (chains, 0);
    }

    let mut budget = max;
    let mut kept = Vec::new();
    for chain in chains.into_iter().rev() {
        if budget == 0 {
            break;
        }
        if chain.len() <= budget {
            budget -= chain.len();
            kept.push(chain);
        } else {
            let points = chain.into_points();
            let tail = points[points.len() - budget..].to_vec();
            budget = 0;
            kept.push(Chain::new(tail));
        }
    }
    kept.reverse();
    (kept, total - max)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::projection::project_to_pixel;

    fn region() -> MapRegion {
        MapRegion::new(0.0, 0.0, 0.1, 0.1, 1000.0, 1000.0)
    }

    fn p(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon, 0)
    }

    #[test]
    fn cull_keeps_overscan_margin() {
        let pts = vec![p(0.0, 0.0), p(0.09, 0.0), p(0.11, 0.0), p(0.0, -0.099)];
        let culled = cull_to_viewport(&pts, &region(), 0.5);
        // Bounds are +-0.1 degrees with 0.5 overscan.
        assert_eq!(culled, vec![p(0.0, 0.0), p(0.09, 0.0), p(0.0, -0.099)]);

        let tight = cull_to_viewport(&pts, &region(), 0.0);
        assert_eq!(tight, vec![p(0.0, 0.0)]);
    }

    #[test]
    fn cull_unusable_region_keeps_nothing() {
        let bad = MapRegion {
            latitude_delta: f64::NAN,
            ..region()
        };
        assert!(cull_to_viewport(&[p(0.0, 0.0)], &bad, 0.5).is_empty());
        assert!(cull_chains(&[Chain::new(vec![p(0.0, 0.0)])], &bad, 0.5).is_empty());
    }

    #[test]
    fn cull_chain_keeps_crossing_segment() {
        let bounds = region().bounds(0.0);
        let chain = Chain::new(vec![p(0.0, -1.0), p(0.0, 1.0)]);
        let out = cull_chain(&chain, &bounds);
        assert_eq!(out, vec![chain]);
    }

    #[test]
    fn cull_chain_splits_at_dropped_stretch() {
        let bounds = region().bounds(0.0);
        let chain = Chain::new(vec![
            p(0.0, 0.0),
            p(0.01, 0.0),
            p(1.0, 0.0),
            p(2.0, 0.0),
            p(0.02, 0.0),
            p(0.03, 0.0),
        ]);
        let out = cull_chain(&chain, &bounds);
        // (0,0)-(0.01)-(1.0) leaves through the top edge, (1.0)-(2.0) is
        // dropped, (2.0)-(0.02)-(0.03) re-enters.
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].points(), &[p(0.0, 0.0), p(0.01, 0.0), p(1.0, 0.0)]);
        assert_eq!(out[1].points(), &[p(2.0, 0.0), p(0.02, 0.0), p(0.03, 0.0)]);
    }

    #[test]
    fn cull_single_point_chain() {
        let bounds = region().bounds(0.0);
        assert_eq!(cull_chain(&Chain::new(vec![p(0.0, 0.0)]), &bounds).len(), 1);
        assert!(cull_chain(&Chain::new(vec![p(5.0, 0.0)]), &bounds).is_empty());
        assert!(cull_chain(&Chain::new(vec![]), &bounds).is_empty());
    }

    #[test]
    fn density_drops_close_points() {
        // 0.0001 degrees is 1 px in this region.
        let pts: Vec<GeoPoint> = (0..20).map(|i| p(0.0, f64::from(i) * 0.0001)).collect();
        let reduced = reduce_density(&pts, &region(), 4.5);
        assert_eq!(reduced.len(), 4);
        assert_eq!(reduced[0], pts[0]);
        assert_eq!(reduced[1], pts[5]);
    }

    #[test]
    fn density_with_bad_gap_is_identity() {
        let pts = vec![p(0.0, 0.0), p(0.0, 0.0)];
        assert_eq!(reduce_density(&pts, &region(), 0.0), pts);
        assert_eq!(reduce_density(&pts, &region(), f64::NAN), pts);
        assert!(reduce_density(&[], &region(), 5.0).is_empty());
    }

    #[test]
    fn cap_points_keeps_newest() {
        let pts: Vec<GeoPoint> = (0..10).map(|i| GeoPoint::new(0.0, 0.0, i)).collect();
        let capped = cap_points(&pts, 3);
        let stamps: Vec<i64> = capped.iter().map(|q| q.timestamp).collect();
        assert_eq!(stamps, vec![7, 8, 9]);
        assert_eq!(cap_points(&pts, 50).len(), 10);
    }

    #[test]
    fn cap_chains_drops_oldest_first() {
        let chain = |range: std::ops::Range<i64>| {
            Chain::new(range.map(|i| GeoPoint::new(0.0, 0.0, i)).collect())
        };
        let chains = vec![chain(0..4), chain(4..7), chain(7..10)];
        let (capped, dropped) = cap_chains(chains, 5);
        assert_eq!(dropped, 5);
        assert_eq!(capped.len(), 2);
        let stamps: Vec<i64> = capped
            .iter()
            .flat_map(|c| c.points().iter().map(|q| q.timestamp))
            .collect();
        assert_eq!(stamps, vec![5, 6, 7, 8, 9]);
    }

    proptest! {
        #[test]
        fn prop_density_gap_respected(
            offsets in prop::collection::vec((-0.05f64..0.05, -0.05f64..0.05), 0..200),
            gap in 0.5f64..30.0,
        ) {
            let r = region();
            let pts: Vec<GeoPoint> = offsets.iter().map(|&(a, b)| p(a, b)).collect();
            let reduced = reduce_density(&pts, &r, gap);
            prop_assert_eq!(reduced.first(), pts.first());
            for w in reduced.windows(2) {
                let a = project_to_pixel(&w[0], &r);
                let b = project_to_pixel(&w[1], &r);
                prop_assert!(a.distance(b) >= gap * (1.0 - 1e-12));
            }
        }
    }
}
