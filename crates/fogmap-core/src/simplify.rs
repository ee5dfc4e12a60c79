//! Chain simplification using the Ramer-Douglas-Peucker algorithm.
//!
//! Removes interior vertices that sit within `tolerance` pixels of the
//! segment between their retained neighbors. The tolerance is tied to the
//! on-screen reveal radius (see [`tolerance_for_radius`]) so the revealed
//! corridor moves by well under a device pixel.
//!
//! Pure and deterministic: same input and tolerance, same output.

use crate::types::{PixelPoint, Polyline};

/// Simplification tolerance for a reveal radius of `radius_px` pixels.
///
/// Returns `0.0` (keep everything) for non-finite or negative inputs.
#[must_use]
pub fn tolerance_for_radius(radius_px: f64, fraction: f64) -> f64 {
    let tolerance = radius_px * fraction;
    if tolerance.is_finite() && tolerance > 0.0 {
        tolerance
    } else {
        0.0
    }
}

/// Simplify one chain of screen points.
///
/// The first and last points are always kept. Chains with fewer than 3
/// points are returned unchanged. A non-finite or negative tolerance
/// behaves like `0.0`, which keeps every point that lies off the segment
/// between its retained neighbours.
#[must_use = "returns the simplified points"]
pub fn simplify(points: &[PixelPoint], tolerance: f64) -> Vec<PixelPoint> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let tolerance = if tolerance.is_finite() && tolerance > 0.0 {
        tolerance
    } else {
        0.0
    };

    let kept = keep_flags(points, tolerance);

    points
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect()
}

/// Simplify a polyline, see [`simplify`].
#[must_use = "returns the simplified polyline"]
pub fn simplify_polyline(polyline: &Polyline, tolerance: f64) -> Polyline {
    Polyline::new(simplify(polyline.points(), tolerance))
}

/// Simplify multiple chains, each independently.
#[must_use = "returns the simplified polylines"]
pub fn simplify_chains(polylines: &[Polyline], tolerance: f64) -> Vec<Polyline> {
    polylines
        .iter()
        .map(|pl| simplify_polyline(pl, tolerance))
        .collect()
}

/// Keep-flags for one chain of at least two points.
///
/// Works through `(start, end)` spans on an explicit stack, so a long
/// winding track cannot exhaust the call stack. A span keeps its interior
/// point farthest from the chord when that point lies more than
/// `tolerance` pixels away, then splits there. The farthest point does not
/// depend on the tolerance, so a larger tolerance only stops splitting
/// sooner and never keeps a point a smaller tolerance would drop.
fn keep_flags(points: &[PixelPoint], tolerance: f64) -> Vec<bool> {
    let last = points.len() - 1;
    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[last] = true;

    let mut spans = vec![(0, last)];
    while let Some((start, end)) = spans.pop() {
        let (a, b) = (points[start], points[end]);
        let farthest = (start + 1..end)
            .map(|i| (i, segment_distance(points[i], a, b)))
            .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                Some((_, far)) if far >= d => best,
                _ => Some((i, d)),
            });
        if let Some((index, distance)) = farthest
            && distance > tolerance
        {
            kept[index] = true;
            spans.push((index, end));
            spans.push((start, index));
        }
    }
    kept
}

/// Distance from `p` to the segment `a`-`b` in pixels.
///
/// The stroke only covers the segment itself, so a fix that overshoots
/// past either end of the chord (a track doubling back on itself) is
/// measured to the nearer endpoint rather than to the extended line.
fn segment_distance(p: PixelPoint, a: PixelPoint, b: PixelPoint) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let t = ((p.x - a.x).mul_add(dx, (p.y - a.y) * dy) / length_sq).clamp(0.0, 1.0);
    p.distance(PixelPoint::new(t.mul_add(dx, a.x), t.mul_add(dy, a.y)))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn pts(coords: &[(f64, f64)]) -> Vec<PixelPoint> {
        coords.iter().map(|&(x, y)| PixelPoint::new(x, y)).collect()
    }

    #[test]
    fn short_chains_unchanged() {
        assert!(simplify(&[], 1.0).is_empty());
        assert_eq!(simplify(&pts(&[(1.0, 2.0)]), 1.0).len(), 1);
        assert_eq!(simplify(&pts(&[(0.0, 0.0), (10.0, 0.0)]), 1.0).len(), 2);
    }

    #[test]
    fn collinear_points_collapse_to_endpoints() {
        let line = pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0), (4.0, 4.0)]);
        let result = simplify(&line, 0.1);
        assert_eq!(result, pts(&[(0.0, 0.0), (4.0, 4.0)]));
    }

    #[test]
    fn zigzag_retains_peaks_below_tolerance() {
        let zigzag = pts(&[(0.0, 0.0), (2.0, 5.0), (4.0, 0.0), (6.0, 5.0), (8.0, 0.0)]);
        assert_eq!(simplify(&zigzag, 1.0).len(), 5);
        assert_eq!(simplify(&zigzag, 10.0).len(), 2);
    }

    #[test]
    fn bad_tolerance_behaves_like_zero() {
        let wobble = pts(&[(0.0, 0.0), (1.0, 0.1), (2.0, 0.0), (3.0, 0.05), (4.0, 0.0)]);
        assert_eq!(simplify(&wobble, f64::NAN).len(), 5);
        assert_eq!(simplify(&wobble, -3.0).len(), 5);
    }

    #[test]
    fn closed_loop_keeps_far_point() {
        // First and last coincide; the farthest point from the start must
        // survive so the loop is not collapsed to a dot.
        let square = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]);
        let result = simplify(&square, 1.0);
        assert!(result.contains(&PixelPoint::new(10.0, 10.0)));
    }

    #[test]
    fn simplify_chains_applies_to_each() {
        let chains = vec![
            Polyline::new(pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)])),
            Polyline::new(pts(&[(0.0, 0.0), (1.0, 5.0), (2.0, 0.0)])),
        ];
        let results = simplify_chains(&chains, 0.5);
        assert_eq!(results[0].len(), 2);
        assert_eq!(results[1].len(), 3);
    }

    #[test]
    fn tolerance_scales_with_radius() {
        assert!((tolerance_for_radius(20.0, 0.15) - 3.0).abs() < 1e-12);
        assert!(tolerance_for_radius(f64::NAN, 0.15).abs() < f64::EPSILON);
        assert!(tolerance_for_radius(-4.0, 0.15).abs() < f64::EPSILON);
    }

    #[test]
    fn overshoot_past_chord_end_is_kept() {
        // The walk runs to x = 30 and turns back to x = 20. Every point is
        // on one line, but dropping (30, 0) would pull the corridor back
        // by ten pixels.
        let back = pts(&[(0.0, 0.0), (10.0, 0.0), (30.0, 0.0), (20.0, 0.0)]);
        assert_eq!(
            simplify(&back, 1.0),
            pts(&[(0.0, 0.0), (30.0, 0.0), (20.0, 0.0)])
        );
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let d = segment_distance(
            PixelPoint::new(7.0, 4.0),
            PixelPoint::new(0.0, 0.0),
            PixelPoint::new(4.0, 0.0),
        );
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn segment_distance_diagonal_segment() {
        let d = segment_distance(
            PixelPoint::new(2.0, -1.0),
            PixelPoint::new(0.0, 0.0),
            PixelPoint::new(4.0, 2.0),
        );
        let expected = 8.0 / 20.0_f64.sqrt();
        assert!((d - expected).abs() < 1e-10, "got {d}, expected {expected}");
    }

    fn arb_chain() -> impl Strategy<Value = Vec<PixelPoint>> {
        prop::collection::vec((0.0f64..500.0, 0.0f64..500.0), 0..60)
            .prop_map(|v| v.into_iter().map(|(x, y)| PixelPoint::new(x, y)).collect())
    }

    proptest! {
        #[test]
        fn prop_endpoints_preserved(chain in arb_chain(), tol in 0.0f64..50.0) {
            let out = simplify(&chain, tol);
            prop_assert_eq!(out.first(), chain.first());
            prop_assert_eq!(out.last(), chain.last());
        }

        #[test]
        fn prop_monotone_in_tolerance(chain in arb_chain(), a in 0.0f64..50.0, b in 0.0f64..50.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(simplify(&chain, hi).len() <= simplify(&chain, lo).len());
        }

        #[test]
        fn prop_deterministic(chain in arb_chain(), tol in 0.0f64..50.0) {
            prop_assert_eq!(simplify(&chain, tol), simplify(&chain, tol));
        }
    }
}
