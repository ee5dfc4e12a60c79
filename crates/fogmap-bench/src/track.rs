//! Track sources: a JSON file or a deterministic synthetic walk.

use std::path::Path;

use fogmap_core::{GeoPoint, MapRegion};

/// Metres per degree of latitude (and of longitude at the equator).
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Interval between synthetic fixes.
const FIX_INTERVAL_MS: i64 = 5_000;

/// Parameters of the synthetic walk.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticWalk {
    pub origin_latitude: f64,
    pub origin_longitude: f64,
    pub fixes: usize,
    pub step_meters: f64,
    /// Insert a jump every this many fixes (0 = never).
    pub teleport_every: usize,
    pub teleport_meters: f64,
}

impl SyntheticWalk {
    /// A meandering walk: the heading drifts sinusoidally so the path
    /// curls back on itself, exercising simplification and overlap.
    #[allow(clippy::cast_precision_loss)]
    pub fn generate(&self) -> Vec<GeoPoint> {
        let mut points = Vec::with_capacity(self.fixes);
        let mut lat = self.origin_latitude;
        let mut lon = self.origin_longitude;
        let mut timestamp = 0_i64;
        for i in 0..self.fixes {
            let t = i as f64;
            if self.teleport_every > 0 && i > 0 && i % self.teleport_every == 0 {
                // Jump perpendicular to the main drift and pause an hour.
                lat += self.teleport_meters / METERS_PER_DEGREE;
                timestamp += 3_600_000;
            } else {
                let heading = (t * 0.05).sin().mul_add(1.4, t * 0.002);
                let north = heading.sin() * self.step_meters;
                let east = heading.cos() * self.step_meters;
                lat += north / METERS_PER_DEGREE;
                lon += east / (METERS_PER_DEGREE * lat.to_radians().cos());
            }
            timestamp += FIX_INTERVAL_MS;
            let accuracy = (t * 0.3).sin().abs().mul_add(10.0, 5.0);
            points.push(GeoPoint::new(lat, lon, timestamp).with_accuracy(accuracy));
        }
        points
    }
}

/// Read a JSON array of fixes.
pub fn load(path: &Path) -> Result<Vec<GeoPoint>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("Error parsing {}: {e}", path.display()))
}

/// A camera over the mean position of `points`, `span_meters` wide.
///
/// The latitude span follows the aspect ratio at the camera's latitude so
/// pixels stay square on the ground.
#[allow(clippy::cast_precision_loss)]
pub fn initial_region(
    points: &[GeoPoint],
    span_meters: f64,
    width: u32,
    height: u32,
) -> MapRegion {
    let n = points.len().max(1) as f64;
    let lat = points.iter().map(|p| p.latitude).sum::<f64>() / n;
    let lon = points.iter().map(|p| p.longitude).sum::<f64>() / n;
    let cos_lat = lat.to_radians().cos().max(1e-6);
    let longitude_delta = span_meters / (METERS_PER_DEGREE * cos_lat);
    let latitude_delta = longitude_delta * cos_lat * f64::from(height) / f64::from(width);
    MapRegion::new(
        lat,
        lon,
        latitude_delta,
        longitude_delta,
        f64::from(width),
        f64::from(height),
    )
}

#[cfg(test)]
mod tests {
    use fogmap_core::haversine_meters;

    use super::*;

    fn walk() -> SyntheticWalk {
        SyntheticWalk {
            origin_latitude: 47.37,
            origin_longitude: 8.54,
            fixes: 100,
            step_meters: 15.0,
            teleport_every: 40,
            teleport_meters: 2_000.0,
        }
    }

    #[test]
    fn steps_and_teleports() {
        let points = walk().generate();
        assert_eq!(points.len(), 100);
        assert!(points.iter().all(GeoPoint::is_valid));
        let long_gaps = points
            .windows(2)
            .filter(|w| haversine_meters(&w[0], &w[1]) > 500.0)
            .count();
        assert_eq!(long_gaps, 2);
        let step = haversine_meters(&points[1], &points[2]);
        assert!((step - 15.0).abs() < 0.5, "step {step}");
    }

    #[test]
    fn timestamps_increase() {
        let points = walk().generate();
        assert!(points.windows(2).all(|w| w[1].timestamp > w[0].timestamp));
    }

    #[test]
    fn region_centered_on_track() {
        let points = walk().generate();
        let region = initial_region(&points, 3_000.0, 800, 600);
        assert!(region.is_usable());
        let ratio = region.latitude_delta / region.longitude_delta;
        let expected = 47.4f64.to_radians().cos() * 0.75;
        assert!((ratio - expected).abs() < 0.01);
    }
}
