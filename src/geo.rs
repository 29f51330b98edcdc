use crate::types::Coordinate;
use std::f64::consts::PI;

/// Equatorial Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6378.137;

/// Great-circle distance in kilometres (spherical law of cosines).
///
/// The cosine term is clamped into `[-1, 1]` so rounding never pushes `acos`
/// out of its domain; NaN inputs still propagate to a NaN result.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    if a == b {
        return 0.0;
    }

    let lat1 = a.latitude * PI / 180.0;
    let lon1 = a.longitude * PI / 180.0;
    let lat2 = b.latitude * PI / 180.0;
    let lon2 = b.longitude * PI / 180.0;

    let x = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * (lon2 - lon1).cos();
    EARTH_RADIUS_KM * x.clamp(-1.0, 1.0).acos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon)
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        for p in [c(0.0, 0.0), c(52.52, 13.405), c(-33.86, 151.2), c(89.9, -179.9)] {
            assert_eq!(distance(p, p), 0.0);
        }
    }

    #[test]
    fn test_distance_is_symmetric() {
        let berlin = c(52.52, 13.405);
        let tokyo = c(35.6762, 139.6503);
        assert_eq!(distance(berlin, tokyo), distance(tokyo, berlin));
    }

    #[test]
    fn test_distance_monotonic_sanity() {
        let origin = c(0.0, 0.0);
        assert!(distance(origin, c(1.0, 0.0)) < distance(origin, c(90.0, 0.0)));
    }

    #[test]
    fn test_known_distances() {
        // 赤道上一度约 111.32km
        let one_degree = distance(c(0.0, 0.0), c(0.0, 1.0));
        assert!((one_degree - 111.319).abs() < 0.01, "got {}", one_degree);

        // 极点到赤道为四分之一圆周
        let quarter = distance(c(0.0, 0.0), c(90.0, 0.0));
        assert!((quarter - EARTH_RADIUS_KM * PI / 2.0).abs() < 1e-6);

        let antipode = distance(c(0.0, 0.0), c(0.0, 180.0));
        assert!((antipode - EARTH_RADIUS_KM * PI).abs() < 1e-6);
    }

    #[test]
    fn test_nan_propagates() {
        assert!(distance(c(f64::NAN, 0.0), c(1.0, 1.0)).is_nan());
    }
}
