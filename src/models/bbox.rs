use crate::models::Point3D;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in geographic coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Bbox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bbox {
    /// Compute the envelope of a point sequence.
    /// Returns `None` for an empty sequence.
    pub fn of_points(points: &[Point3D]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let mut min_lon = f64::INFINITY;
        let mut max_lon = f64::NEG_INFINITY;
        let mut min_lat = f64::INFINITY;
        let mut max_lat = f64::NEG_INFINITY;

        for p in points {
            min_lon = min_lon.min(p.lon);
            max_lon = max_lon.max(p.lon);
            min_lat = min_lat.min(p.lat);
            max_lat = max_lat.max(p.lat);
        }

        Some(Bbox {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// Expand the box by a buffer in meters, widening the longitude buffer
    /// with latitude. Falls back to the latitude delta near the poles.
    pub fn expanded_m(&self, buffer_m: f64) -> Self {
        let lat_buffer = buffer_m / 111_000.0;
        let mid_lat = (self.min_lat + self.max_lat) / 2.0;

        let lon_buffer = if mid_lat.abs() > 85.0 {
            lat_buffer
        } else {
            buffer_m / (111_000.0 * mid_lat.to_radians().cos())
        };

        Bbox {
            min_lon: self.min_lon - lon_buffer,
            min_lat: self.min_lat - lat_buffer,
            max_lon: self.max_lon + lon_buffer,
            max_lat: self.max_lat + lat_buffer,
        }
    }

    pub fn intersects(&self, other: &Bbox) -> bool {
        self.min_lon <= other.max_lon
            && self.max_lon >= other.min_lon
            && self.min_lat <= other.max_lat
            && self.max_lat >= other.min_lat
    }

    /// Corners for an rstar envelope: `[lon, lat]` order.
    pub fn corners(&self) -> ([f64; 2], [f64; 2]) {
        (
            [self.min_lon, self.min_lat],
            [self.max_lon, self.max_lat],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lon: f64, lat: f64) -> Point3D {
        Point3D::new(lon, lat, 0.0).unwrap()
    }

    #[test]
    fn envelope_of_points() {
        let bbox = Bbox::of_points(&[p(2.35, 48.85), p(2.33, 48.87), p(2.38, 48.86)]).unwrap();
        assert_eq!(bbox.min_lon, 2.33);
        assert_eq!(bbox.max_lon, 2.38);
        assert_eq!(bbox.min_lat, 48.85);
        assert_eq!(bbox.max_lat, 48.87);
    }

    #[test]
    fn envelope_of_empty_is_none() {
        assert!(Bbox::of_points(&[]).is_none());
    }

    #[test]
    fn buffer_expansion() {
        let bbox = Bbox::of_points(&[p(2.35, 48.85), p(2.36, 48.86)]).unwrap();
        let expanded = bbox.expanded_m(1000.0);
        let lat_buffer = 1000.0 / 111_000.0;
        assert!((expanded.min_lat - (48.85 - lat_buffer)).abs() < 1e-10);
        assert!((expanded.max_lat - (48.86 + lat_buffer)).abs() < 1e-10);
        // Longitude buffer is wider than latitude buffer away from the equator
        assert!(expanded.max_lon - 2.36 > lat_buffer);
    }

    #[test]
    fn near_pole_longitude_fallback() {
        let bbox = Bbox::of_points(&[p(10.0, 86.0)]).unwrap();
        let expanded = bbox.expanded_m(1000.0);
        let lat_buffer = 1000.0 / 111_000.0;
        assert!((expanded.max_lon - 10.0 - lat_buffer).abs() < 1e-10);
    }

    #[test]
    fn intersection_test() {
        let a = Bbox::of_points(&[p(0.0, 0.0), p(1.0, 1.0)]).unwrap();
        let b = Bbox::of_points(&[p(0.5, 0.5), p(2.0, 2.0)]).unwrap();
        let c = Bbox::of_points(&[p(3.0, 3.0), p(4.0, 4.0)]).unwrap();
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }
}
