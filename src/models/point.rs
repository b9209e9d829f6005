use serde::{Deserialize, Serialize};

/// Mean Earth radius used for haversine distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Decimal places of the snap grid used when deduplicating intersection
/// points. Matches the precision of the input feeds.
pub const GRID_DECIMALS: i32 = 6;

/// A WGS84 coordinate with elevation: `(lon, lat)` in decimal degrees,
/// `elev` in meters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point3D {
    pub lon: f64,
    pub lat: f64,
    pub elev: f64,
}

impl Point3D {
    pub fn new(lon: f64, lat: f64, elev: f64) -> Result<Self, String> {
        if !(-180.0..=180.0).contains(&lon) {
            return Err(format!(
                "Invalid longitude: {} (must be between -180 and 180)",
                lon
            ));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(format!(
                "Invalid latitude: {} (must be between -90 and 90)",
                lat
            ));
        }
        if !elev.is_finite() {
            return Err(format!("Invalid elevation: {}", elev));
        }
        Ok(Point3D { lon, lat, elev })
    }

    /// Haversine distance to another point, in meters. Elevation is ignored.
    pub fn distance_m(&self, other: &Point3D) -> f64 {
        let lat1_rad = self.lat.to_radians();
        let lat2_rad = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lon = (other.lon - self.lon).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_M * c
    }

    /// True when the planar (lon, lat) coordinates coincide exactly.
    pub fn same_position(&self, other: &Point3D) -> bool {
        self.lon == other.lon && self.lat == other.lat
    }

    /// Key on a 6-decimal-degree grid. Points sharing a key are treated as
    /// one location during intersection dedup.
    pub fn grid_key(&self) -> (i64, i64) {
        let scale = 10_f64.powi(GRID_DECIMALS);
        (
            (self.lon * scale).round() as i64,
            (self.lat * scale).round() as i64,
        )
    }

    /// Snap the planar coordinates onto the 6-decimal grid.
    pub fn snapped_to_grid(&self) -> Point3D {
        let scale = 10_f64.powi(GRID_DECIMALS);
        Point3D {
            lon: (self.lon * scale).round() / scale,
            lat: (self.lat * scale).round() / scale,
            elev: self.elev,
        }
    }

    /// Drop elevation, producing a `geo` coordinate for 2-D operations.
    pub fn force_2d(&self) -> geo::Coord<f64> {
        geo::Coord {
            x: self.lon,
            y: self.lat,
        }
    }

    /// Rebuild from a 2-D coordinate, attaching an elevation.
    pub fn from_2d(c: geo::Coord<f64>, elev: f64) -> Point3D {
        Point3D {
            lon: c.x,
            lat: c.y,
            elev,
        }
    }
}
