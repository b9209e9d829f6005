use switchback::{LineString3D, Point3D, Trail};

/// Meters of latitude per degree (spherical earth, matches the crate's
/// haversine radius).
pub const M_PER_DEG_LAT: f64 = 111_194.93;

/// Install a subscriber once so `RUST_LOG=switchback=debug` works when
/// debugging a failing test.
#[allow(dead_code)]
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[allow(dead_code)]
pub fn lat_offset_m(meters: f64) -> f64 {
    meters / M_PER_DEG_LAT
}

#[allow(dead_code)]
pub fn lon_offset_m(meters: f64, at_lat: f64) -> f64 {
    meters / (M_PER_DEG_LAT * at_lat.to_radians().cos())
}

/// Create a test trail from raw coordinates.
#[allow(dead_code)]
pub fn make_trail(name: &str, points: &[(f64, f64, f64)]) -> Trail {
    Trail::new(
        name,
        LineString3D::new(
            points
                .iter()
                .map(|&(lon, lat, elev)| Point3D::new(lon, lat, elev).unwrap())
                .collect(),
        )
        .unwrap(),
    )
}

/// Two straight 1000 m trails crossing perpendicularly at their midpoints
/// (one north-south, one east-west), centered on (2.35, 48.85).
#[allow(dead_code)]
pub fn crossing_trails() -> Vec<Trail> {
    let half_lat = lat_offset_m(500.0);
    let half_lon = lon_offset_m(500.0, 48.85);
    vec![
        make_trail(
            "North-South",
            &[(2.35, 48.85 - half_lat, 0.0), (2.35, 48.85 + half_lat, 0.0)],
        ),
        make_trail(
            "East-West",
            &[(2.35 - half_lon, 48.85, 0.0), (2.35 + half_lon, 48.85, 0.0)],
        ),
    ]
}

/// A 1000 m north-south trail plus a trail approaching its midpoint from
/// the east that stops `gap_m` short.
#[allow(dead_code)]
pub fn y_near_miss_trails(gap_m: f64) -> Vec<Trail> {
    let km = lat_offset_m(1000.0);
    let mid_lat = 48.85 + km / 2.0;
    let gap_lon = lon_offset_m(gap_m, mid_lat);
    vec![
        make_trail("Main", &[(2.35, 48.85, 0.0), (2.35, 48.85 + km, 0.0)]),
        make_trail(
            "Spur",
            &[(2.36, mid_lat, 0.0), (2.35 + gap_lon, mid_lat, 0.0)],
        ),
    ]
}

/// A lollipop-shaped network: a ~1 km stem from a trailhead to a junction,
/// then a triangle of roughly 1 km, 1 km, and 1.4 km sides.
#[allow(dead_code)]
pub fn lollipop_trails() -> Vec<Trail> {
    let km_lat = lat_offset_m(1000.0);
    let km_lon = lon_offset_m(1000.0, 48.85);
    let junction = (2.36, 48.85);
    let p = (2.36, 48.85 + km_lat);
    let q = (2.36 + km_lon, 48.85);
    vec![
        make_trail(
            "Stem",
            &[(2.36 - km_lon, 48.85, 0.0), (junction.0, junction.1, 0.0)],
        ),
        make_trail("Side A", &[(junction.0, junction.1, 0.0), (p.0, p.1, 0.0)]),
        make_trail("Side B", &[(p.0, p.1, 0.0), (q.0, q.1, 0.0)]),
        make_trail("Side C", &[(q.0, q.1, 0.0), (junction.0, junction.1, 0.0)]),
    ]
}
