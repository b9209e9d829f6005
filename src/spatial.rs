//! rstar entries shared by the intersection resolver and the graph builder.

use crate::models::Bbox;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// Envelope entry indexing a trail or segment by its position in the
/// caller's slice. `[lon, lat]` axis order throughout.
#[derive(Debug, Clone)]
pub struct EnvelopeEntry {
    pub index: usize,
    lower: [f64; 2],
    upper: [f64; 2],
}

impl EnvelopeEntry {
    pub fn new(index: usize, bbox: &Bbox) -> Self {
        let (lower, upper) = bbox.corners();
        EnvelopeEntry { index, lower, upper }
    }
}

impl RTreeObject for EnvelopeEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.lower, self.upper)
    }
}

/// Point entry for endpoint clustering and Y-intersection queries.
#[derive(Debug, Clone)]
pub struct PointEntry {
    pub index: usize,
    pub position: [f64; 2],
}

impl PointEntry {
    pub fn new(index: usize, lon: f64, lat: f64) -> Self {
        PointEntry {
            index,
            position: [lon, lat],
        }
    }
}

impl RTreeObject for PointEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for PointEntry {
    /// Squared distance in degree space. Callers re-check candidates with
    /// haversine; this only has to be a superset filter.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlon = self.position[0] - point[0];
        let dlat = self.position[1] - point[1];
        dlon * dlon + dlat * dlat
    }
}

/// Conservative degree radius covering `meters` at latitude `lat`: the
/// larger of the latitude and longitude deltas, so a degree-space query
/// never misses a point within the metric radius.
pub fn degree_radius(lat: f64, meters: f64) -> f64 {
    let lat_delta = meters / 111_000.0;
    let lon_delta = if lat.abs() > 85.0 {
        lat_delta
    } else {
        meters / (111_000.0 * lat.to_radians().cos())
    };
    lat_delta.max(lon_delta)
}

/// Bulk-load an envelope tree over anything exposing a bbox.
pub fn envelope_tree<'a, I>(boxes: I) -> RTree<EnvelopeEntry>
where
    I: IntoIterator<Item = &'a Bbox>,
{
    let entries: Vec<EnvelopeEntry> = boxes
        .into_iter()
        .enumerate()
        .map(|(i, bbox)| EnvelopeEntry::new(i, bbox))
        .collect();
    RTree::bulk_load(entries)
}

/// Entries whose envelope intersects `bbox`, by index.
pub fn query_envelope(tree: &RTree<EnvelopeEntry>, bbox: &Bbox) -> Vec<usize> {
    let (lower, upper) = bbox.corners();
    let query = AABB::from_corners(lower, upper);
    let mut hits: Vec<usize> = tree
        .locate_in_envelope_intersecting(&query)
        .map(|e| e.index)
        .collect();
    hits.sort_unstable();
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Point3D;

    fn bbox(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Bbox {
        Bbox::of_points(&[
            Point3D::new(min_lon, min_lat, 0.0).unwrap(),
            Point3D::new(max_lon, max_lat, 0.0).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn envelope_query_finds_overlaps() {
        let boxes = vec![
            bbox(0.0, 0.0, 1.0, 1.0),
            bbox(0.5, 0.5, 1.5, 1.5),
            bbox(5.0, 5.0, 6.0, 6.0),
        ];
        let tree = envelope_tree(boxes.iter());

        let hits = query_envelope(&tree, &bbox(0.8, 0.8, 0.9, 0.9));
        assert_eq!(hits, vec![0, 1]);

        let hits = query_envelope(&tree, &bbox(10.0, 10.0, 11.0, 11.0));
        assert!(hits.is_empty());
    }

    #[test]
    fn point_tree_within_distance() {
        let entries = vec![
            PointEntry::new(0, 2.35, 48.85),
            PointEntry::new(1, 2.3501, 48.85),
            PointEntry::new(2, 2.40, 48.85),
        ];
        let tree = RTree::bulk_load(entries);

        // ~11 m radius around the first point
        let radius = degree_radius(48.85, 11.0);
        let hits: Vec<usize> = tree
            .locate_within_distance([2.35, 48.85], radius * radius)
            .map(|e| e.index)
            .collect();
        assert!(hits.contains(&0));
        assert!(hits.contains(&1));
        assert!(!hits.contains(&2));
    }

    #[test]
    fn degree_radius_widens_with_latitude() {
        assert!(degree_radius(60.0, 100.0) > degree_radius(0.0, 100.0));
        // Near the poles the fallback keeps it finite
        assert_eq!(degree_radius(89.0, 100.0), 100.0 / 111_000.0);
    }
}
