use crate::models::{Bbox, Point3D};
use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{Coord, Line, LineString};
use serde::{Deserialize, Serialize};

/// An ordered 3-D polyline with at least two distinct vertices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineString3D(Vec<Point3D>);

/// Closest-point query result on a polyline.
#[derive(Debug, Clone, Copy)]
pub struct ClosestLocation {
    /// The foot of the perpendicular on the polyline (elevation interpolated).
    pub point: Point3D,
    /// Arc-length fraction of that point along the polyline, in [0, 1].
    pub fraction: f64,
    /// Haversine distance from the query point, in meters.
    pub distance_m: f64,
}

impl LineString3D {
    pub fn new(points: Vec<Point3D>) -> Result<Self, String> {
        if points.len() < 2 {
            return Err(format!(
                "LineString needs at least 2 points, got {}",
                points.len()
            ));
        }
        let first = points[0];
        if points.iter().all(|p| p.same_position(&first)) {
            return Err("LineString has no planar extent".to_string());
        }
        Ok(LineString3D(points))
    }

    pub fn points(&self) -> &[Point3D] {
        &self.0
    }

    pub fn first(&self) -> Point3D {
        self.0[0]
    }

    pub fn last(&self) -> Point3D {
        self.0[self.0.len() - 1]
    }

    /// True when the planar start and end coincide.
    pub fn is_closed(&self) -> bool {
        self.first().same_position(&self.last())
    }

    /// Geodesic length in meters (haversine over consecutive vertices).
    pub fn length_m(&self) -> f64 {
        self.0.windows(2).map(|w| w[0].distance_m(&w[1])).sum()
    }

    pub fn length_km(&self) -> f64 {
        self.length_m() / 1000.0
    }

    /// Sum of positive and negative per-segment elevation deltas.
    /// Returns `(gain_m, loss_m)`, both non-negative.
    pub fn elevation_gain_loss(&self) -> (f64, f64) {
        let mut gain = 0.0;
        let mut loss = 0.0;
        for w in self.0.windows(2) {
            let dz = w[1].elev - w[0].elev;
            if dz > 0.0 {
                gain += dz;
            } else {
                loss += -dz;
            }
        }
        (gain, loss)
    }

    pub fn bbox(&self) -> Bbox {
        // Constructor guarantees a non-empty point set.
        Bbox::of_points(&self.0).expect("non-empty linestring")
    }

    /// 2-D projection for planar predicates and R-tree envelopes.
    pub fn force_2d(&self) -> LineString<f64> {
        LineString::from(
            self.0
                .iter()
                .map(|p| p.force_2d())
                .collect::<Vec<Coord<f64>>>(),
        )
    }

    /// Consecutive vertex pairs.
    pub fn segments(&self) -> impl Iterator<Item = (Point3D, Point3D)> + '_ {
        self.0.windows(2).map(|w| (w[0], w[1]))
    }

    /// Planar simplicity check: no two non-adjacent segments may cross or
    /// overlap. A closed ring may touch itself only at its shared endpoint.
    pub fn is_simple(&self) -> bool {
        let segs: Vec<Line<f64>> = self
            .force_2d()
            .lines()
            .collect();
        let n = segs.len();
        let closed = self.is_closed();

        for i in 0..n {
            for j in (i + 2)..n {
                let closing_pair = closed && i == 0 && j == n - 1;
                // Cheap envelope rejection before the exact test
                if !lines_bbox_overlap(&segs[i], &segs[j]) {
                    continue;
                }
                match line_intersection(segs[i], segs[j]) {
                    Some(LineIntersection::SinglePoint { is_proper, .. }) => {
                        if is_proper || !closing_pair {
                            return false;
                        }
                    }
                    Some(LineIntersection::Collinear { .. }) => return false,
                    None => {}
                }
            }
        }
        true
    }

    /// Arc-length fractions of each vertex, from 0.0 to 1.0.
    pub fn vertex_fractions(&self) -> Vec<f64> {
        let total = self.length_m();
        let mut fractions = Vec::with_capacity(self.0.len());
        let mut cumulative = 0.0;
        fractions.push(0.0);
        for w in self.0.windows(2) {
            cumulative += w[0].distance_m(&w[1]);
            fractions.push(if total > 0.0 { cumulative / total } else { 0.0 });
        }
        if let Some(last) = fractions.last_mut() {
            *last = 1.0;
        }
        fractions
    }

    /// Closest point on the polyline to `query`, with its arc fraction.
    pub fn closest_point(&self, query: &Point3D) -> ClosestLocation {
        let total = self.length_m();
        let mut best = ClosestLocation {
            point: self.first(),
            fraction: 0.0,
            distance_m: query.distance_m(&self.first()),
        };

        let mut cumulative = 0.0;
        for (a, b) in self.segments() {
            let seg_len = a.distance_m(&b);
            let (candidate, t) = project_on_segment(query, &a, &b);
            let dist = query.distance_m(&candidate);
            if dist < best.distance_m {
                let along = cumulative + t * seg_len;
                best = ClosestLocation {
                    point: candidate,
                    fraction: if total > 0.0 { (along / total).clamp(0.0, 1.0) } else { 0.0 },
                    distance_m: dist,
                };
            }
            cumulative += seg_len;
        }
        best
    }

    /// Arc-length fraction of the point on the polyline nearest to `query`.
    pub fn line_locate(&self, query: &Point3D) -> f64 {
        self.closest_point(query).fraction
    }

    /// Interpolated point at an arc-length fraction. Clamped to [0, 1].
    pub fn point_at_fraction(&self, fraction: f64) -> Point3D {
        let fraction = fraction.clamp(0.0, 1.0);
        let total = self.length_m();
        if total <= 0.0 || fraction == 0.0 {
            return self.first();
        }
        if fraction == 1.0 {
            return self.last();
        }

        let target = fraction * total;
        let mut cumulative = 0.0;
        for (a, b) in self.segments() {
            let seg_len = a.distance_m(&b);
            if cumulative + seg_len >= target && seg_len > 0.0 {
                let t = (target - cumulative) / seg_len;
                return lerp(&a, &b, t);
            }
            cumulative += seg_len;
        }
        self.last()
    }

    /// Sub-polyline between two arc-length fractions (`f0 < f1`), with
    /// interpolated cut points at both ends.
    pub fn slice(&self, f0: f64, f1: f64) -> Result<LineString3D, String> {
        let f0 = f0.clamp(0.0, 1.0);
        let f1 = f1.clamp(0.0, 1.0);
        if f0 >= f1 {
            return Err(format!("Invalid slice range: [{}, {}]", f0, f1));
        }

        let fractions = self.vertex_fractions();
        let mut points = vec![self.point_at_fraction(f0)];
        for (p, f) in self.0.iter().zip(fractions.iter()) {
            if *f > f0 && *f < f1 {
                push_distinct(&mut points, *p);
            }
        }
        push_distinct(&mut points, self.point_at_fraction(f1));

        LineString3D::new(points)
    }

    /// Coordinate-reversed copy (for return-direction traversal).
    pub fn reversed(&self) -> LineString3D {
        let mut points = self.0.clone();
        points.reverse();
        LineString3D(points)
    }
}

fn push_distinct(points: &mut Vec<Point3D>, p: Point3D) {
    if points.last().map(|l| l.same_position(&p)) != Some(true) {
        points.push(p);
    }
}

fn lines_bbox_overlap(a: &Line<f64>, b: &Line<f64>) -> bool {
    a.start.x.min(a.end.x) <= b.start.x.max(b.end.x)
        && a.start.x.max(a.end.x) >= b.start.x.min(b.end.x)
        && a.start.y.min(a.end.y) <= b.start.y.max(b.end.y)
        && a.start.y.max(a.end.y) >= b.start.y.min(b.end.y)
}

/// Project `query` onto the segment `a -> b`. The projection parameter is
/// computed in degree space, which is accurate enough for trail-scale
/// segments; distances stay haversine.
/// Returns the projected point (elevation interpolated) and `t` in [0, 1].
fn project_on_segment(query: &Point3D, a: &Point3D, b: &Point3D) -> (Point3D, f64) {
    let dx = b.lon - a.lon;
    let dy = b.lat - a.lat;
    let len_sq = dx * dx + dy * dy;

    if len_sq < 1e-20 {
        return (*a, 0.0);
    }

    let t = ((query.lon - a.lon) * dx + (query.lat - a.lat) * dy) / len_sq;
    let t = t.clamp(0.0, 1.0);
    (lerp(a, b, t), t)
}

fn lerp(a: &Point3D, b: &Point3D, t: f64) -> Point3D {
    Point3D {
        lon: a.lon + t * (b.lon - a.lon),
        lat: a.lat + t * (b.lat - a.lat),
        elev: a.elev + t * (b.elev - a.elev),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lon: f64, lat: f64, elev: f64) -> Point3D {
        Point3D::new(lon, lat, elev).unwrap()
    }

    /// A straight north-running line, roughly 1110 m long.
    fn straight_line() -> LineString3D {
        LineString3D::new(vec![
            p(2.35, 48.85, 100.0),
            p(2.35, 48.855, 150.0),
            p(2.35, 48.86, 120.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_constructor_rejects_degenerate() {
        assert!(LineString3D::new(vec![]).is_err());
        assert!(LineString3D::new(vec![p(2.35, 48.85, 0.0)]).is_err());
        // Two identical positions have no extent
        assert!(LineString3D::new(vec![p(2.35, 48.85, 0.0), p(2.35, 48.85, 5.0)]).is_err());
    }

    #[test]
    fn test_length() {
        let line = straight_line();
        // 0.01 degrees of latitude is roughly 1112 m
        assert!((line.length_m() - 1112.0).abs() < 10.0);
    }

    #[test]
    fn test_elevation_gain_loss() {
        let line = straight_line();
        let (gain, loss) = line.elevation_gain_loss();
        assert_eq!(gain, 50.0);
        assert_eq!(loss, 30.0);
    }

    #[test]
    fn test_simple_line_is_simple() {
        assert!(straight_line().is_simple());
    }

    #[test]
    fn test_self_crossing_is_not_simple() {
        // A bowtie: crosses itself in the middle
        let line = LineString3D::new(vec![
            p(0.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(0.0, 1.0, 0.0),
        ])
        .unwrap();
        assert!(!line.is_simple());
    }

    #[test]
    fn test_closed_ring_is_simple() {
        let line = LineString3D::new(vec![
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(0.0, 1.0, 0.0),
            p(0.0, 0.0, 0.0),
        ])
        .unwrap();
        assert!(line.is_closed());
        assert!(line.is_simple());
    }

    #[test]
    fn test_point_at_fraction_midpoint() {
        let line = LineString3D::new(vec![p(2.35, 48.85, 0.0), p(2.35, 48.86, 100.0)]).unwrap();
        let mid = line.point_at_fraction(0.5);
        assert!((mid.lat - 48.855).abs() < 1e-9);
        assert!((mid.elev - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_point_at_fraction_clamps() {
        let line = straight_line();
        assert_eq!(line.point_at_fraction(-0.5), line.first());
        assert_eq!(line.point_at_fraction(1.5), line.last());
    }

    #[test]
    fn test_closest_point_on_interior() {
        let line = LineString3D::new(vec![p(2.35, 48.85, 0.0), p(2.35, 48.86, 0.0)]).unwrap();
        // Query point just east of the midpoint
        let query = p(2.351, 48.855, 0.0);
        let closest = line.closest_point(&query);
        assert!((closest.fraction - 0.5).abs() < 0.01);
        assert!((closest.point.lon - 2.35).abs() < 1e-9);
        // ~73 m east at this latitude
        assert!(closest.distance_m > 50.0 && closest.distance_m < 100.0);
    }

    #[test]
    fn test_line_locate_endpoints() {
        let line = straight_line();
        assert_eq!(line.line_locate(&line.first()), 0.0);
        assert_eq!(line.line_locate(&line.last()), 1.0);
    }

    #[test]
    fn test_slice_conserves_length() {
        let line = straight_line();
        let total = line.length_m();
        let left = line.slice(0.0, 0.4).unwrap();
        let right = line.slice(0.4, 1.0).unwrap();
        let sum = left.length_m() + right.length_m();
        assert!(
            (sum - total).abs() < 1.0,
            "child lengths {} != parent {}",
            sum,
            total
        );
    }

    #[test]
    fn test_slice_keeps_interior_vertices() {
        let line = straight_line();
        let sliced = line.slice(0.1, 0.9).unwrap();
        // The interior vertex at fraction ~0.5 must survive
        assert!(sliced
            .points()
            .iter()
            .any(|q| (q.lat - 48.855).abs() < 1e-9));
    }

    #[test]
    fn test_slice_invalid_range() {
        let line = straight_line();
        assert!(line.slice(0.7, 0.3).is_err());
        assert!(line.slice(0.5, 0.5).is_err());
    }

    #[test]
    fn test_reversed() {
        let line = straight_line();
        let rev = line.reversed();
        assert_eq!(rev.first(), line.last());
        assert_eq!(rev.last(), line.first());
        let (gain, loss) = line.elevation_gain_loss();
        let (rgain, rloss) = rev.elevation_gain_loss();
        assert_eq!(gain, rloss);
        assert_eq!(loss, rgain);
    }
}
