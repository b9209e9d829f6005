use crate::config::NetworkConfig;
use crate::error::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::models::{
    IntersectionKind, IntersectionParticipant, IntersectionPoint, Point3D, Segment,
};
use crate::spatial::{envelope_tree, query_envelope};
use geo::line_intersection::{line_intersection, LineIntersection};
use geo::Line;
use itertools::Itertools;
use std::collections::HashMap;
use uuid::Uuid;

/// Stage S2: detect exact, Y (endpoint-near-interior), and multipoint
/// intersections between routable pieces.
///
/// Works on segments rather than raw trails so the resolver/splitter
/// fixpoint loop can re-run on its own output; on the first round each
/// segment is a whole trail.
pub struct IntersectionResolver {
    config: NetworkConfig,
}

impl IntersectionResolver {
    pub fn new(config: NetworkConfig) -> Self {
        IntersectionResolver { config }
    }

    pub fn resolve(&self, segments: &[Segment]) -> (Vec<IntersectionPoint>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();

        // Pair enumeration is ordered by id so each pair is visited once
        // and output is deterministic.
        let mut order: Vec<usize> = (0..segments.len()).collect();
        order.sort_by_key(|&i| segments[i].segment_id);

        let bboxes: Vec<_> = segments.iter().map(|s| s.geometry.bbox()).collect();
        let tree = envelope_tree(bboxes.iter());

        let mut collected: Vec<IntersectionPoint> = Vec::new();

        // Exact + multipoint pass over bbox-overlapping pairs.
        let pair_tol = self.config.exact_tol_m.max(self.config.y_tol_m);
        for &i in &order {
            let query = bboxes[i].expanded_m(pair_tol);
            for j in query_envelope(&tree, &query) {
                if j == i {
                    continue;
                }
                let (a, b) = (&segments[i], &segments[j]);
                if a.segment_id >= b.segment_id {
                    continue;
                }
                self.resolve_pair(a, b, &mut collected, &mut diagnostics);
            }
        }

        // Y pass: segment endpoints near another segment's interior.
        for &i in &order {
            let a = &segments[i];
            for (endpoint, fraction) in [(a.geometry.first(), 0.0), (a.geometry.last(), 1.0)] {
                let query = crate::models::Bbox::of_points(&[endpoint])
                    .expect("endpoint bbox")
                    .expanded_m(self.config.y_tol_m);
                for j in query_envelope(&tree, &query) {
                    if j == i {
                        continue;
                    }
                    self.resolve_y(a, endpoint, fraction, &segments[j], &mut collected);
                }
            }
        }

        let merged = self.merge_on_grid(collected);

        tracing::info!(
            segments = segments.len(),
            intersections = merged.len(),
            exact = merged.iter().filter(|p| p.kind == IntersectionKind::Exact).count(),
            y = merged.iter().filter(|p| p.kind == IntersectionKind::Y).count(),
            multipoint = merged
                .iter()
                .filter(|p| p.kind == IntersectionKind::Multipoint)
                .count(),
            "Resolved {} intersection points over {} segments",
            merged.len(),
            segments.len()
        );

        (merged, diagnostics)
    }

    /// Exact 2-D intersection of one segment pair. One point is an exact
    /// intersection; two or more are a multipoint (X- or P-shape).
    fn resolve_pair(
        &self,
        a: &Segment,
        b: &Segment,
        out: &mut Vec<IntersectionPoint>,
        diagnostics: &mut Diagnostics,
    ) {
        let lines_a: Vec<Line<f64>> = a.geometry.force_2d().lines().collect();
        let lines_b: Vec<Line<f64>> = b.geometry.force_2d().lines().collect();

        let mut points: Vec<Point3D> = Vec::new();
        let mut degenerate = false;

        for la in &lines_a {
            for lb in &lines_b {
                if !segment_bbox_overlap(la, lb) {
                    continue;
                }
                match line_intersection(*la, *lb) {
                    Some(LineIntersection::SinglePoint { intersection, .. }) => {
                        let hit = Point3D::from_2d(intersection, 0.0);
                        if points
                            .iter()
                            .all(|p| p.distance_m(&hit) > self.config.exact_tol_m)
                        {
                            points.push(hit);
                        }
                    }
                    Some(LineIntersection::Collinear { .. }) => {
                        degenerate = true;
                    }
                    None => {}
                }
            }
        }

        if degenerate {
            tracing::debug!(
                a = %a.segment_id,
                b = %b.segment_id,
                "Skipping collinear overlap between '{}' and '{}'",
                a.name,
                b.name
            );
            diagnostics.push(Diagnostic::for_subject(
                DiagnosticKind::ResolverDegenerate,
                a.segment_id,
                format!(
                    "collinear overlap between '{}' and '{}'",
                    a.name, b.name
                ),
            ));
            return;
        }

        if points.is_empty() {
            return;
        }

        let kind = if points.len() == 1 {
            IntersectionKind::Exact
        } else {
            // X: exactly two crossings, both interior to both participants.
            // P: three or more, or any crossing at a participant endpoint.
            let all_interior = points.len() == 2
                && points.iter().all(|p| {
                    self.is_interior(a, p) && self.is_interior(b, p)
                });
            tracing::debug!(
                a = %a.segment_id,
                b = %b.segment_id,
                points = points.len(),
                class = if all_interior { "X" } else { "P" },
                "Multipoint intersection"
            );
            IntersectionKind::Multipoint
        };

        for p in points {
            let on_a = a.geometry.closest_point(&p);
            let on_b = b.geometry.closest_point(&p);
            // Elevation comes from the participant geometry at the hit.
            let point = Point3D {
                lon: p.lon,
                lat: p.lat,
                elev: on_a.point.elev,
            };
            self.push_if_splitting(
                out,
                IntersectionPoint {
                    point,
                    kind,
                    participants: vec![
                        IntersectionParticipant {
                            trail_id: a.segment_id,
                            fraction: on_a.fraction,
                        },
                        IntersectionParticipant {
                            trail_id: b.segment_id,
                            fraction: on_b.fraction,
                        },
                    ],
                },
            );
        }
    }

    /// Endpoint-near-interior check for one (endpoint of A, candidate B).
    fn resolve_y(
        &self,
        a: &Segment,
        endpoint: Point3D,
        endpoint_fraction: f64,
        b: &Segment,
        out: &mut Vec<IntersectionPoint>,
    ) {
        let closest = b.geometry.closest_point(&endpoint);
        let d = closest.distance_m;

        if d > self.config.y_tol_m {
            return;
        }
        // Trivial coincidences are left to the graph snap.
        if d <= self.config.min_snap_m {
            return;
        }
        // Near-endpoint matches on B are the snap's job too.
        let f = closest.fraction;
        if f < self.config.f_min_fraction || f > 1.0 - self.config.f_min_fraction {
            return;
        }

        self.push_if_splitting(
            out,
            IntersectionPoint {
                point: closest.point,
                kind: IntersectionKind::Y,
                participants: vec![
                    IntersectionParticipant {
                        trail_id: a.segment_id,
                        fraction: endpoint_fraction,
                    },
                    IntersectionParticipant {
                        trail_id: b.segment_id,
                        fraction: f,
                    },
                ],
            },
        );
    }

    /// Suppress points that fall within `f_min` of an end on *every*
    /// participant: those are graph snaps, not splits, and emitting them
    /// would keep the resolver from reaching its fixpoint.
    fn push_if_splitting(&self, out: &mut Vec<IntersectionPoint>, point: IntersectionPoint) {
        let f_min = self.config.f_min_fraction;
        let splits_someone = point
            .participants
            .iter()
            .any(|p| p.fraction >= f_min && p.fraction <= 1.0 - f_min);
        if splits_someone {
            out.push(point);
        }
    }

    fn is_interior(&self, segment: &Segment, p: &Point3D) -> bool {
        p.distance_m(&segment.geometry.first()) > self.config.exact_tol_m
            && p.distance_m(&segment.geometry.last()) > self.config.exact_tol_m
    }

    /// Snap all points to the 6-decimal grid and merge coincident ones,
    /// combining participant lists. Output is sorted by grid key.
    fn merge_on_grid(&self, points: Vec<IntersectionPoint>) -> Vec<IntersectionPoint> {
        let mut by_cell: HashMap<(i64, i64), IntersectionPoint> = HashMap::new();

        for mut point in points {
            point.point = point.point.snapped_to_grid();
            let key = point.point.grid_key();
            match by_cell.get_mut(&key) {
                Some(existing) => {
                    let known: Vec<Uuid> = existing
                        .participants
                        .iter()
                        .map(|p| p.trail_id)
                        .collect();
                    for participant in point.participants {
                        if !known.contains(&participant.trail_id) {
                            existing.participants.push(participant);
                        }
                    }
                }
                None => {
                    by_cell.insert(key, point);
                }
            }
        }

        by_cell
            .into_iter()
            .sorted_by_key(|(key, _)| *key)
            .map(|(_, mut point)| {
                point.participants.sort_by_key(|p| p.trail_id);
                point
            })
            .collect()
    }
}

fn segment_bbox_overlap(a: &Line<f64>, b: &Line<f64>) -> bool {
    a.start.x.min(a.end.x) <= b.start.x.max(b.end.x)
        && a.start.x.max(a.end.x) >= b.start.x.min(b.end.x)
        && a.start.y.min(a.end.y) <= b.start.y.max(b.end.y)
        && a.start.y.max(a.end.y) >= b.start.y.min(b.end.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LineString3D, Trail};

    fn resolver() -> IntersectionResolver {
        IntersectionResolver::new(NetworkConfig::default())
    }

    fn segment(name: &str, points: &[(f64, f64)]) -> Segment {
        let geometry = LineString3D::new(
            points
                .iter()
                .map(|&(lon, lat)| Point3D::new(lon, lat, 0.0).unwrap())
                .collect(),
        )
        .unwrap();
        Segment::whole(&Trail::new(name, geometry))
    }

    /// Two straight 1 km trails crossing at their midpoints.
    fn crossing_pair() -> Vec<Segment> {
        let half = 500.0 / 111_194.93;
        vec![
            segment("NS", &[(2.35, 48.85 - half), (2.35, 48.85 + half)]),
            segment("EW", &[(2.35 - half / 0.658, 48.85), (2.35 + half / 0.658, 48.85)]),
        ]
    }

    #[test]
    fn cross_yields_one_exact_intersection() {
        let segments = crossing_pair();
        let (points, diags) = resolver().resolve(&segments);
        assert!(diags.is_empty());
        assert_eq!(points.len(), 1);
        let p = &points[0];
        assert_eq!(p.kind, IntersectionKind::Exact);
        assert_eq!(p.participants.len(), 2);
        for participant in &p.participants {
            assert!((participant.fraction - 0.5).abs() < 0.01);
        }
    }

    #[test]
    fn disjoint_segments_yield_nothing() {
        let a = segment("A", &[(2.35, 48.85), (2.35, 48.86)]);
        let b = segment("B", &[(2.40, 48.85), (2.40, 48.86)]);
        let (points, diags) = resolver().resolve(&[a, b]);
        assert!(points.is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn y_near_miss_within_tolerance() {
        // B runs north for 1 km; A approaches B's midpoint from the east
        // and stops ~9 m short.
        let km = 1000.0 / 111_194.93;
        let b = segment("B", &[(2.35, 48.85), (2.35, 48.85 + km)]);
        let nine_m_lon = 9.0 / (111_194.93 * (48.855_f64).to_radians().cos());
        let a = segment(
            "A",
            &[(2.36, 48.855), (2.35 + nine_m_lon, 48.855)],
        );
        let b_id = b.segment_id;

        let (points, _) = resolver().resolve(&[a, b]);
        assert_eq!(points.len(), 1);
        let p = &points[0];
        assert_eq!(p.kind, IntersectionKind::Y);
        let f = p.participant_fraction(b_id).unwrap();
        assert!((f - 0.5).abs() < 0.01, "expected midpoint foot, got {}", f);
    }

    #[test]
    fn y_rejected_when_too_close() {
        // Endpoint only 0.5 m off B: below min_snap_m, the graph snap case.
        let km = 1000.0 / 111_194.93;
        let b = segment("B", &[(2.35, 48.85), (2.35, 48.85 + km)]);
        let half_m_lon = 0.5 / (111_194.93 * (48.855_f64).to_radians().cos());
        let a = segment("A", &[(2.36, 48.855), (2.35 + half_m_lon, 48.855)]);

        let (points, _) = resolver().resolve(&[a, b]);
        assert!(points.is_empty());
    }

    #[test]
    fn y_rejected_outside_tolerance() {
        let km = 1000.0 / 111_194.93;
        let b = segment("B", &[(2.35, 48.85), (2.35, 48.85 + km)]);
        let fifteen_m_lon = 15.0 / (111_194.93 * (48.855_f64).to_radians().cos());
        let a = segment("A", &[(2.36, 48.855), (2.35 + fifteen_m_lon, 48.855)]);

        let (points, _) = resolver().resolve(&[a, b]);
        assert!(points.is_empty());
    }

    #[test]
    fn y_fraction_boundary() {
        // Foot of the perpendicular exactly at f_min along B is accepted;
        // below f_min it is left to the snap.
        let km = 1000.0 / 111_194.93;
        let b = segment("B", &[(2.35, 48.85), (2.35, 48.85 + km)]);
        let nine_m_lon = 9.0 / (111_194.93 * (48.85_f64).to_radians().cos());

        let at_fmin = segment("A1", &[(2.36, 48.85 + km * 0.021), (2.35 + nine_m_lon, 48.85 + km * 0.021)]);
        let (points, _) = resolver().resolve(&[at_fmin, b.clone()]);
        assert_eq!(points.len(), 1, "fraction just above f_min accepted");

        let below_fmin = segment("A2", &[(2.36, 48.85 + km * 0.01), (2.35 + nine_m_lon, 48.85 + km * 0.01)]);
        let (points, _) = resolver().resolve(&[below_fmin, b]);
        assert!(points.is_empty(), "fraction below f_min rejected");
    }

    #[test]
    fn x_shape_yields_multipoint() {
        // Two zigzags crossing twice, both crossings interior.
        let a = segment(
            "A",
            &[(0.0, 0.0), (0.01, 0.01), (0.02, 0.0)],
        );
        let b = segment("B", &[(0.0, 0.005), (0.02, 0.005)]);

        let (points, _) = resolver().resolve(&[a, b]);
        assert_eq!(points.len(), 2);
        for p in &points {
            assert_eq!(p.kind, IntersectionKind::Multipoint);
        }
    }

    #[test]
    fn collinear_overlap_is_degenerate() {
        let a = segment("A", &[(0.0, 0.0), (0.02, 0.0)]);
        let b = segment("B", &[(0.01, 0.0), (0.03, 0.0)]);

        let (points, diags) = resolver().resolve(&[a, b]);
        assert!(points.is_empty());
        assert_eq!(diags.count_of(DiagnosticKind::ResolverDegenerate), 1);
    }

    #[test]
    fn endpoint_touches_are_suppressed() {
        // Two segments sharing an endpoint: a snap case, not a split.
        let a = segment("A", &[(0.0, 0.0), (0.01, 0.0)]);
        let b = segment("B", &[(0.01, 0.0), (0.02, 0.01)]);

        let (points, _) = resolver().resolve(&[a, b]);
        assert!(points.is_empty());
    }
}
