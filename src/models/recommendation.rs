use crate::models::{
    DirectedEdge, LineString3D, Pattern, Point3D, RouteShape, TrailGraph,
};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// An enumerated route prior to matching and scoring.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub shape: RouteShape,
    /// Visited vertices in traversal order; closed shapes repeat the first
    /// vertex at the end.
    pub vertices: Vec<NodeIndex>,
    pub edges: Vec<DirectedEdge>,
    pub length_km: f64,
    pub elevation_gain_m: f64,
    pub elevation_loss_m: f64,
}

impl Candidate {
    /// Assemble a candidate from an ordered traversal list, accumulating
    /// length and directed gain/loss. The traversal must be contiguous.
    pub fn from_traversals(
        graph: &TrailGraph,
        shape: RouteShape,
        edges: Vec<DirectedEdge>,
    ) -> Candidate {
        debug_assert!(!edges.is_empty());
        let mut vertices = Vec::with_capacity(edges.len() + 1);
        let mut length_km = 0.0;
        let mut gain = 0.0;
        let mut loss = 0.0;

        for (i, d) in edges.iter().enumerate() {
            let (from, to) = graph.traversal_endpoints(*d);
            if i == 0 {
                vertices.push(from);
            }
            debug_assert_eq!(*vertices.last().unwrap(), from, "traversal not contiguous");
            vertices.push(to);

            length_km += graph.edge(d.edge).length_km;
            let (g, l) = graph.traversal_gain_loss(*d);
            gain += g;
            loss += l;
        }

        Candidate {
            shape,
            vertices,
            edges,
            length_km,
            elevation_gain_m: gain,
            elevation_loss_m: loss,
        }
    }

    pub fn start(&self) -> NodeIndex {
        self.vertices[0]
    }

    pub fn end(&self) -> NodeIndex {
        *self.vertices.last().unwrap()
    }

    /// Ordered edge ids of the traversal.
    pub fn edge_id_sequence(&self, graph: &TrailGraph) -> Vec<u32> {
        self.edges.iter().map(|d| graph.edge(d.edge).edge_id).collect()
    }

    /// FNV-1a hash of the ordered edge-id sequence. Deterministic across
    /// runs, unlike the std hasher.
    pub fn sequence_hash(&self, graph: &TrailGraph) -> u64 {
        fnv1a(self.edge_id_sequence(graph).iter().copied())
    }

    /// Unordered endpoint-pair key: `(min, max)` of start/end vertex ids.
    pub fn endpoint_pair(&self, graph: &TrailGraph) -> (u32, u32) {
        let s = graph.vertex(self.start()).vertex_id;
        let e = graph.vertex(self.end()).vertex_id;
        (s.min(e), s.max(e))
    }

    /// Representative anchor for spatial-diversity dedup: the midpoint of
    /// the first edge's geometry.
    pub fn representative_point(&self, graph: &TrailGraph) -> Point3D {
        graph
            .edge(self.edges[0].edge)
            .geometry
            .point_at_fraction(0.5)
    }

    /// Count of distinct parent trails among the traversed edges.
    pub fn unique_trail_count(&self, graph: &TrailGraph) -> usize {
        let mut seen: Vec<Uuid> = self
            .edges
            .iter()
            .map(|d| graph.edge(d.edge).original_trail_uuid)
            .collect();
        seen.sort();
        seen.dedup();
        seen.len()
    }
}

fn fnv1a(ids: impl Iterator<Item = u32>) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for id in ids {
        for byte in id.to_le_bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(PRIME);
        }
    }
    hash
}

/// One entry of a recommendation's ordered edge list. Out-and-back returns
/// traverse the same edges with `reverse = true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteEdgeRecord {
    pub edge_id: u32,
    pub segment_id: Uuid,
    pub original_trail_uuid: Uuid,
    pub name: String,
    pub length_km: f64,
    pub elevation_gain_m: f64,
    pub elevation_loss_m: f64,
    pub reverse: bool,
}

/// Per-parent rollup of the trails a route touches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstituentTrail {
    pub original_trail_uuid: Uuid,
    pub name: String,
    pub length_km: f64,
    pub elevation_gain_m: f64,
}

/// A final, scored, deduplicated route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub route_uuid: Uuid,
    pub route_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub shape: RouteShape,
    pub input_distance_km: f64,
    pub input_elevation_gain_m: f64,
    pub length_km: f64,
    pub elevation_gain_m: f64,
    pub elevation_loss_m: f64,
    /// Concatenated traversal geometry; closed for loops and lollipops.
    pub route_path: LineString3D,
    pub route_edges: Vec<RouteEdgeRecord>,
    pub constituent_trails: Vec<ConstituentTrail>,
    pub trail_count: usize,
    /// Quality score in [0, 100].
    pub route_score: f64,
    /// `route_score / 100`.
    pub similarity_score: f64,
}

impl Recommendation {
    /// Build the output payload for an accepted candidate.
    pub fn from_candidate(
        graph: &TrailGraph,
        candidate: &Candidate,
        pattern: &Pattern,
        region: Option<String>,
        route_score: f64,
        coalesce_same_name_edges: bool,
    ) -> Recommendation {
        let route_path = concatenate_path(graph, &candidate.edges);
        let mut route_edges: Vec<RouteEdgeRecord> = candidate
            .edges
            .iter()
            .map(|d| {
                let edge = graph.edge(d.edge);
                let (gain, loss) = graph.traversal_gain_loss(*d);
                RouteEdgeRecord {
                    edge_id: edge.edge_id,
                    segment_id: edge.segment_id,
                    original_trail_uuid: edge.original_trail_uuid,
                    name: edge.name.clone(),
                    length_km: edge.length_km,
                    elevation_gain_m: gain,
                    elevation_loss_m: loss,
                    reverse: !d.forward,
                }
            })
            .collect();

        if coalesce_same_name_edges {
            route_edges = coalesce_edges(route_edges);
        }

        let constituent_trails = aggregate_constituents(graph, candidate);
        let trail_count = constituent_trails.len();

        let route_name = format!(
            "{} — {:.1} km, +{:.0} m {}",
            pattern.pattern_name, candidate.length_km, candidate.elevation_gain_m, candidate.shape
        );

        Recommendation {
            route_uuid: Uuid::new_v4(),
            route_name,
            region,
            shape: candidate.shape,
            input_distance_km: pattern.target_distance_km,
            input_elevation_gain_m: pattern.target_elevation_gain_m,
            length_km: candidate.length_km,
            elevation_gain_m: candidate.elevation_gain_m,
            elevation_loss_m: candidate.elevation_loss_m,
            route_path,
            route_edges,
            constituent_trails,
            trail_count,
            route_score,
            similarity_score: route_score / 100.0,
        }
    }
}

/// Chain the directed traversal geometries into one polyline, dropping the
/// duplicated junction point between consecutive edges.
fn concatenate_path(graph: &TrailGraph, edges: &[DirectedEdge]) -> LineString3D {
    let mut points: Vec<Point3D> = Vec::new();
    for d in edges {
        let geom = graph.traversal_geometry(*d);
        for (i, p) in geom.points().iter().enumerate() {
            if i == 0 {
                if let Some(last) = points.last() {
                    if last.same_position(p) {
                        continue;
                    }
                }
            }
            points.push(*p);
        }
    }
    LineString3D::new(points).expect("traversal geometry has extent")
}

/// Merge consecutive records that share a name and parent trail. Payload
/// cleanliness only; applied after routing, never before graph building.
fn coalesce_edges(records: Vec<RouteEdgeRecord>) -> Vec<RouteEdgeRecord> {
    let mut out: Vec<RouteEdgeRecord> = Vec::with_capacity(records.len());
    for record in records {
        match out.last_mut() {
            Some(prev)
                if prev.name == record.name
                    && prev.original_trail_uuid == record.original_trail_uuid
                    && prev.reverse == record.reverse =>
            {
                prev.length_km += record.length_km;
                prev.elevation_gain_m += record.elevation_gain_m;
                prev.elevation_loss_m += record.elevation_loss_m;
            }
            _ => out.push(record),
        }
    }
    out
}

fn aggregate_constituents(graph: &TrailGraph, candidate: &Candidate) -> Vec<ConstituentTrail> {
    let mut by_parent: HashMap<Uuid, ConstituentTrail> = HashMap::new();
    let mut seen_edges: Vec<u32> = Vec::new();

    for d in &candidate.edges {
        let edge = graph.edge(d.edge);
        // Each distinct edge contributes once, even when traversed twice
        // (out-and-back).
        if seen_edges.contains(&edge.edge_id) {
            continue;
        }
        seen_edges.push(edge.edge_id);

        by_parent
            .entry(edge.original_trail_uuid)
            .and_modify(|c| {
                c.length_km += edge.length_km;
                c.elevation_gain_m += edge.elevation_gain_m;
            })
            .or_insert_with(|| ConstituentTrail {
                original_trail_uuid: edge.original_trail_uuid,
                name: edge.name.clone(),
                length_km: edge.length_km,
                elevation_gain_m: edge.elevation_gain_m,
            });
    }

    let mut out: Vec<ConstituentTrail> = by_parent.into_values().collect();
    out.sort_by(|a, b| a.original_trail_uuid.cmp(&b.original_trail_uuid));
    out
}
