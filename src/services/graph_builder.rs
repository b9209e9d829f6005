use crate::config::NetworkConfig;
use crate::error::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::models::{Edge, Point3D, Segment, TrailGraph, Vertex, VertexKind};
use crate::spatial::{degree_radius, PointEntry};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use rstar::RTree;
use std::collections::HashMap;

/// Stage S4: collapse segment endpoints into vertices and emit the
/// routable graph.
pub struct GraphBuilder {
    config: NetworkConfig,
}

impl GraphBuilder {
    pub fn new(config: NetworkConfig) -> Self {
        GraphBuilder { config }
    }

    pub fn build(&self, segments: &[Segment]) -> (TrailGraph, Diagnostics) {
        let mut diagnostics = Diagnostics::new();

        // Geometrically-null segments never become edges.
        let routable: Vec<&Segment> = segments
            .iter()
            .filter(|s| {
                let keep = s.length_km >= self.config.min_segment_km;
                if !keep {
                    tracing::debug!(
                        segment = %s.segment_id,
                        length_km = s.length_km,
                        "Dropping null segment"
                    );
                }
                keep
            })
            .collect();

        // Candidate vertices: both endpoints of every segment, in input
        // order (2*i = start, 2*i + 1 = end).
        let candidates: Vec<Point3D> = routable
            .iter()
            .flat_map(|s| [s.geometry.first(), s.geometry.last()])
            .collect();

        let clusters = self.cluster_endpoints(&candidates);

        // Materialize one vertex per cluster.
        let mut graph = UnGraph::<Vertex, Edge, u32>::new_undirected();
        let mut node_of_cluster: Vec<NodeIndex> = Vec::with_capacity(clusters.len());
        for (cluster_id, members) in clusters.iter().enumerate() {
            let centroid = cluster_centroid(&candidates, members);
            let node = graph.add_node(Vertex {
                vertex_id: cluster_id as u32 + 1,
                point: centroid,
                degree: 0,
                kind: VertexKind::Endpoint,
            });
            node_of_cluster.push(node);
        }

        let mut cluster_of_candidate = vec![0usize; candidates.len()];
        for (cluster_id, members) in clusters.iter().enumerate() {
            for &m in members {
                cluster_of_candidate[m] = cluster_id;
            }
        }

        // Edge emission with duplicate rejection.
        let mut edges_between: HashMap<(NodeIndex, NodeIndex), Vec<usize>> = HashMap::new();
        let mut emitted: Vec<&Segment> = Vec::new();
        let mut next_edge_id = 1u32;

        for (i, segment) in routable.iter().enumerate() {
            let start_cluster = cluster_of_candidate[2 * i];
            let end_cluster = cluster_of_candidate[2 * i + 1];
            let source = node_of_cluster[start_cluster];
            let target = node_of_cluster[end_cluster];

            // The cluster centroid can drift away from an individual
            // endpoint; such a segment has no resolvable vertex.
            let start_drift = segment.geometry.first().distance_m(&graph[source].point);
            let end_drift = segment.geometry.last().distance_m(&graph[target].point);
            if start_drift > self.config.snap_tolerance_m
                || end_drift > self.config.snap_tolerance_m
            {
                tracing::warn!(
                    segment = %segment.segment_id,
                    start_drift_m = start_drift,
                    end_drift_m = end_drift,
                    "Dropping segment with unresolvable endpoint"
                );
                diagnostics.push(Diagnostic::for_subject(
                    DiagnosticKind::UnresolvableEndpoint,
                    segment.segment_id,
                    format!(
                        "endpoint {:.1} m from nearest vertex, beyond {:.1} m snap",
                        start_drift.max(end_drift),
                        self.config.snap_tolerance_m
                    ),
                ));
                continue;
            }

            let key = (source.min(target), source.max(target));
            let parallel = edges_between.entry(key).or_default();
            if parallel
                .iter()
                .any(|&other| same_geometry(&emitted[other].geometry, &segment.geometry))
            {
                tracing::debug!(
                    segment = %segment.segment_id,
                    "Dropping duplicate edge between vertices {:?}",
                    key
                );
                continue;
            }

            graph.add_edge(
                source,
                target,
                Edge {
                    edge_id: next_edge_id,
                    segment_id: segment.segment_id,
                    original_trail_uuid: segment.original_trail_uuid,
                    name: segment.name.clone(),
                    length_km: segment.length_km,
                    elevation_gain_m: segment.elevation_gain_m,
                    elevation_loss_m: segment.elevation_loss_m,
                    geometry: segment.geometry.clone(),
                    elevation_deficient: segment.elevation_deficient,
                },
            );
            parallel.push(emitted.len());
            emitted.push(segment);
            next_edge_id += 1;
        }

        tag_degrees_and_kinds(&mut graph);
        let trail_graph = TrailGraph::new(graph);

        tracing::info!(
            vertices = trail_graph.vertex_count(),
            edges = trail_graph.edge_count(),
            components = trail_graph.component_count(),
            dropped = diagnostics.len(),
            "Built graph: {} vertices, {} edges, {} components",
            trail_graph.vertex_count(),
            trail_graph.edge_count(),
            trail_graph.component_count()
        );

        (trail_graph, diagnostics)
    }

    /// Union-find clustering of candidate endpoints: any two candidates
    /// within `snap_tolerance_m` end up in the same cluster. Clusters are
    /// ordered by their smallest member index, keeping vertex ids stable
    /// for a given input order.
    fn cluster_endpoints(&self, candidates: &[Point3D]) -> Vec<Vec<usize>> {
        let entries: Vec<PointEntry> = candidates
            .iter()
            .enumerate()
            .map(|(i, p)| PointEntry::new(i, p.lon, p.lat))
            .collect();
        let tree = RTree::bulk_load(entries);

        let mut uf = UnionFind::<usize>::new(candidates.len());
        for (i, p) in candidates.iter().enumerate() {
            let radius = degree_radius(p.lat, self.config.snap_tolerance_m);
            for hit in tree.locate_within_distance([p.lon, p.lat], radius * radius) {
                if hit.index > i
                    && p.distance_m(&candidates[hit.index]) <= self.config.snap_tolerance_m
                {
                    uf.union(i, hit.index);
                }
            }
        }

        let mut clusters: HashMap<usize, Vec<usize>> = HashMap::new();
        for i in 0..candidates.len() {
            clusters.entry(uf.find(i)).or_default().push(i);
        }

        let mut ordered: Vec<Vec<usize>> = clusters.into_values().collect();
        for members in &mut ordered {
            members.sort_unstable();
        }
        ordered.sort_by_key(|members| members[0]);
        ordered
    }
}

/// Centroid of a cluster in 2-D, with elevation taken from the member
/// closest to the centroid.
fn cluster_centroid(candidates: &[Point3D], members: &[usize]) -> Point3D {
    let n = members.len() as f64;
    let lon = members.iter().map(|&m| candidates[m].lon).sum::<f64>() / n;
    let lat = members.iter().map(|&m| candidates[m].lat).sum::<f64>() / n;

    let planar = Point3D { lon, lat, elev: 0.0 };
    let closest = members
        .iter()
        .map(|&m| candidates[m])
        .min_by(|a, b| {
            planar
                .distance_m(a)
                .partial_cmp(&planar.distance_m(b))
                .expect("finite distances")
        })
        .expect("non-empty cluster");

    Point3D {
        lon,
        lat,
        elev: closest.elev,
    }
}

pub(crate) fn tag_degrees_and_kinds(graph: &mut UnGraph<Vertex, Edge, u32>) {
    let degrees: Vec<u32> = graph
        .node_indices()
        .map(|n| graph.edges(n).count() as u32)
        .collect();

    for (n, degree) in graph.node_indices().collect::<Vec<_>>().into_iter().zip(degrees) {
        let vertex = graph.node_weight_mut(n).expect("node exists");
        vertex.degree = degree;
        vertex.kind = match degree {
            1 => VertexKind::Trailhead,
            d if d >= 3 => VertexKind::Intersection,
            _ => VertexKind::Endpoint,
        };
    }
}

/// Geometry identity for duplicate-edge rejection: same vertex sequence in
/// either direction.
fn same_geometry(a: &crate::models::LineString3D, b: &crate::models::LineString3D) -> bool {
    let pa = a.points();
    let pb = b.points();
    if pa.len() != pb.len() {
        return false;
    }
    let forward = pa.iter().zip(pb.iter()).all(|(x, y)| x.same_position(y));
    let backward = pa
        .iter()
        .zip(pb.iter().rev())
        .all(|(x, y)| x.same_position(y));
    forward || backward
}
