//! Hand-assembled graphs for algorithm unit tests. Edge lengths are set
//! directly rather than derived from geometry so tests can use round
//! numbers.

use crate::models::{Edge, LineString3D, Point3D, TrailGraph, Vertex, VertexKind};
use petgraph::graph::UnGraph;
use std::collections::HashMap;
use uuid::Uuid;

pub struct TestEdge {
    pub a: usize,
    pub b: usize,
    pub length_km: f64,
    pub gain_m: f64,
    pub loss_m: f64,
    pub name: &'static str,
}

impl TestEdge {
    pub fn flat(a: usize, b: usize, length_km: f64, name: &'static str) -> Self {
        TestEdge {
            a,
            b,
            length_km,
            gain_m: 0.0,
            loss_m: 0.0,
            name,
        }
    }
}

/// Build a graph from `(lon, lat)` nodes and `(a, b, length_km)` edges.
/// Every edge gets its own parent trail.
pub fn build(nodes: &[(f64, f64)], edges: &[(usize, usize, f64)]) -> TrailGraph {
    let named: Vec<TestEdge> = edges
        .iter()
        .enumerate()
        .map(|(i, &(a, b, km))| TestEdge {
            a,
            b,
            length_km: km,
            gain_m: 0.0,
            loss_m: 0.0,
            name: Box::leak(format!("edge-{}", i).into_boxed_str()),
        })
        .collect();
    build_full(nodes, &named)
}

/// Build a graph with full edge control. Edges sharing a name share a
/// parent trail uuid.
pub fn build_full(nodes: &[(f64, f64)], edges: &[TestEdge]) -> TrailGraph {
    let mut graph = UnGraph::<Vertex, Edge, u32>::new_undirected();

    let indices: Vec<_> = nodes
        .iter()
        .enumerate()
        .map(|(i, &(lon, lat))| {
            graph.add_node(Vertex {
                vertex_id: i as u32 + 1,
                point: Point3D::new(lon, lat, 0.0).unwrap(),
                degree: 0,
                kind: VertexKind::Endpoint,
            })
        })
        .collect();

    let mut parent_of_name: HashMap<&str, Uuid> = HashMap::new();

    for (i, spec) in edges.iter().enumerate() {
        let start = nodes[spec.a];
        let end = nodes[spec.b];
        let mut points = vec![Point3D::new(start.0, start.1, 0.0).unwrap()];
        if spec.loss_m > 0.0 {
            // A hump in the middle produces both gain and loss.
            points.push(
                Point3D::new(
                    (start.0 + end.0) / 2.0,
                    (start.1 + end.1) / 2.0 + 1e-5,
                    spec.gain_m,
                )
                .unwrap(),
            );
        }
        points.push(Point3D::new(end.0, end.1, spec.gain_m - spec.loss_m).unwrap());

        let parent = *parent_of_name
            .entry(spec.name)
            .or_insert_with(Uuid::new_v4);

        graph.add_edge(
            indices[spec.a],
            indices[spec.b],
            Edge {
                edge_id: i as u32 + 1,
                segment_id: Uuid::new_v4(),
                original_trail_uuid: parent,
                name: spec.name.to_string(),
                length_km: spec.length_km,
                elevation_gain_m: spec.gain_m,
                elevation_loss_m: spec.loss_m,
                geometry: LineString3D::new(points).unwrap(),
                elevation_deficient: false,
            },
        );
    }

    super::graph_builder::tag_degrees_and_kinds(&mut graph);
    TrailGraph::new(graph)
}
