use crate::models::{LineString3D, Point3D};
use petgraph::algo::connected_components;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a vertex in the noded network.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VertexKind {
    /// Degree-2 (or isolated) connection point.
    Endpoint,
    /// Junction of three or more edges.
    Intersection,
    /// Dead end of the network (degree 1); a natural route start.
    Trailhead,
}

/// A graph node: the collapsed cluster of all segment endpoints within
/// snap tolerance of one another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    /// Dense id, 1..=V.
    pub vertex_id: u32,
    pub point: Point3D,
    pub degree: u32,
    pub kind: VertexKind,
}

/// A routable edge derived from one split segment. Gain/loss and geometry
/// are stored in the canonical (source -> target) direction; reverse
/// traversal swaps gain and loss and walks the geometry backwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Dense id, 1..=E.
    pub edge_id: u32,
    pub segment_id: Uuid,
    pub original_trail_uuid: Uuid,
    pub name: String,
    pub length_km: f64,
    pub elevation_gain_m: f64,
    pub elevation_loss_m: f64,
    pub geometry: LineString3D,
    #[serde(default)]
    pub elevation_deficient: bool,
}

/// An edge traversal with a direction relative to the canonical orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectedEdge {
    pub edge: EdgeIndex,
    pub forward: bool,
}

impl DirectedEdge {
    pub fn forward(edge: EdgeIndex) -> Self {
        DirectedEdge { edge, forward: true }
    }

    pub fn backward(edge: EdgeIndex) -> Self {
        DirectedEdge { edge, forward: false }
    }

    pub fn reversed(&self) -> Self {
        DirectedEdge {
            edge: self.edge,
            forward: !self.forward,
        }
    }
}

/// The immutable routable network produced by the graph builder.
///
/// Wraps a petgraph undirected graph and adds component labels so
/// enumerators can skip unreachable source/target pairs early.
#[derive(Debug)]
pub struct TrailGraph {
    graph: UnGraph<Vertex, Edge, u32>,
    component_of: Vec<usize>,
    component_count: usize,
}

impl TrailGraph {
    /// Finalize a built graph: label connected components.
    /// Degree and kind tagging is the builder's responsibility.
    pub fn new(graph: UnGraph<Vertex, Edge, u32>) -> Self {
        let (component_of, component_count) = label_components(&graph);
        TrailGraph {
            graph,
            component_of,
            component_count,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    pub fn component_count(&self) -> usize {
        self.component_count
    }

    pub fn same_component(&self, a: NodeIndex, b: NodeIndex) -> bool {
        self.component_of[a.index()] == self.component_of[b.index()]
    }

    pub fn vertex(&self, n: NodeIndex) -> &Vertex {
        &self.graph[n]
    }

    pub fn edge(&self, e: EdgeIndex) -> &Edge {
        &self.graph[e]
    }

    /// Canonical `(source, target)` orientation of an edge.
    pub fn endpoints(&self, e: EdgeIndex) -> (NodeIndex, NodeIndex) {
        self.graph
            .edge_endpoints(e)
            .expect("edge index out of bounds")
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn edge_indices(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edge_indices()
    }

    /// Incident edges of `n` as `(edge, neighbor)` pairs, sorted by edge
    /// index for deterministic iteration order.
    pub fn incident(&self, n: NodeIndex) -> Vec<(EdgeIndex, NodeIndex)> {
        let mut out: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges(n)
            .map(|e| {
                let other = if e.source() == n { e.target() } else { e.source() };
                (e.id(), other)
            })
            .collect();
        out.sort_by_key(|(e, _)| e.index());
        out
    }

    /// All degree-1 vertices, in vertex-id order.
    pub fn trailheads(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&n| self.graph[n].kind == VertexKind::Trailhead)
            .collect()
    }

    /// Trailheads plus junctions of degree >= 3: the strategic anchor set
    /// for lollipop enumeration.
    pub fn anchor_vertices(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&n| {
                matches!(
                    self.graph[n].kind,
                    VertexKind::Trailhead | VertexKind::Intersection
                )
            })
            .collect()
    }

    /// Where a directed traversal of `d` starts and ends.
    pub fn traversal_endpoints(&self, d: DirectedEdge) -> (NodeIndex, NodeIndex) {
        let (s, t) = self.endpoints(d.edge);
        if d.forward {
            (s, t)
        } else {
            (t, s)
        }
    }

    /// Gain/loss of a directed traversal: reverse swaps gain and loss.
    pub fn traversal_gain_loss(&self, d: DirectedEdge) -> (f64, f64) {
        let edge = self.edge(d.edge);
        if d.forward {
            (edge.elevation_gain_m, edge.elevation_loss_m)
        } else {
            (edge.elevation_loss_m, edge.elevation_gain_m)
        }
    }

    /// Geometry of a directed traversal, coordinate-reversed for backward
    /// traversals.
    pub fn traversal_geometry(&self, d: DirectedEdge) -> LineString3D {
        let edge = self.edge(d.edge);
        if d.forward {
            edge.geometry.clone()
        } else {
            edge.geometry.reversed()
        }
    }

    /// Sum of all vertex degrees; must equal `2 * edge_count`.
    pub fn degree_sum(&self) -> u32 {
        self.graph
            .node_indices()
            .map(|n| self.graph[n].degree)
            .sum()
    }
}

/// Union-find over the edge set, the same way the builder clusters
/// endpoints; labels are densified in node order so they are stable for a
/// given input.
fn label_components(graph: &UnGraph<Vertex, Edge, u32>) -> (Vec<usize>, usize) {
    let mut uf = UnionFind::<usize>::new(graph.node_count());
    for edge in graph.edge_references() {
        uf.union(edge.source().index(), edge.target().index());
    }

    let mut label_of_root = vec![usize::MAX; graph.node_count()];
    let mut labels = vec![0usize; graph.node_count()];
    let mut next = 0usize;
    for n in graph.node_indices() {
        let root = uf.find(n.index());
        if label_of_root[root] == usize::MAX {
            label_of_root[root] = next;
            next += 1;
        }
        labels[n.index()] = label_of_root[root];
    }

    let count = connected_components(graph);
    debug_assert_eq!(count, next);
    (labels, count)
}
