use crate::cancel::CancelToken;
use crate::config::EnumerationConfig;
use crate::models::{Candidate, DirectedEdge, RouteShape, TrailGraph};
use petgraph::graph::NodeIndex;
use rayon::prelude::*;
use std::collections::HashSet;

/// What a raw circuit turned out to be once its edge directions were
/// checked. Anything but `Loop` is removed from the loop set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitClass {
    Loop,
    /// Two edges that reverse each other: an out-and-back in disguise.
    OutAndBack,
    /// A single stretch (one edge, or disconnected after repair).
    PointToPoint,
}

/// Loop enumeration: bounded depth-first elementary-circuit search over
/// the undirected graph, Johnson-style (each circuit is rooted at its
/// smallest vertex and emitted exactly once).
pub struct LoopEnumerator<'g> {
    graph: &'g TrailGraph,
    config: EnumerationConfig,
}

impl<'g> LoopEnumerator<'g> {
    pub fn new(graph: &'g TrailGraph, config: EnumerationConfig) -> Self {
        LoopEnumerator { graph, config }
    }

    pub fn enumerate(&self, cancel: &CancelToken) -> Vec<Candidate> {
        let mut roots: Vec<NodeIndex> = self.graph.node_indices().collect();
        roots.sort_by_key(|&n| self.graph.vertex(n).vertex_id);

        let per_root: Vec<Vec<Vec<DirectedEdge>>> = roots
            .par_iter()
            .map(|&root| self.circuits_rooted_at(root, cancel))
            .collect();

        let mut candidates = Vec::new();
        'outer: for circuits in per_root {
            for edges in circuits {
                if candidates.len() >= self.config.hawick_max_rows {
                    tracing::warn!(
                        cap = self.config.hawick_max_rows,
                        "Circuit row cap reached, truncating loop enumeration"
                    );
                    break 'outer;
                }
                match classify_circuit(self.graph, &edges) {
                    (CircuitClass::Loop, repaired) => {
                        let candidate =
                            Candidate::from_traversals(self.graph, RouteShape::Loop, repaired);
                        if self.accept(&candidate) {
                            candidates.push(candidate);
                        }
                    }
                    (class, repaired) => {
                        tracing::debug!(
                            edges = repaired.len(),
                            class = ?class,
                            "Discarding degraded circuit"
                        );
                    }
                }
            }
        }

        tracing::info!(
            candidates = candidates.len(),
            "Loop enumeration produced {} circuits",
            candidates.len()
        );
        candidates
    }

    /// Elementary circuits whose smallest vertex is `root`. The DFS only
    /// descends into vertices with larger ids, and a circuit is kept only
    /// in its canonical direction (first edge id below closing edge id),
    /// so each circuit appears once.
    fn circuits_rooted_at(
        &self,
        root: NodeIndex,
        cancel: &CancelToken,
    ) -> Vec<Vec<DirectedEdge>> {
        let mut found: Vec<Vec<DirectedEdge>> = Vec::new();
        let root_id = self.graph.vertex(root).vertex_id;

        let mut stack_edges: Vec<DirectedEdge> = Vec::new();
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut length_km = 0.0;

        self.dfs(
            root,
            root,
            root_id,
            &mut stack_edges,
            &mut visited,
            &mut length_km,
            &mut found,
            cancel,
        );
        found
    }

    #[allow(clippy::too_many_arguments)]
    fn dfs(
        &self,
        root: NodeIndex,
        at: NodeIndex,
        root_id: u32,
        stack_edges: &mut Vec<DirectedEdge>,
        visited: &mut HashSet<NodeIndex>,
        length_km: &mut f64,
        found: &mut Vec<Vec<DirectedEdge>>,
        cancel: &CancelToken,
    ) {
        if found.len() >= self.config.hawick_max_rows || cancel.is_cancelled() {
            return;
        }
        visited.insert(at);

        for (edge, neighbor) in self.graph.incident(at) {
            if found.len() >= self.config.hawick_max_rows {
                break;
            }
            if stack_edges.iter().any(|d| d.edge == edge) {
                continue;
            }
            let edge_len = self.graph.edge(edge).length_km;
            if *length_km + edge_len > self.config.max_loop_km {
                continue;
            }

            let (canon_source, _) = self.graph.endpoints(edge);
            let directed = DirectedEdge {
                edge,
                forward: canon_source == at,
            };

            if neighbor == root {
                // Closing the circuit. Canonical direction only.
                if stack_edges.is_empty() {
                    continue;
                }
                if stack_edges[0].edge.index() < edge.index() {
                    let mut circuit = stack_edges.clone();
                    circuit.push(directed);
                    found.push(circuit);
                }
                continue;
            }

            if visited.contains(&neighbor) {
                continue;
            }
            // Root must be the smallest vertex of its circuits.
            if self.graph.vertex(neighbor).vertex_id <= root_id {
                continue;
            }

            stack_edges.push(directed);
            *length_km += edge_len;
            self.dfs(
                root, neighbor, root_id, stack_edges, visited, length_km, found, cancel,
            );
            *length_km -= edge_len;
            stack_edges.pop();
        }

        visited.remove(&at);
    }

    /// Validity filters on a classified loop candidate.
    fn accept(&self, candidate: &Candidate) -> bool {
        if candidate.length_km < self.config.min_loop_km
            || candidate.length_km > self.config.max_loop_km
        {
            return false;
        }
        if candidate.edges.len() < self.config.min_loop_edges {
            return false;
        }
        // Distinct edge ids
        let mut ids: Vec<_> = candidate.edges.iter().map(|d| d.edge).collect();
        ids.sort();
        ids.dedup();
        if ids.len() != candidate.edges.len() {
            return false;
        }
        // At least three distinct vertices
        let mut vertices = candidate.vertices.clone();
        vertices.sort();
        vertices.dedup();
        if vertices.len() < 3 {
            return false;
        }
        // Topologically closed
        candidate.start() == candidate.end()
    }
}

/// Direction-consistency check over a raw circuit edge list. Consecutive
/// edges must chain target-to-source; a mismatched edge is reversed once.
/// Returns the classification and the repaired traversal.
pub fn classify_circuit(
    graph: &TrailGraph,
    edges: &[DirectedEdge],
) -> (CircuitClass, Vec<DirectedEdge>) {
    if edges.is_empty() {
        return (CircuitClass::PointToPoint, Vec::new());
    }
    if edges.len() == 1 {
        return (CircuitClass::PointToPoint, edges.to_vec());
    }
    if edges.len() == 2 && edges[0].edge == edges[1].edge {
        return (CircuitClass::OutAndBack, edges.to_vec());
    }

    let mut repaired: Vec<DirectedEdge> = Vec::with_capacity(edges.len());
    repaired.push(edges[0]);

    for &next in &edges[1..] {
        let (_, cursor) = graph.traversal_endpoints(*repaired.last().unwrap());
        let (next_from, _) = graph.traversal_endpoints(next);
        if next_from == cursor {
            repaired.push(next);
        } else {
            let flipped = next.reversed();
            let (flipped_from, _) = graph.traversal_endpoints(flipped);
            if flipped_from == cursor {
                repaired.push(flipped);
            } else {
                // Disconnected even after one reversal: not a true loop.
                return (CircuitClass::PointToPoint, repaired);
            }
        }
    }

    let (first_start, _) = graph.traversal_endpoints(repaired[0]);
    let (_, last_end) = graph.traversal_endpoints(*repaired.last().unwrap());
    if first_start != last_end {
        return (CircuitClass::PointToPoint, repaired);
    }

    (CircuitClass::Loop, repaired)
}
