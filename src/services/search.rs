use crate::models::{DirectedEdge, TrailGraph};
use petgraph::graph::{EdgeIndex, NodeIndex};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Cost comparison slack: path costs within this are tied and fall back to
/// the lexicographic edge-id order.
const COST_EPS: f64 = 1e-9;

/// A simple path through the graph.
#[derive(Debug, Clone)]
pub struct Path {
    pub nodes: Vec<NodeIndex>,
    pub edges: Vec<DirectedEdge>,
    pub length_km: f64,
}

impl Path {
    pub fn edge_ids(&self, graph: &TrailGraph) -> Vec<u32> {
        self.edges.iter().map(|d| graph.edge(d.edge).edge_id).collect()
    }

    fn same_edges(&self, other: &Path) -> bool {
        self.edges.len() == other.edges.len()
            && self
                .edges
                .iter()
                .zip(other.edges.iter())
                .all(|(a, b)| a.edge == b.edge)
    }
}

/// Min-heap entry; BinaryHeap is a max-heap, so the ordering is reversed.
/// Ties in cost break on the smaller node index for determinism.
#[derive(Debug, PartialEq)]
struct QueueEntry {
    cost: f64,
    node: NodeIndex,
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node.index().cmp(&self.node.index()))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Distances from `source` to every vertex reachable within `max_km`,
/// using edge length as cost.
pub fn bounded_dijkstra(
    graph: &TrailGraph,
    source: NodeIndex,
    max_km: f64,
) -> HashMap<NodeIndex, f64> {
    let mut dist: HashMap<NodeIndex, f64> = HashMap::new();
    let mut heap = BinaryHeap::new();

    dist.insert(source, 0.0);
    heap.push(QueueEntry {
        cost: 0.0,
        node: source,
    });

    while let Some(QueueEntry { cost, node }) = heap.pop() {
        if cost > *dist.get(&node).unwrap_or(&f64::INFINITY) + COST_EPS {
            continue;
        }
        for (edge, neighbor) in graph.incident(node) {
            let next = cost + graph.edge(edge).length_km;
            if next > max_km {
                continue;
            }
            if next + COST_EPS < *dist.get(&neighbor).unwrap_or(&f64::INFINITY) {
                dist.insert(neighbor, next);
                heap.push(QueueEntry {
                    cost: next,
                    node: neighbor,
                });
            }
        }
    }

    dist
}

/// Dijkstra shortest path from `source` to `target`, avoiding banned nodes
/// and edges. Cost ties prefer the smaller incoming edge id, making the
/// returned path deterministic.
pub fn shortest_path(
    graph: &TrailGraph,
    source: NodeIndex,
    target: NodeIndex,
    banned_nodes: &HashSet<NodeIndex>,
    banned_edges: &HashSet<EdgeIndex>,
) -> Option<Path> {
    if source == target || banned_nodes.contains(&source) || banned_nodes.contains(&target) {
        return None;
    }

    let mut dist: HashMap<NodeIndex, f64> = HashMap::new();
    let mut prev: HashMap<NodeIndex, (NodeIndex, EdgeIndex)> = HashMap::new();
    let mut heap = BinaryHeap::new();

    dist.insert(source, 0.0);
    heap.push(QueueEntry {
        cost: 0.0,
        node: source,
    });

    while let Some(QueueEntry { cost, node }) = heap.pop() {
        if cost > *dist.get(&node).unwrap_or(&f64::INFINITY) + COST_EPS {
            continue;
        }
        if node == target {
            break;
        }
        for (edge, neighbor) in graph.incident(node) {
            if banned_edges.contains(&edge) || banned_nodes.contains(&neighbor) {
                continue;
            }
            let next = cost + graph.edge(edge).length_km;
            let current = *dist.get(&neighbor).unwrap_or(&f64::INFINITY);
            let improves = next + COST_EPS < current;
            let tie_breaks = (next - current).abs() <= COST_EPS
                && prev
                    .get(&neighbor)
                    .map(|(_, e)| edge.index() < e.index())
                    .unwrap_or(false);
            if improves || tie_breaks {
                dist.insert(neighbor, next);
                prev.insert(neighbor, (node, edge));
                heap.push(QueueEntry {
                    cost: next,
                    node: neighbor,
                });
            }
        }
    }

    let total = *dist.get(&target)?;

    // Reconstruct from the predecessor tree.
    let mut nodes = vec![target];
    let mut edges = Vec::new();
    let mut cursor = target;
    while cursor != source {
        let (parent, edge) = *prev.get(&cursor)?;
        let (canon_source, _) = graph.endpoints(edge);
        edges.push(DirectedEdge {
            edge,
            forward: canon_source == parent,
        });
        nodes.push(parent);
        cursor = parent;
    }
    nodes.reverse();
    edges.reverse();

    Some(Path {
        nodes,
        edges,
        length_km: total,
    })
}

/// Yen's k-shortest simple paths over positive edge lengths. Results are
/// ordered by cost, ties broken by the lexicographic edge-id sequence.
pub fn yen_k_shortest(
    graph: &TrailGraph,
    source: NodeIndex,
    target: NodeIndex,
    k: usize,
) -> Vec<Path> {
    let empty_nodes = HashSet::new();
    let empty_edges = HashSet::new();

    let Some(first) = shortest_path(graph, source, target, &empty_nodes, &empty_edges) else {
        return Vec::new();
    };

    let mut accepted: Vec<Path> = vec![first];
    let mut candidates: Vec<Path> = Vec::new();

    while accepted.len() < k {
        let prev = accepted.last().expect("at least one accepted path");

        for spur_index in 0..prev.nodes.len() - 1 {
            let spur_node = prev.nodes[spur_index];
            let root_nodes = &prev.nodes[..=spur_index];
            let root_edges = &prev.edges[..spur_index];

            // Ban the next edge of every accepted path sharing this root.
            let mut banned_edges = HashSet::new();
            for path in &accepted {
                if path.edges.len() > spur_index
                    && path.nodes.len() > spur_index
                    && path.nodes[..=spur_index] == *root_nodes
                {
                    banned_edges.insert(path.edges[spur_index].edge);
                }
            }
            // Keep spur paths simple: the root interior is off limits.
            let banned_nodes: HashSet<NodeIndex> =
                root_nodes[..spur_index].iter().copied().collect();

            let Some(spur) = shortest_path(graph, spur_node, target, &banned_nodes, &banned_edges)
            else {
                continue;
            };

            let mut nodes = root_nodes.to_vec();
            nodes.extend_from_slice(&spur.nodes[1..]);
            let mut edges = root_edges.to_vec();
            edges.extend_from_slice(&spur.edges);
            let length_km: f64 = edges.iter().map(|d| graph.edge(d.edge).length_km).sum();

            let candidate = Path {
                nodes,
                edges,
                length_km,
            };

            let duplicate = accepted.iter().chain(candidates.iter())
                .any(|p| p.same_edges(&candidate));
            if !duplicate {
                candidates.push(candidate);
            }
        }

        if candidates.is_empty() {
            break;
        }

        candidates.sort_by(|a, b| compare_paths(graph, a, b));
        accepted.push(candidates.remove(0));
    }

    accepted
}

/// Total order on paths: cost first, then the edge-id sequence.
pub fn compare_paths(graph: &TrailGraph, a: &Path, b: &Path) -> Ordering {
    if (a.length_km - b.length_km).abs() > COST_EPS {
        return a
            .length_km
            .partial_cmp(&b.length_km)
            .unwrap_or(Ordering::Equal);
    }
    a.edge_ids(graph).cmp(&b.edge_ids(graph))
}
