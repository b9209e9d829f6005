use crate::cancel::CancelToken;
use crate::config::EnumerationConfig;
use crate::models::{Candidate, Pattern, RouteShape, TrailGraph};
use crate::services::search::{bounded_dijkstra, yen_k_shortest, Path};
use petgraph::graph::NodeIndex;
use rayon::prelude::*;
use std::collections::HashSet;

/// Lollipop enumeration: an outbound stem to a destination and a return
/// path over (mostly) different edges, anchored at trailheads and
/// high-degree junctions.
pub struct LollipopEnumerator<'g> {
    graph: &'g TrailGraph,
    config: EnumerationConfig,
}

impl<'g> LollipopEnumerator<'g> {
    pub fn new(graph: &'g TrailGraph, config: EnumerationConfig) -> Self {
        LollipopEnumerator { graph, config }
    }

    pub fn enumerate(&self, pattern: &Pattern, cancel: &CancelToken) -> Vec<Candidate> {
        let target = pattern.target_distance_km;
        let total_min = self.config.distance_range_min * target;
        let total_max = self.config.distance_range_max * target;
        // The outbound stem can be at most the whole allowed total minus
        // the shortest possible return.
        let out_min = self.config.min_outbound_km;
        let out_max = total_max / 2.0;

        let mut anchors = self.graph.anchor_vertices();
        anchors.sort_by_key(|&n| self.graph.vertex(n).vertex_id);
        if let Some(cap) = self.config.max_starting_nodes {
            anchors.truncate(cap);
        }

        tracing::debug!(
            pattern = %pattern.pattern_name,
            anchors = anchors.len(),
            outbound_km = %format!("[{:.2}, {:.2}]", out_min, out_max),
            "Lollipop enumeration from {} anchors",
            anchors.len()
        );

        // Per-anchor results flattened in anchor order for determinism.
        let per_anchor: Vec<Vec<Candidate>> = anchors
            .par_iter()
            .map(|&anchor| {
                self.enumerate_from(anchor, out_min, out_max, total_min, total_max, cancel)
            })
            .collect();
        let candidates: Vec<Candidate> = per_anchor.into_iter().flatten().collect();

        tracing::info!(
            pattern = %pattern.pattern_name,
            candidates = candidates.len(),
            "Lollipop enumeration produced {} candidates",
            candidates.len()
        );
        candidates
    }

    fn enumerate_from(
        &self,
        anchor: NodeIndex,
        out_min: f64,
        out_max: f64,
        total_min: f64,
        total_max: f64,
        cancel: &CancelToken,
    ) -> Vec<Candidate> {
        if cancel.is_cancelled() {
            return Vec::new();
        }

        let reachable = bounded_dijkstra(self.graph, anchor, out_max);
        let mut destinations: Vec<(NodeIndex, f64)> = reachable
            .into_iter()
            .filter(|&(node, dist)| node != anchor && dist >= out_min)
            .collect();
        destinations.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    self.graph
                        .vertex(a.0)
                        .vertex_id
                        .cmp(&self.graph.vertex(b.0).vertex_id)
                })
        });
        if let Some(cap) = self.config.max_destinations_per_source {
            destinations.truncate(cap);
        }

        let mut out = Vec::new();
        'dest: for (destination, _) in destinations {
            if cancel.is_cancelled() {
                break;
            }

            let outbound_paths =
                yen_k_shortest(self.graph, anchor, destination, self.config.ksp_paths_lollipop);
            let return_paths =
                yen_k_shortest(self.graph, destination, anchor, self.config.ksp_paths_lollipop);

            for outbound in &outbound_paths {
                if outbound.length_km < self.config.min_outbound_km {
                    continue;
                }
                for ret in &return_paths {
                    if out.len() >= self.config.max_candidates_per_anchor {
                        break 'dest;
                    }

                    let total = outbound.length_km + ret.length_km;
                    if total < total_min || total > total_max {
                        continue;
                    }
                    if edge_overlap_pct(outbound, ret) > self.config.overlap_max_pct {
                        continue;
                    }

                    let mut edges = outbound.edges.clone();
                    edges.extend(ret.edges.iter().copied());
                    out.push(Candidate::from_traversals(
                        self.graph,
                        RouteShape::Lollipop,
                        edges,
                    ));
                }
            }
        }
        out
    }
}

/// Percentage of shared edges between two paths, relative to the longer
/// edge list.
pub fn edge_overlap_pct(a: &Path, b: &Path) -> f64 {
    if a.edges.is_empty() && b.edges.is_empty() {
        return 0.0;
    }
    let edges_a: HashSet<_> = a.edges.iter().map(|d| d.edge).collect();
    let shared = b
        .edges
        .iter()
        .map(|d| d.edge)
        .collect::<HashSet<_>>()
        .intersection(&edges_a)
        .count();
    let denom = a.edges.len().max(b.edges.len());
    shared as f64 / denom as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DirectedEdge;
    use crate::services::testgraph;

    /// A stem from node 0 to node 1, then a triangle 1-2-3-1.
    fn lollipop_graph() -> TrailGraph {
        testgraph::build(
            &[(0.0, 0.0), (0.01, 0.0), (0.02, 0.005), (0.02, -0.005)],
            &[
                (0, 1, 1.0),
                (1, 2, 1.0),
                (2, 3, 1.0),
                (3, 1, 1.0),
            ],
        )
    }

    fn config() -> EnumerationConfig {
        EnumerationConfig {
            overlap_max_pct: 40.0,
            ..EnumerationConfig::default()
        }
    }

    #[test]
    fn finds_stem_plus_loop() {
        let graph = lollipop_graph();
        let enumerator = LollipopEnumerator::new(&graph, config());
        let pattern = Pattern::new("5k lollipop", 5.0, 0.0, RouteShape::Lollipop);

        let candidates = enumerator.enumerate(&pattern, &CancelToken::new());
        assert!(!candidates.is_empty());

        // Every candidate returns to its anchor.
        for candidate in &candidates {
            assert_eq!(candidate.start(), candidate.end());
            assert_eq!(candidate.shape, RouteShape::Lollipop);
        }

        // The classic shape: stem out, around the triangle, stem back
        // (0-1, 1-2, 2-3, 3-1, 1-0) at 5 km total.
        let full = candidates
            .iter()
            .find(|c| c.edges.len() == 5 && (c.length_km - 5.0).abs() < 1e-9);
        assert!(full.is_some(), "expected the 5-edge stem+triangle+stem");
    }

    #[test]
    fn overlap_cap_rejects_pure_backtrack() {
        let graph = lollipop_graph();
        let mut cfg = config();
        cfg.overlap_max_pct = 0.0;
        // Anchor only at the stem trailhead: every way home reuses the stem.
        cfg.max_starting_nodes = Some(1);
        let enumerator = LollipopEnumerator::new(&graph, cfg);
        let pattern = Pattern::new("5k", 5.0, 0.0, RouteShape::Lollipop);

        let candidates = enumerator.enumerate(&pattern, &CancelToken::new());
        assert!(candidates.is_empty());
    }

    #[test]
    fn overlap_percentage_uses_longer_path() {
        let graph = lollipop_graph();
        let edges: Vec<_> = graph.edge_indices().collect();

        let path = |ids: &[usize], km: f64| Path {
            nodes: vec![],
            edges: ids.iter().map(|&i| DirectedEdge::forward(edges[i])).collect(),
            length_km: km,
        };

        // 2 edges vs 3 edges sharing 1: 1/3 = 33.3%
        let a = path(&[0, 1], 2.0);
        let b = path(&[1, 2, 3], 3.0);
        assert!((edge_overlap_pct(&a, &b) - 33.333).abs() < 0.01);

        // Identical paths overlap fully
        assert!((edge_overlap_pct(&a, &a) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn min_outbound_filters_short_stems() {
        let graph = lollipop_graph();
        let mut cfg = config();
        cfg.min_outbound_km = 10.0;
        let enumerator = LollipopEnumerator::new(&graph, cfg);
        let pattern = Pattern::new("5k", 5.0, 0.0, RouteShape::Lollipop);
        assert!(enumerator.enumerate(&pattern, &CancelToken::new()).is_empty());
    }

    #[test]
    fn cancelled_token_short_circuits() {
        let graph = lollipop_graph();
        let enumerator = LollipopEnumerator::new(&graph, config());
        let pattern = Pattern::new("5k", 5.0, 0.0, RouteShape::Lollipop);
        let token = CancelToken::new();
        token.cancel();
        assert!(enumerator.enumerate(&pattern, &token).is_empty());
    }
}
