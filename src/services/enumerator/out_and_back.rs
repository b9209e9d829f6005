use crate::cancel::CancelToken;
use crate::config::EnumerationConfig;
use crate::models::{Candidate, Pattern, RouteShape, TrailGraph};
use crate::services::search::{bounded_dijkstra, yen_k_shortest};
use petgraph::graph::NodeIndex;
use rayon::prelude::*;

/// Out-and-back enumeration: k-shortest point-to-point paths from each
/// eligible start, reflected back on themselves.
pub struct OutAndBackEnumerator<'g> {
    graph: &'g TrailGraph,
    config: EnumerationConfig,
}

impl<'g> OutAndBackEnumerator<'g> {
    pub fn new(graph: &'g TrailGraph, config: EnumerationConfig) -> Self {
        OutAndBackEnumerator { graph, config }
    }

    pub fn enumerate(&self, pattern: &Pattern, cancel: &CancelToken) -> Vec<Candidate> {
        let half_d = pattern.target_distance_km / 2.0;
        let pct = pattern.max_distance_pct();
        let min_d = half_d * (1.0 - pct);
        let max_d = half_d * (1.0 + pct);

        let sources = self.starting_nodes();
        tracing::debug!(
            pattern = %pattern.pattern_name,
            sources = sources.len(),
            window_km = %format!("[{:.2}, {:.2}]", min_d, max_d),
            "Out-and-back enumeration from {} sources",
            sources.len()
        );

        // Collected per source, then flattened sequentially, so emission
        // order is by source vertex id regardless of thread scheduling.
        let per_source: Vec<Vec<Candidate>> = sources
            .par_iter()
            .map(|&source| self.enumerate_from(source, min_d, max_d, cancel))
            .collect();
        let candidates: Vec<Candidate> = per_source.into_iter().flatten().collect();

        tracing::info!(
            pattern = %pattern.pattern_name,
            candidates = candidates.len(),
            "Out-and-back enumeration produced {} candidates",
            candidates.len()
        );
        candidates
    }

    /// All trailheads, in vertex-id order, optionally capped.
    fn starting_nodes(&self) -> Vec<NodeIndex> {
        let mut sources = self.graph.trailheads();
        sources.sort_by_key(|&n| self.graph.vertex(n).vertex_id);
        if let Some(cap) = self.config.max_starting_nodes {
            sources.truncate(cap);
        }
        sources
    }

    fn enumerate_from(
        &self,
        source: NodeIndex,
        min_d: f64,
        max_d: f64,
        cancel: &CancelToken,
    ) -> Vec<Candidate> {
        if cancel.is_cancelled() {
            return Vec::new();
        }

        let reachable = bounded_dijkstra(self.graph, source, max_d);
        let mut destinations: Vec<(NodeIndex, f64)> = reachable
            .into_iter()
            .filter(|&(node, dist)| node != source && dist >= min_d)
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
        for (target, _) in destinations {
            if cancel.is_cancelled() {
                break;
            }
            for path in yen_k_shortest(self.graph, source, target, self.config.ksp_k) {
                if path.edges.is_empty() {
                    continue;
                }
                // Reflect: same edges walked back, gain and loss swapped,
                // geometry reversed at presentation time.
                let mut edges = path.edges.clone();
                edges.extend(path.edges.iter().rev().map(|d| d.reversed()));
                out.push(Candidate::from_traversals(
                    self.graph,
                    RouteShape::OutAndBack,
                    edges,
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testgraph;

    /// Two 1 km trails crossing at a shared midpoint: 5 vertices, 4 arms
    /// of 0.5 km each. Node 0 is the center; 1-4 are the trailheads.
    fn cross() -> TrailGraph {
        testgraph::build(
            &[
                (2.35, 48.85),
                (2.35, 48.8545),
                (2.35, 48.8455),
                (2.3568, 48.85),
                (2.3432, 48.85),
            ],
            &[
                (0, 1, 0.5),
                (0, 2, 0.5),
                (0, 3, 0.5),
                (0, 4, 0.5),
            ],
        )
    }

    #[test]
    fn cross_produces_full_diameter_routes() {
        let graph = cross();
        let enumerator = OutAndBackEnumerator::new(&graph, EnumerationConfig::default());
        let pattern = Pattern::new("2k", 2.0, 0.0, RouteShape::OutAndBack);

        let candidates = enumerator.enumerate(&pattern, &CancelToken::new());
        assert!(!candidates.is_empty());

        for candidate in &candidates {
            // Out and back: starts and ends at the same vertex, even edge
            // count, second half mirrors the first.
            assert_eq!(candidate.start(), candidate.end());
            assert_eq!(candidate.edges.len() % 2, 0);
            let half = candidate.edges.len() / 2;
            for i in 0..half {
                let fwd = candidate.edges[i];
                let ret = candidate.edges[candidate.edges.len() - 1 - i];
                assert_eq!(fwd.edge, ret.edge);
                assert_eq!(fwd.forward, !ret.forward);
            }
        }

        // Full diameters (1.0 km out) double to 2.0 km totals.
        assert!(candidates
            .iter()
            .any(|c| (c.length_km - 2.0).abs() < 1e-9));
    }

    #[test]
    fn respects_destination_window() {
        let graph = cross();
        let enumerator = OutAndBackEnumerator::new(&graph, EnumerationConfig::default());
        let mut pattern = Pattern::new("2k", 2.0, 0.0, RouteShape::OutAndBack);
        // Strict-only ladder narrows the destination window to [0.9, 1.1]
        pattern.tolerance_levels =
            vec![crate::models::ToleranceLevel::new("strict", 0.10, 0.10)];

        let candidates = enumerator.enumerate(&pattern, &CancelToken::new());
        // Center (0.5 km) falls outside the window; only full diameters
        // remain and every total is 2.0 km.
        for candidate in &candidates {
            assert!((candidate.length_km - 2.0).abs() < 1e-9);
        }
        // 4 sources x 3 opposite ends
        assert_eq!(candidates.len(), 12);
    }

    #[test]
    fn elevation_reflects_on_return() {
        use crate::services::testgraph::TestEdge;
        let graph = testgraph::build_full(
            &[(2.35, 48.85), (2.35, 48.86)],
            &[TestEdge {
                a: 0,
                b: 1,
                length_km: 1.0,
                gain_m: 100.0,
                loss_m: 20.0,
                name: "climb",
            }],
        );
        let enumerator = OutAndBackEnumerator::new(&graph, EnumerationConfig::default());
        let pattern = Pattern::new("2k", 2.0, 160.0, RouteShape::OutAndBack);

        let candidates = enumerator.enumerate(&pattern, &CancelToken::new());
        assert_eq!(candidates.len(), 2, "one per trailhead");
        for candidate in &candidates {
            // gain(P) + loss(P) both ways: 100 + 20
            assert_eq!(candidate.elevation_gain_m, 120.0);
            assert_eq!(candidate.elevation_loss_m, 120.0);
        }
    }

    #[test]
    fn cancellation_stops_enumeration() {
        let graph = cross();
        let enumerator = OutAndBackEnumerator::new(&graph, EnumerationConfig::default());
        let pattern = Pattern::new("2k", 2.0, 0.0, RouteShape::OutAndBack);

        let token = CancelToken::new();
        token.cancel();
        assert!(enumerator.enumerate(&pattern, &token).is_empty());
    }
}
