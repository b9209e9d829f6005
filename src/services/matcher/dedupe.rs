use crate::config::{DedupMode, MatchingConfig};
use crate::constants::STRICT_ENDPOINT_LENGTH_FACTOR;
use crate::models::{Candidate, Point3D, TrailGraph};
use std::collections::{HashMap, HashSet};

/// Why a candidate was refused by the deduper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    IdenticalEdgeSequence,
    SharedEndpoints,
    SpatiallyClose,
}

/// Per-pattern dedup state. Fingerprints are checked in a fixed order:
/// exact edge-sequence hash, endpoint pair, then spatial proximity of the
/// representative anchor point.
pub struct RouteDeduper {
    strict_endpoint: bool,
    spatial_diversity: bool,
    min_distance_km: f64,
    seen_hashes: HashSet<u64>,
    endpoint_lengths: HashMap<(u32, u32), f64>,
    anchors: Vec<Point3D>,
}

impl RouteDeduper {
    pub fn new(config: &MatchingConfig) -> Self {
        RouteDeduper {
            strict_endpoint: config.dedup_modes.contains(&DedupMode::StrictEndpoint),
            spatial_diversity: config.dedup_modes.contains(&DedupMode::SpatialDiversity),
            min_distance_km: config.min_distance_between_routes_km,
            seen_hashes: HashSet::new(),
            endpoint_lengths: HashMap::new(),
            anchors: Vec::new(),
        }
    }

    /// Check a candidate against all enabled fingerprints and, when it
    /// passes, record it.
    pub fn try_accept(
        &mut self,
        graph: &TrailGraph,
        candidate: &Candidate,
    ) -> Result<(), RejectReason> {
        let hash = candidate.sequence_hash(graph);
        if self.seen_hashes.contains(&hash) {
            return Err(RejectReason::IdenticalEdgeSequence);
        }

        let pair = candidate.endpoint_pair(graph);
        if self.strict_endpoint {
            if let Some(&accepted_km) = self.endpoint_lengths.get(&pair) {
                // A same-endpoints candidate survives only when it is
                // substantially longer than the accepted one.
                if candidate.length_km < accepted_km * STRICT_ENDPOINT_LENGTH_FACTOR {
                    return Err(RejectReason::SharedEndpoints);
                }
            }
        }

        let anchor = candidate.representative_point(graph);
        if self.spatial_diversity {
            let too_close = self.anchors.iter().any(|existing| {
                existing.distance_m(&anchor) / 1000.0 < self.min_distance_km
            });
            if too_close {
                return Err(RejectReason::SpatiallyClose);
            }
        }

        self.seen_hashes.insert(hash);
        self.endpoint_lengths
            .entry(pair)
            .and_modify(|km| *km = km.max(candidate.length_km))
            .or_insert(candidate.length_km);
        self.anchors.push(anchor);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use crate::config::EnumerationConfig;
    use crate::models::{Pattern, RouteShape};
    use crate::services::enumerator::OutAndBackEnumerator;
    use crate::services::testgraph;

    /// Out-and-back candidates over the 4-arm cross; one per (source,
    /// destination) pair, 12 full diameters plus shorter spurs.
    fn cross_candidates() -> (TrailGraph, Vec<Candidate>) {
        let graph = testgraph::build(
            &[
                (2.35, 48.85),
                (2.35, 48.8545),
                (2.35, 48.8455),
                (2.3568, 48.85),
                (2.3432, 48.85),
            ],
            &[(0, 1, 0.5), (0, 2, 0.5), (0, 3, 0.5), (0, 4, 0.5)],
        );
        let pattern = Pattern::new("2k", 2.0, 0.0, RouteShape::OutAndBack);
        let candidates = OutAndBackEnumerator::new(&graph, EnumerationConfig::default())
            .enumerate(&pattern, &CancelToken::new());
        (graph, candidates)
    }

    fn config_with(modes: Vec<DedupMode>) -> MatchingConfig {
        MatchingConfig {
            dedup_modes: modes,
            ..MatchingConfig::default()
        }
    }

    #[test]
    fn identical_sequence_rejected_under_any_mode() {
        let (graph, candidates) = cross_candidates();
        let c = &candidates[0];

        for modes in [
            vec![DedupMode::ExactOnly],
            vec![DedupMode::ExactOnly, DedupMode::StrictEndpoint],
            vec![DedupMode::ExactOnly, DedupMode::SpatialDiversity],
        ] {
            let mut deduper = RouteDeduper::new(&config_with(modes));
            assert!(deduper.try_accept(&graph, c).is_ok());
            assert_eq!(
                deduper.try_accept(&graph, c),
                Err(RejectReason::IdenticalEdgeSequence)
            );
        }
    }

    #[test]
    fn exact_only_keeps_distinct_sequences() {
        let (graph, candidates) = cross_candidates();
        let mut deduper = RouteDeduper::new(&config_with(vec![DedupMode::ExactOnly]));
        let accepted = candidates
            .iter()
            .filter(|c| deduper.try_accept(&graph, c).is_ok())
            .count();
        assert_eq!(accepted, candidates.len(), "no two enumerated sequences match");
    }

    #[test]
    fn strict_endpoint_collapses_same_pair() {
        let (graph, _) = cross_candidates();
        // Strict-only ladder: every candidate is a 2.0 km full diameter,
        // so none is "substantially longer" than another.
        let mut pattern = Pattern::new("2k", 2.0, 0.0, RouteShape::OutAndBack);
        pattern.tolerance_levels =
            vec![crate::models::ToleranceLevel::new("strict", 0.10, 0.10)];
        let candidates = OutAndBackEnumerator::new(&graph, EnumerationConfig::default())
            .enumerate(&pattern, &CancelToken::new());

        let mut deduper = RouteDeduper::new(&config_with(vec![
            DedupMode::ExactOnly,
            DedupMode::StrictEndpoint,
        ]));

        // Out-and-backs share start == end, so per-source everything
        // after the first candidate of similar length is rejected.
        let mut per_source: HashMap<u32, usize> = HashMap::new();
        for c in &candidates {
            if deduper.try_accept(&graph, c).is_ok() {
                *per_source
                    .entry(graph.vertex(c.start()).vertex_id)
                    .or_default() += 1;
            }
        }
        for (_, count) in per_source {
            assert_eq!(count, 1);
        }
    }

    #[test]
    fn spatial_diversity_separates_arms() {
        let (graph, candidates) = cross_candidates();
        let mut deduper = RouteDeduper::new(&config_with(vec![
            DedupMode::ExactOnly,
            DedupMode::SpatialDiversity,
        ]));

        let mut anchors_of_accepted = Vec::new();
        for c in &candidates {
            if deduper.try_accept(&graph, c).is_ok() {
                anchors_of_accepted.push(c.representative_point(&graph));
            }
        }
        // One accepted route per arm midpoint (four arms).
        assert_eq!(anchors_of_accepted.len(), 4);
        for (i, a) in anchors_of_accepted.iter().enumerate() {
            for b in &anchors_of_accepted[i + 1..] {
                assert!(a.distance_m(b) / 1000.0 >= 0.25);
            }
        }
    }
}
