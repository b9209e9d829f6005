//! Stage S6: tolerance matching, scoring, deduplication, and ranking.

mod dedupe;
mod scoring;
mod tolerance;

pub use dedupe::{RejectReason, RouteDeduper};
pub use scoring::RouteScorer;
pub use tolerance::within_level;

use crate::config::MatchingConfig;
use crate::models::{Candidate, Pattern, Recommendation, TrailGraph};
use std::cmp::Ordering;

/// Matches enumerated candidates against one pattern at a time, walking
/// the tolerance ladder until the per-pattern target count is reached,
/// and returns the ranked, deduplicated recommendation set.
pub struct RouteMatcher {
    config: MatchingConfig,
    region: Option<String>,
}

struct ScoredCandidate<'c> {
    candidate: &'c Candidate,
    score: f64,
    diversity: f64,
    distance_dev: f64,
    hash: u64,
}

impl RouteMatcher {
    pub fn new(config: MatchingConfig, region: Option<String>) -> Self {
        RouteMatcher { config, region }
    }

    pub fn select(
        &self,
        graph: &TrailGraph,
        pattern: &Pattern,
        candidates: &[Candidate],
    ) -> Vec<Recommendation> {
        let scorer = RouteScorer::new(self.config.score_weights.clone());
        let target_count = self.config.target_routes_per_pattern;

        let scored: Vec<ScoredCandidate> = candidates
            .iter()
            .map(|candidate| ScoredCandidate {
                candidate,
                score: scorer.score(graph, candidate, pattern),
                diversity: candidate.unique_trail_count(graph) as f64
                    / candidate.edges.len().max(1) as f64,
                distance_dev: (candidate.length_km - pattern.target_distance_km).abs(),
                hash: candidate.sequence_hash(graph),
            })
            .collect();

        let mut deduper = RouteDeduper::new(&self.config);
        let mut accepted: Vec<&ScoredCandidate> = Vec::new();
        let mut tried: Vec<bool> = vec![false; scored.len()];

        for level in &pattern.tolerance_levels {
            let mut pool: Vec<(usize, &ScoredCandidate)> = scored
                .iter()
                .enumerate()
                .filter(|(i, s)| !tried[*i] && within_level(level, pattern, s.candidate))
                .collect();
            pool.sort_by(|(_, a), (_, b)| rank_order(a, b));

            let pool_size = pool.len();
            for (index, entry) in pool {
                if accepted.len() >= target_count {
                    break;
                }
                tried[index] = true;
                match deduper.try_accept(graph, entry.candidate) {
                    Ok(()) => accepted.push(entry),
                    Err(reason) => {
                        tracing::debug!(
                            pattern = %pattern.pattern_name,
                            reason = ?reason,
                            "Dropped duplicate candidate"
                        );
                    }
                }
            }

            tracing::info!(
                pattern = %pattern.pattern_name,
                level = %level.label,
                pool = pool_size,
                accepted = accepted.len(),
                "Tolerance level '{}': {} candidates in band, {} accepted so far",
                level.label,
                pool_size,
                accepted.len()
            );

            if accepted.len() >= target_count {
                break;
            }
        }

        if accepted.is_empty() {
            // Not an error: some patterns simply have no feasible routes.
            tracing::info!(
                pattern = %pattern.pattern_name,
                "No feasible routes for pattern"
            );
            return Vec::new();
        }

        accepted.sort_by(|a, b| rank_order(a, b));
        accepted.truncate(target_count);

        accepted
            .into_iter()
            .map(|entry| {
                Recommendation::from_candidate(
                    graph,
                    entry.candidate,
                    pattern,
                    self.region.clone(),
                    entry.score,
                    self.config.coalesce_same_name_edges,
                )
            })
            .collect()
    }
}

/// The deterministic ranking chain: score desc, diversity desc, distance
/// deviation asc, edge-sequence hash asc.
fn rank_order(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.diversity.partial_cmp(&a.diversity).unwrap_or(Ordering::Equal))
        .then_with(|| {
            a.distance_dev
                .partial_cmp(&b.distance_dev)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.hash.cmp(&b.hash))
}
