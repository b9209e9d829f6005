use crate::config::ScoreWeights;
use crate::models::{Candidate, Pattern, RouteShape, TrailGraph};

/// Gain rate (m per km) treated as a full score for the optional
/// gain-rate component.
const GAIN_RATE_CEILING_M_PER_KM: f64 = 100.0;

/// Route quality scoring: a weighted blend of distance closeness,
/// elevation closeness, trail diversity, and shape appropriateness,
/// clamped to [0, 100].
pub struct RouteScorer {
    weights: ScoreWeights,
}

impl RouteScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        RouteScorer { weights }
    }

    pub fn score(&self, graph: &TrailGraph, candidate: &Candidate, pattern: &Pattern) -> f64 {
        let w = &self.weights;

        let distance_closeness = closeness(candidate.length_km, pattern.target_distance_km);
        let elevation_closeness = if pattern.target_elevation_gain_m <= 0.0 {
            1.0
        } else if candidate
            .edges
            .iter()
            .all(|d| graph.edge(d.edge).elevation_deficient)
        {
            // Routes built entirely from trails with filled-in zero
            // elevation carry no usable gain signal; score them neutrally
            // rather than as perfectly flat.
            0.5
        } else {
            closeness(candidate.elevation_gain_m, pattern.target_elevation_gain_m)
        };

        let edge_count = candidate.edges.len().max(1);
        let diversity = candidate.unique_trail_count(graph) as f64 / edge_count as f64;

        let shape = if candidate.shape == pattern.shape { 1.0 } else { 0.0 };

        let mut total = w.distance * distance_closeness
            + w.elevation * elevation_closeness
            + w.diversity * diversity
            + w.shape * shape;
        let mut weight_sum = w.distance + w.elevation + w.diversity + w.shape;

        // The gain-rate component only applies to loop patterns.
        if pattern.shape == RouteShape::Loop && w.gain_rate > 0.0 {
            let rate = if candidate.length_km > 0.0 {
                candidate.elevation_gain_m / candidate.length_km
            } else {
                0.0
            };
            total += w.gain_rate * (rate / GAIN_RATE_CEILING_M_PER_KM).min(1.0);
            weight_sum += w.gain_rate;
        }

        if weight_sum <= 0.0 {
            return 0.0;
        }
        (total / weight_sum * 100.0).clamp(0.0, 100.0)
    }
}

fn closeness(achieved: f64, target: f64) -> f64 {
    1.0 - ((achieved - target).abs() / target).min(1.0)
}
