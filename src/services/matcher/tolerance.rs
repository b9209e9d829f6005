use crate::models::{Candidate, Pattern, ToleranceLevel};

/// True when the candidate sits inside the level's distance and elevation
/// bands around the pattern target.
pub fn within_level(level: &ToleranceLevel, pattern: &Pattern, candidate: &Candidate) -> bool {
    let distance_dev =
        (candidate.length_km - pattern.target_distance_km).abs() / pattern.target_distance_km;
    if distance_dev > level.distance_pct {
        return false;
    }

    // A zero elevation target accepts any gain; there is no meaningful
    // relative deviation from zero.
    if pattern.target_elevation_gain_m <= 0.0 {
        return true;
    }
    let elevation_dev = (candidate.elevation_gain_m - pattern.target_elevation_gain_m).abs()
        / pattern.target_elevation_gain_m;
    elevation_dev <= level.elevation_pct
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DirectedEdge, RouteShape};

    fn candidate(length_km: f64, gain_m: f64) -> Candidate {
        Candidate {
            shape: RouteShape::Loop,
            vertices: vec![petgraph::graph::NodeIndex::new(0)],
            edges: vec![DirectedEdge::forward(petgraph::graph::EdgeIndex::new(0))],
            length_km,
            elevation_gain_m: gain_m,
            elevation_loss_m: gain_m,
        }
    }

    #[test]
    fn both_bands_must_hold() {
        let pattern = Pattern::new("10k/300m", 10.0, 300.0, RouteShape::Loop);
        let strict = ToleranceLevel::new("strict", 0.10, 0.10);

        assert!(within_level(&strict, &pattern, &candidate(10.5, 310.0)));
        // Distance off by 20%
        assert!(!within_level(&strict, &pattern, &candidate(12.0, 300.0)));
        // Elevation off by 20%
        assert!(!within_level(&strict, &pattern, &candidate(10.0, 360.0)));
    }

    #[test]
    fn boundary_deviation_is_accepted() {
        let pattern = Pattern::new("10k", 10.0, 300.0, RouteShape::Loop);
        let strict = ToleranceLevel::new("strict", 0.10, 0.10);
        assert!(within_level(&strict, &pattern, &candidate(11.0, 330.0)));
        assert!(!within_level(&strict, &pattern, &candidate(11.001, 330.0)));
    }

    #[test]
    fn relaxed_level_admits_what_strict_rejects() {
        let pattern = Pattern::new("10k/300m", 10.0, 300.0, RouteShape::Loop);
        let strict = ToleranceLevel::new("strict", 0.10, 0.10);
        let relaxed = ToleranceLevel::new("relaxed", 0.25, 0.25);

        let c = candidate(12.0, 340.0);
        assert!(!within_level(&strict, &pattern, &c));
        assert!(within_level(&relaxed, &pattern, &c));
    }

    #[test]
    fn zero_elevation_target_accepts_any_gain() {
        let pattern = Pattern::new("flat 10k", 10.0, 0.0, RouteShape::Loop);
        let strict = ToleranceLevel::new("strict", 0.10, 0.10);
        assert!(within_level(&strict, &pattern, &candidate(10.0, 500.0)));
    }
}
