use crate::config::NetworkConfig;
use crate::constants::LENGTH_CONSERVATION_TOLERANCE_M;
use crate::error::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::models::{IntersectionPoint, Segment};
use std::collections::HashMap;
use uuid::Uuid;

/// Result of one splitting pass.
pub struct SplitOutcome {
    pub segments: Vec<Segment>,
    /// Number of parents actually cut; zero means the fixpoint is reached.
    pub splits_performed: usize,
}

/// Stage S3: cut each segment at the interior intersection points that
/// fall on it. Splitting is all-or-nothing per parent: when the children
/// fail length conservation the parent is kept whole.
pub struct TrailSplitter {
    config: NetworkConfig,
}

impl TrailSplitter {
    pub fn new(config: NetworkConfig) -> Self {
        TrailSplitter { config }
    }

    pub fn split(
        &self,
        segments: Vec<Segment>,
        intersections: &[IntersectionPoint],
    ) -> (SplitOutcome, Diagnostics) {
        let mut diagnostics = Diagnostics::new();

        // Gather split fractions per participant id.
        let mut fractions: HashMap<Uuid, Vec<f64>> = HashMap::new();
        for point in intersections {
            for participant in &point.participants {
                fractions
                    .entry(participant.trail_id)
                    .or_default()
                    .push(participant.fraction);
            }
        }

        let mut out = Vec::with_capacity(segments.len());
        let mut splits_performed = 0usize;

        for segment in segments {
            let cuts = self.interior_cuts(fractions.get(&segment.segment_id));
            if cuts.is_empty() {
                out.push(segment);
                continue;
            }

            match self.split_one(&segment, &cuts) {
                Ok(children) => {
                    tracing::debug!(
                        parent = %segment.segment_id,
                        children = children.len(),
                        "Split '{}' into {} pieces",
                        segment.name,
                        children.len()
                    );
                    splits_performed += 1;
                    out.extend(children);
                }
                Err(message) => {
                    tracing::warn!(
                        parent = %segment.segment_id,
                        reason = %message,
                        "Rejecting split of '{}', keeping whole",
                        segment.name
                    );
                    diagnostics.push(Diagnostic::for_subject(
                        DiagnosticKind::SplitLengthMismatch,
                        segment.segment_id,
                        message,
                    ));
                    out.push(segment);
                }
            }
        }

        tracing::info!(
            segments = out.len(),
            splits = splits_performed,
            "Splitter produced {} segments ({} parents cut)",
            out.len(),
            splits_performed
        );

        (
            SplitOutcome {
                segments: out,
                splits_performed,
            },
            diagnostics,
        )
    }

    /// Sorted, deduplicated cut fractions, with near-end cuts dropped
    /// (those become graph snaps, not splits).
    fn interior_cuts(&self, fractions: Option<&Vec<f64>>) -> Vec<f64> {
        let f_min = self.config.f_min_fraction;
        let mut cuts: Vec<f64> = fractions
            .map(|fs| {
                fs.iter()
                    .copied()
                    .filter(|f| *f >= f_min && *f <= 1.0 - f_min)
                    .collect()
            })
            .unwrap_or_default();
        cuts.sort_by(|a, b| a.partial_cmp(b).expect("finite fractions"));
        cuts.dedup_by(|a, b| (*a - *b).abs() < 1e-7);
        cuts
    }

    fn split_one(&self, parent: &Segment, cuts: &[f64]) -> Result<Vec<Segment>, String> {
        let mut bounds = Vec::with_capacity(cuts.len() + 2);
        bounds.push(0.0);
        bounds.extend_from_slice(cuts);
        bounds.push(1.0);

        let mut children = Vec::with_capacity(bounds.len() - 1);
        for window in bounds.windows(2) {
            let piece = parent
                .geometry
                .slice(window[0], window[1])
                .map_err(|e| format!("slice [{:.4}, {:.4}] failed: {}", window[0], window[1], e))?;
            children.push(parent.derive(piece));
        }

        let parent_m = parent.geometry.length_m();
        let children_m: f64 = children.iter().map(|c| c.geometry.length_m()).sum();
        let drift = (children_m - parent_m).abs();
        if drift > LENGTH_CONSERVATION_TOLERANCE_M {
            return Err(format!(
                "length conservation violated: children sum {:.2} m vs parent {:.2} m",
                children_m, parent_m
            ));
        }

        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IntersectionKind, IntersectionParticipant, LineString3D, Point3D, Trail};

    fn splitter() -> TrailSplitter {
        TrailSplitter::new(NetworkConfig::default())
    }

    fn segment(name: &str, points: &[(f64, f64, f64)]) -> Segment {
        let geometry = LineString3D::new(
            points
                .iter()
                .map(|&(lon, lat, elev)| Point3D::new(lon, lat, elev).unwrap())
                .collect(),
        )
        .unwrap();
        Segment::whole(&Trail::new(name, geometry))
    }

    fn cut_at(segment: &Segment, fraction: f64) -> IntersectionPoint {
        IntersectionPoint {
            point: segment.geometry.point_at_fraction(fraction),
            kind: IntersectionKind::Exact,
            participants: vec![IntersectionParticipant {
                trail_id: segment.segment_id,
                fraction,
            }],
        }
    }

    #[test]
    fn midpoint_cut_produces_two_halves() {
        let parent = segment("B", &[(2.35, 48.85, 0.0), (2.35, 48.86, 0.0)]);
        let parent_m = parent.geometry.length_m();
        let cut = cut_at(&parent, 0.5);

        let (outcome, diags) = splitter().split(vec![parent.clone()], &[cut]);
        assert!(diags.is_empty());
        assert_eq!(outcome.splits_performed, 1);
        assert_eq!(outcome.segments.len(), 2);

        let sum: f64 = outcome.segments.iter().map(|s| s.geometry.length_m()).sum();
        assert!((sum - parent_m).abs() < 1.0);
        for child in &outcome.segments {
            assert_eq!(child.original_trail_uuid, parent.original_trail_uuid);
            assert!((child.geometry.length_m() - parent_m / 2.0).abs() < 1.0);
        }
    }

    #[test]
    fn near_end_cuts_are_ignored() {
        let parent = segment("B", &[(2.35, 48.85, 0.0), (2.35, 48.86, 0.0)]);
        let cuts = [cut_at(&parent, 0.005), cut_at(&parent, 0.999)];

        let (outcome, _) = splitter().split(vec![parent], &cuts);
        assert_eq!(outcome.splits_performed, 0);
        assert_eq!(outcome.segments.len(), 1);
    }

    #[test]
    fn duplicate_cuts_collapse() {
        let parent = segment("B", &[(2.35, 48.85, 0.0), (2.35, 48.86, 0.0)]);
        let cuts = [
            cut_at(&parent, 0.5),
            cut_at(&parent, 0.5 + 1e-9),
            cut_at(&parent, 0.25),
        ];

        let (outcome, _) = splitter().split(vec![parent], &cuts);
        assert_eq!(outcome.segments.len(), 3);
    }

    #[test]
    fn elevation_recomputed_per_child() {
        let parent = segment(
            "Climb",
            &[(2.35, 48.85, 100.0), (2.35, 48.855, 200.0), (2.35, 48.86, 150.0)],
        );
        let cut = cut_at(&parent, 0.5);

        let (outcome, _) = splitter().split(vec![parent], &[cut]);
        assert_eq!(outcome.segments.len(), 2);
        // First half climbs, second half descends
        assert!(outcome.segments[0].elevation_gain_m > 0.0);
        assert!(outcome.segments[1].elevation_loss_m > 0.0);
    }

    #[test]
    fn unrelated_intersections_do_not_split() {
        let a = segment("A", &[(2.35, 48.85, 0.0), (2.35, 48.86, 0.0)]);
        let b = segment("B", &[(2.40, 48.85, 0.0), (2.40, 48.86, 0.0)]);
        let cut = cut_at(&a, 0.5);

        let (outcome, _) = splitter().split(vec![b], &[cut]);
        assert_eq!(outcome.splits_performed, 0);
        assert_eq!(outcome.segments.len(), 1);
    }
}
