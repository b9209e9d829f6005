use crate::config::NetworkConfig;
use crate::error::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::models::Trail;

/// Stage S1: validate and canonicalize raw trails.
///
/// Never fatal — a trail that cannot be normalized is reported as a
/// diagnostic and skipped.
pub struct TrailNormalizer {
    config: NetworkConfig,
}

impl TrailNormalizer {
    pub fn new(config: NetworkConfig) -> Self {
        TrailNormalizer { config }
    }

    pub fn normalize(
        &self,
        trails: impl Iterator<Item = Trail>,
    ) -> (Vec<Trail>, Diagnostics) {
        let mut kept = Vec::new();
        let mut diagnostics = Diagnostics::new();
        let mut seen = 0usize;

        for trail in trails {
            seen += 1;
            match self.normalize_one(trail) {
                Ok(trail) => kept.push(trail),
                Err(diagnostic) => {
                    tracing::warn!(
                        trail = %diagnostic.subject.map(|u| u.to_string()).unwrap_or_default(),
                        reason = %diagnostic.message,
                        "Dropping trail: {}",
                        diagnostic.message
                    );
                    diagnostics.push(diagnostic);
                }
            }
        }

        tracing::info!(
            seen = seen,
            kept = kept.len(),
            dropped = diagnostics.len(),
            "Normalized {} trails ({} kept, {} dropped)",
            seen,
            kept.len(),
            diagnostics.len()
        );

        (kept, diagnostics)
    }

    fn normalize_one(&self, mut trail: Trail) -> std::result::Result<Trail, Diagnostic> {
        let id = trail.trail_id;

        if !trail.geometry.is_simple() {
            return Err(Diagnostic::for_subject(
                DiagnosticKind::InvalidGeometry,
                id,
                format!("trail '{}' is self-intersecting", trail.name),
            ));
        }

        let length_m = trail.geometry.length_m();
        if length_m < self.config.min_trail_length_m {
            return Err(Diagnostic::for_subject(
                DiagnosticKind::InvalidGeometry,
                id,
                format!(
                    "trail '{}' is {:.2} m long, below the {:.2} m minimum",
                    trail.name, length_m, self.config.min_trail_length_m
                ),
            ));
        }

        // Trails force-3D'd with all-zero elevation carry no usable
        // elevation signal; flag them so scoring can discount gain data.
        if trail.geometry.points().iter().all(|p| p.elev == 0.0) {
            trail.elevation_deficient = true;
        }

        // The geodesic value wins whenever the stored one drifts by > 1 m.
        if trail.length_inconsistent() {
            tracing::debug!(
                trail = %id,
                stored_km = trail.length_km,
                geodesic_km = length_m / 1000.0,
                "Stored length disagrees with geometry, recomputing"
            );
        }
        trail.recompute_metrics();

        Ok(trail)
    }
}
