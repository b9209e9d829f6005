use crate::constants::*;
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Deduplication modes. Exact edge-sequence dedup always runs; the other
/// two stack on top of it when present.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DedupMode {
    ExactOnly,
    StrictEndpoint,
    SpatialDiversity,
}

/// Weights of the route-score blend. They are normalized at scoring time,
/// so they need not sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreWeights {
    pub distance: f64,
    pub elevation: f64,
    pub diversity: f64,
    pub shape: f64,
    /// Extra weight on gain-per-km for loop patterns. Off by default.
    pub gain_rate: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            distance: DEFAULT_WEIGHT_DISTANCE,
            elevation: DEFAULT_WEIGHT_ELEVATION,
            diversity: DEFAULT_WEIGHT_DIVERSITY,
            shape: DEFAULT_WEIGHT_SHAPE,
            gain_rate: DEFAULT_WEIGHT_GAIN_RATE,
        }
    }
}

/// Options for stages S1-S4: normalization, intersection resolution,
/// splitting, and graph building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Radius within which segment endpoints collapse to one vertex.
    pub snap_tolerance_m: f64,
    /// Separation below which two trails are considered truly touching.
    pub exact_tol_m: f64,
    /// Search radius for endpoint-near-interior (Y) intersections.
    pub y_tol_m: f64,
    /// Y-intersections closer than this are trivial coincidences and are
    /// left to the graph snap instead.
    pub min_snap_m: f64,
    /// Intersections within this arc fraction of a trail end do not split;
    /// they snap.
    pub f_min_fraction: f64,
    pub min_trail_length_m: f64,
    /// Edges shorter than this are geometrically null and dropped.
    pub min_segment_km: f64,
    /// Resolver / splitter fixpoint iteration cap.
    pub max_resolver_iters: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            snap_tolerance_m: DEFAULT_SNAP_TOLERANCE_M,
            exact_tol_m: DEFAULT_EXACT_TOL_M,
            y_tol_m: DEFAULT_Y_TOL_M,
            min_snap_m: DEFAULT_MIN_SNAP_M,
            f_min_fraction: DEFAULT_F_MIN_FRACTION,
            min_trail_length_m: DEFAULT_MIN_TRAIL_LENGTH_M,
            min_segment_km: DEFAULT_MIN_SEGMENT_KM,
            max_resolver_iters: DEFAULT_MAX_RESOLVER_ITERS,
        }
    }
}

/// Options for stage S5: the three route enumerators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumerationConfig {
    /// Yen's k for out-and-back point-to-point search.
    pub ksp_k: usize,
    /// Outbound/return path budget per (anchor, destination) pair.
    pub ksp_paths_lollipop: usize,
    /// Cap on the number of source vertices tried; `None` = all eligible.
    pub max_starting_nodes: Option<usize>,
    /// Cap on destinations per source; `None` = unbounded.
    pub max_destinations_per_source: Option<usize>,
    pub min_outbound_km: f64,
    /// Hard cap on enumerated circuit rows.
    pub hawick_max_rows: usize,
    pub min_loop_edges: usize,
    pub min_loop_km: f64,
    pub max_loop_km: f64,
    /// Maximum outbound/return edge overlap for lollipops, in percent.
    pub overlap_max_pct: f64,
    /// Candidate distance window as fractions of the target.
    pub distance_range_min: f64,
    pub distance_range_max: f64,
    /// Per-anchor candidate budget for lollipop pairing.
    pub max_candidates_per_anchor: usize,
    /// Soft wall-clock budget per enumerator run.
    #[serde(skip)]
    pub stage_timeout: Option<Duration>,
}

impl Default for EnumerationConfig {
    fn default() -> Self {
        EnumerationConfig {
            ksp_k: DEFAULT_KSP_K,
            ksp_paths_lollipop: DEFAULT_KSP_PATHS_LOLLIPOP,
            max_starting_nodes: None,
            max_destinations_per_source: None,
            min_outbound_km: DEFAULT_MIN_OUTBOUND_KM,
            hawick_max_rows: DEFAULT_HAWICK_MAX_ROWS,
            min_loop_edges: DEFAULT_MIN_LOOP_EDGES,
            min_loop_km: DEFAULT_MIN_LOOP_KM,
            max_loop_km: DEFAULT_MAX_LOOP_KM,
            overlap_max_pct: DEFAULT_OVERLAP_MAX_PCT,
            distance_range_min: DEFAULT_DISTANCE_RANGE_MIN,
            distance_range_max: DEFAULT_DISTANCE_RANGE_MAX,
            max_candidates_per_anchor: DEFAULT_MAX_CANDIDATES_PER_ANCHOR,
            stage_timeout: None,
        }
    }
}

/// Options for stage S6: tolerance matching, scoring, deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub target_routes_per_pattern: usize,
    pub dedup_modes: Vec<DedupMode>,
    pub min_distance_between_routes_km: f64,
    pub score_weights: ScoreWeights,
    pub coalesce_same_name_edges: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        MatchingConfig {
            target_routes_per_pattern: DEFAULT_TARGET_ROUTES_PER_PATTERN,
            dedup_modes: vec![DedupMode::ExactOnly, DedupMode::SpatialDiversity],
            min_distance_between_routes_km: DEFAULT_MIN_DISTANCE_BETWEEN_ROUTES_KM,
            score_weights: ScoreWeights::default(),
            coalesce_same_name_edges: false,
        }
    }
}

/// Full pipeline configuration. Passed to the pipeline constructor; the
/// crate holds no process-global state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Free-form region label copied onto every recommendation.
    pub region: Option<String>,
    pub network: NetworkConfig,
    pub enumeration: EnumerationConfig,
    pub matching: MatchingConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let n = &self.network;
        if n.snap_tolerance_m <= 0.0 || n.snap_tolerance_m > 1000.0 {
            return Err(PipelineError::InvalidConfig(
                "snap_tolerance_m must be between 0 and 1000 meters".to_string(),
            ));
        }
        if n.exact_tol_m <= 0.0 || n.y_tol_m <= 0.0 {
            return Err(PipelineError::InvalidConfig(
                "exact_tol_m and y_tol_m must be positive".to_string(),
            ));
        }
        if n.min_snap_m >= n.y_tol_m {
            return Err(PipelineError::InvalidConfig(format!(
                "min_snap_m ({}) must be below y_tol_m ({})",
                n.min_snap_m, n.y_tol_m
            )));
        }
        if !(0.0..0.5).contains(&n.f_min_fraction) {
            return Err(PipelineError::InvalidConfig(
                "f_min_fraction must be in [0, 0.5)".to_string(),
            ));
        }
        if n.max_resolver_iters == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_resolver_iters must be at least 1".to_string(),
            ));
        }

        let e = &self.enumeration;
        if e.ksp_k == 0 || e.ksp_paths_lollipop == 0 {
            return Err(PipelineError::InvalidConfig(
                "ksp_k and ksp_paths_lollipop must be at least 1".to_string(),
            ));
        }
        if e.min_loop_km >= e.max_loop_km {
            return Err(PipelineError::InvalidConfig(format!(
                "min_loop_km ({}) must be below max_loop_km ({})",
                e.min_loop_km, e.max_loop_km
            )));
        }
        if !(0.0..=100.0).contains(&e.overlap_max_pct) {
            return Err(PipelineError::InvalidConfig(
                "overlap_max_pct must be in [0, 100]".to_string(),
            ));
        }
        if e.distance_range_min <= 0.0 || e.distance_range_min >= e.distance_range_max {
            return Err(PipelineError::InvalidConfig(
                "distance_range_min must be positive and below distance_range_max".to_string(),
            ));
        }

        let m = &self.matching;
        if m.target_routes_per_pattern == 0 {
            return Err(PipelineError::InvalidConfig(
                "target_routes_per_pattern must be at least 1".to_string(),
            ));
        }
        if m.min_distance_between_routes_km < 0.0 {
            return Err(PipelineError::InvalidConfig(
                "min_distance_between_routes_km must be non-negative".to_string(),
            ));
        }
        let w = &m.score_weights;
        if w.distance < 0.0 || w.elevation < 0.0 || w.diversity < 0.0 || w.shape < 0.0
            || w.gain_rate < 0.0
        {
            return Err(PipelineError::InvalidConfig(
                "score weights must be non-negative".to_string(),
            ));
        }
        if w.distance + w.elevation + w.diversity + w.shape + w.gain_rate <= 0.0 {
            return Err(PipelineError::InvalidConfig(
                "at least one score weight must be positive".to_string(),
            ));
        }

        Ok(())
    }

    pub fn dedup_enabled(&self, mode: DedupMode) -> bool {
        self.matching.dedup_modes.contains(&mode)
    }
}
