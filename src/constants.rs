// Application-wide constants
// This module centralizes all default tolerances and limits for better maintainability

// Network building defaults (meters unless noted)
pub const DEFAULT_SNAP_TOLERANCE_M: f64 = 10.0;
pub const DEFAULT_EXACT_TOL_M: f64 = 1.0;
pub const DEFAULT_Y_TOL_M: f64 = 10.0;
pub const DEFAULT_MIN_SNAP_M: f64 = 1.0;
pub const DEFAULT_F_MIN_FRACTION: f64 = 0.02;
pub const DEFAULT_MIN_TRAIL_LENGTH_M: f64 = 5.0;
pub const DEFAULT_MIN_SEGMENT_KM: f64 = 0.005;
pub const DEFAULT_MAX_RESOLVER_ITERS: u32 = 10;

/// Allowed drift between a parent trail's length and the sum of its
/// children after splitting.
pub const LENGTH_CONSERVATION_TOLERANCE_M: f64 = 1.0;

// Enumeration defaults
pub const DEFAULT_KSP_K: usize = 8;
pub const DEFAULT_KSP_PATHS_LOLLIPOP: usize = 100;
pub const DEFAULT_MIN_OUTBOUND_KM: f64 = 0.5;
pub const DEFAULT_HAWICK_MAX_ROWS: usize = 100_000;
pub const DEFAULT_MIN_LOOP_EDGES: usize = 5;
pub const DEFAULT_MIN_LOOP_KM: f64 = 10.0;
pub const DEFAULT_MAX_LOOP_KM: f64 = 200.0;
pub const DEFAULT_OVERLAP_MAX_PCT: f64 = 30.0;
pub const DEFAULT_MAX_CANDIDATES_PER_ANCHOR: usize = 100;
pub const DEFAULT_DISTANCE_RANGE_MIN: f64 = 0.1;
pub const DEFAULT_DISTANCE_RANGE_MAX: f64 = 2.0;

// Matching and deduplication defaults
pub const DEFAULT_MIN_DISTANCE_BETWEEN_ROUTES_KM: f64 = 0.25;
pub const DEFAULT_TARGET_ROUTES_PER_PATTERN: usize = 10;

/// Under strict endpoint dedup, a later candidate sharing endpoints with an
/// accepted one survives only when at least this much longer.
pub const STRICT_ENDPOINT_LENGTH_FACTOR: f64 = 1.5;

// Score weight defaults
pub const DEFAULT_WEIGHT_DISTANCE: f64 = 0.35;
pub const DEFAULT_WEIGHT_ELEVATION: f64 = 0.35;
pub const DEFAULT_WEIGHT_DIVERSITY: f64 = 0.15;
pub const DEFAULT_WEIGHT_SHAPE: f64 = 0.15;
pub const DEFAULT_WEIGHT_GAIN_RATE: f64 = 0.0;
