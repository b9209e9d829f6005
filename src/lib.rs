//! Trail route discovery over a physical trail network.
//!
//! Turns raw 3-D trail polylines into a noded routable graph, then
//! enumerates, scores, and deduplicates out-and-back, loop, and lollipop
//! route recommendations against target distance/elevation patterns.

pub mod cancel;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod spatial;

// Re-export commonly used types
pub use cancel::CancelToken;
pub use config::{Config, DedupMode, EnumerationConfig, MatchingConfig, NetworkConfig, ScoreWeights};
pub use error::{Diagnostic, DiagnosticKind, Diagnostics, PipelineError, Result, SinkError};
pub use io::{RecommendationSink, TrailSource, VecSink, VecSource};
pub use models::{
    Candidate, LineString3D, Pattern, Point3D, Recommendation, RouteShape, Segment,
    ToleranceLevel, Trail, TrailGraph,
};
pub use pipeline::{PipelineReport, RoutePipeline};
