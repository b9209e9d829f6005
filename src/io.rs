//! The pipeline's only external contracts: a read-only trail source and a
//! recommendation sink. Ingestion and persistence live with the caller.

use crate::error::SinkError;
use crate::models::{Recommendation, Trail};

/// Provider of immutable input trails.
pub trait TrailSource {
    fn trails(&mut self) -> Box<dyn Iterator<Item = Trail> + '_>;
}

/// Receiver of accepted recommendations, called in ranked order per
/// pattern. A `Transient` failure skips one recommendation; `Permanent`
/// aborts the run.
pub trait RecommendationSink {
    fn emit(&mut self, recommendation: Recommendation) -> Result<(), SinkError>;
}

/// In-memory source for tests and embedders.
pub struct VecSource {
    trails: Vec<Trail>,
}

impl VecSource {
    pub fn new(trails: Vec<Trail>) -> Self {
        VecSource { trails }
    }
}

impl TrailSource for VecSource {
    fn trails(&mut self) -> Box<dyn Iterator<Item = Trail> + '_> {
        Box::new(self.trails.iter().cloned())
    }
}

/// In-memory sink collecting everything emitted.
#[derive(Default)]
pub struct VecSink {
    pub recommendations: Vec<Recommendation>,
}

impl VecSink {
    pub fn new() -> Self {
        VecSink::default()
    }
}

impl RecommendationSink for VecSink {
    fn emit(&mut self, recommendation: Recommendation) -> Result<(), SinkError> {
        self.recommendations.push(recommendation);
        Ok(())
    }
}
