use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::{
    Diagnostic, DiagnosticKind, Diagnostics, PipelineError, Result, SinkError,
};
use crate::io::{RecommendationSink, TrailSource};
use crate::models::{Candidate, Pattern, RouteShape, Segment, TrailGraph};
use crate::services::enumerator::{
    LollipopEnumerator, LoopEnumerator, OutAndBackEnumerator,
};
use crate::services::{
    GraphBuilder, IntersectionResolver, RouteMatcher, TrailNormalizer, TrailSplitter,
};
use std::collections::HashMap;

/// Per-run summary: stage counts plus every recoverable diagnostic.
#[derive(Debug)]
pub struct PipelineReport {
    pub trails_in: usize,
    pub trails_kept: usize,
    pub resolver_iterations: u32,
    pub intersection_points: usize,
    pub segments: usize,
    pub vertices: usize,
    pub edges: usize,
    pub components: usize,
    pub candidates_out_and_back: usize,
    pub candidates_loop: usize,
    pub candidates_lollipop: usize,
    pub recommendations_emitted: usize,
    pub diagnostics: Diagnostics,
}

/// The staged pipeline: normalize, resolve intersections to a fixpoint,
/// split, build the graph, enumerate routes in parallel, then match,
/// score, dedupe, and emit.
pub struct RoutePipeline {
    config: Config,
}

impl RoutePipeline {
    /// Validates the configuration up front; an invalid config never runs.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(RoutePipeline { config })
    }

    pub fn run(
        &self,
        source: &mut dyn TrailSource,
        patterns: &[Pattern],
        sink: &mut dyn RecommendationSink,
    ) -> Result<PipelineReport> {
        for pattern in patterns {
            pattern
                .validate()
                .map_err(PipelineError::InvalidPattern)?;
        }

        let mut diagnostics = Diagnostics::new();

        // S1: normalize.
        let normalizer = TrailNormalizer::new(self.config.network.clone());
        let mut trails_in = 0usize;
        let (trails, s1_diags) = normalizer.normalize(source.trails().inspect(|_| {
            trails_in += 1;
        }));
        let trails_kept = trails.len();
        diagnostics.extend(s1_diags);

        // S2 + S3: resolve and split, iterating to a fixpoint because new
        // endpoints introduced by splitting can themselves form Y-intersections.
        let resolver = IntersectionResolver::new(self.config.network.clone());
        let splitter = TrailSplitter::new(self.config.network.clone());

        let mut segments: Vec<Segment> = trails.iter().map(Segment::whole).collect();
        let mut resolver_iterations = 0u32;
        let mut intersection_points = 0usize;

        for iteration in 1..=self.config.network.max_resolver_iters {
            resolver_iterations = iteration;
            let (points, s2_diags) = resolver.resolve(&segments);
            diagnostics.extend(s2_diags);
            if points.is_empty() {
                break;
            }
            intersection_points += points.len();

            let (outcome, s3_diags) = splitter.split(segments, &points);
            diagnostics.extend(s3_diags);
            segments = outcome.segments;

            if outcome.splits_performed == 0 {
                break;
            }
            tracing::debug!(
                iteration = iteration,
                segments = segments.len(),
                "Resolver iteration {} complete",
                iteration
            );
        }

        // S4: build the routable graph.
        let builder = GraphBuilder::new(self.config.network.clone());
        let (graph, s4_diags) = builder.build(&segments);
        diagnostics.extend(s4_diags);
        if graph.is_empty() {
            return Err(PipelineError::EmptyGraph);
        }

        // S5: the three enumerators run as parallel jobs over the frozen
        // graph.
        let (by_pattern, loop_candidates, s5_diags) = self.enumerate(&graph, patterns);
        diagnostics.extend(s5_diags);

        let candidates_out_and_back: usize = patterns
            .iter()
            .filter(|p| p.shape == RouteShape::OutAndBack)
            .filter_map(|p| by_pattern.get(p.pattern_name.as_str()))
            .map(Vec::len)
            .sum();
        let candidates_lollipop: usize = patterns
            .iter()
            .filter(|p| p.shape == RouteShape::Lollipop)
            .filter_map(|p| by_pattern.get(p.pattern_name.as_str()))
            .map(Vec::len)
            .sum();

        // S6: match, score, dedupe, emit.
        let matcher = RouteMatcher::new(
            self.config.matching.clone(),
            self.config.region.clone(),
        );
        let mut recommendations_emitted = 0usize;

        for pattern in patterns {
            let empty = Vec::new();
            let candidates: &Vec<Candidate> = match pattern.shape {
                RouteShape::Loop => &loop_candidates,
                _ => by_pattern
                    .get(pattern.pattern_name.as_str())
                    .unwrap_or(&empty),
            };

            let recommendations = matcher.select(&graph, pattern, candidates);
            for recommendation in recommendations {
                let uuid = recommendation.route_uuid;
                match sink.emit(recommendation) {
                    Ok(()) => recommendations_emitted += 1,
                    Err(SinkError::Transient(message)) => {
                        tracing::warn!(
                            route = %uuid,
                            error = %message,
                            "Sink write failed, continuing"
                        );
                        diagnostics.push(Diagnostic::for_subject(
                            DiagnosticKind::SinkWriteFailure,
                            uuid,
                            message,
                        ));
                    }
                    Err(SinkError::Permanent(message)) => {
                        return Err(PipelineError::SinkFailure(message));
                    }
                }
            }
        }

        let report = PipelineReport {
            trails_in,
            trails_kept,
            resolver_iterations,
            intersection_points,
            segments: segments.len(),
            vertices: graph.vertex_count(),
            edges: graph.edge_count(),
            components: graph.component_count(),
            candidates_out_and_back,
            candidates_loop: loop_candidates.len(),
            candidates_lollipop,
            recommendations_emitted,
            diagnostics,
        };

        tracing::info!(
            trails = report.trails_kept,
            vertices = report.vertices,
            edges = report.edges,
            emitted = report.recommendations_emitted,
            "Pipeline complete: {} trails -> {} vertices / {} edges -> {} recommendations",
            report.trails_kept,
            report.vertices,
            report.edges,
            report.recommendations_emitted
        );

        Ok(report)
    }

    /// Run out-and-back, loop, and lollipop enumeration in parallel.
    /// Returns per-pattern candidate sets (keyed by pattern name) and the
    /// shared loop candidate pool.
    #[allow(clippy::type_complexity)]
    fn enumerate<'p>(
        &self,
        graph: &TrailGraph,
        patterns: &'p [Pattern],
    ) -> (
        HashMap<&'p str, Vec<Candidate>>,
        Vec<Candidate>,
        Diagnostics,
    ) {
        let token = match self.config.enumeration.stage_timeout {
            Some(budget) => CancelToken::with_timeout(budget),
            None => CancelToken::new(),
        };

        let oab_patterns: Vec<&Pattern> = patterns
            .iter()
            .filter(|p| p.shape == RouteShape::OutAndBack)
            .collect();
        let lollipop_patterns: Vec<&Pattern> = patterns
            .iter()
            .filter(|p| p.shape == RouteShape::Lollipop)
            .collect();
        let wants_loops = patterns.iter().any(|p| p.shape == RouteShape::Loop);

        let enumeration = self.config.enumeration.clone();
        let (oab_results, (loop_results, lollipop_results)) = rayon::join(
            || {
                let enumerator = OutAndBackEnumerator::new(graph, enumeration.clone());
                oab_patterns
                    .iter()
                    .map(|p| {
                        (
                            p.pattern_name.as_str(),
                            enumerator.enumerate(p, &token),
                        )
                    })
                    .collect::<Vec<_>>()
            },
            || {
                rayon::join(
                    || {
                        if wants_loops {
                            LoopEnumerator::new(graph, enumeration.clone()).enumerate(&token)
                        } else {
                            Vec::new()
                        }
                    },
                    || {
                        let enumerator = LollipopEnumerator::new(graph, enumeration.clone());
                        lollipop_patterns
                            .iter()
                            .map(|p| {
                                (
                                    p.pattern_name.as_str(),
                                    enumerator.enumerate(p, &token),
                                )
                            })
                            .collect::<Vec<_>>()
                    },
                )
            },
        );

        let mut diagnostics = Diagnostics::new();
        if token.is_cancelled() {
            tracing::warn!("Enumeration hit its time budget; keeping partial results");
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::EnumerationTimeout,
                "enumeration cancelled by stage timeout; partial results kept",
            ));
        }

        let mut by_pattern: HashMap<&str, Vec<Candidate>> = HashMap::new();
        for (name, candidates) in oab_results.into_iter().chain(lollipop_results) {
            by_pattern.entry(name).or_default().extend(candidates);
        }

        (by_pattern, loop_results, diagnostics)
    }
}
