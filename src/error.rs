use thiserror::Error;
use uuid::Uuid;

/// Fatal pipeline failures. Everything recoverable is a [`Diagnostic`],
/// not an error: stages skip the offending item and continue.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Graph is empty: no routable edges were produced")]
    EmptyGraph,

    #[error("Output sink failed permanently: {0}")]
    SinkFailure(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failure reported by a recommendation sink. Transient failures skip one
/// recommendation; a permanent failure aborts emission.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("transient sink failure: {0}")]
    Transient(String),

    #[error("permanent sink failure: {0}")]
    Permanent(String),
}

/// Category of a recoverable, per-item condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A trail failed validation and was dropped (S1).
    InvalidGeometry,
    /// An intersection computation produced an unexpected geometry (S2).
    ResolverDegenerate,
    /// A split failed length conservation; the trail was kept whole (S3).
    SplitLengthMismatch,
    /// A segment endpoint matched no vertex cluster; segment dropped (S4).
    UnresolvableEndpoint,
    /// An enumerator hit its cancellation deadline; partial results kept (S5).
    EnumerationTimeout,
    /// A sink write failed transiently; the recommendation was skipped (S6).
    SinkWriteFailure,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DiagnosticKind::InvalidGeometry => "invalid_geometry",
            DiagnosticKind::ResolverDegenerate => "resolver_degenerate",
            DiagnosticKind::SplitLengthMismatch => "split_length_mismatch",
            DiagnosticKind::UnresolvableEndpoint => "unresolvable_endpoint",
            DiagnosticKind::EnumerationTimeout => "enumeration_timeout",
            DiagnosticKind::SinkWriteFailure => "sink_write_failure",
        };
        write!(f, "{}", s)
    }
}

/// One recoverable incident: what happened, to which subject.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// The trail/segment the incident concerns, when there is one.
    pub subject: Option<Uuid>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            message: message.into(),
            subject: None,
        }
    }

    pub fn for_subject(kind: DiagnosticKind, subject: Uuid, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            message: message.into(),
            subject: Some(subject),
        }
    }
}

/// Accumulator every stage returns alongside its results.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }
}
