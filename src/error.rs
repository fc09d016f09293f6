//! Error types for graph construction, firing, validity tracking, and timing analysis.
//!
//! All errors implement `std::error::Error` via `thiserror`. The variants follow the
//! taxonomy in `spec.md` §7 one-for-one; nothing here is invented beyond that table.
//!
//! # Propagation policy
//!
//! - [`SageError::GraphStructure`] and [`SageError::IllegalContext`] surface
//!   immediately to the caller — they are never silently dropped.
//! - [`SageError::ResourceContention`] is pushed onto the model's warning channel by
//!   callers that hold a [`Model`](crate::collaborators::Model); it is not meant to
//!   unwind past the resource pool.
//! - [`SageError::TimeCycle`] is fatal to the analyst that raised it but never
//!   corrupts the graph it read.
//! - The Validity Service never returns this type for mismatched suspend/resume; it
//!   logs a `tracing::warn!` and continues (see `spec.md` §4.3).

use crate::ids::EdgeId;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SageError>;

/// One offending edge reported by the PERT/CPM analyst's diagnostics pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeCycleOffender {
    pub edge: EdgeId,
    pub description: String,
}

/// Sub-kind of [`SageError::GraphStructure`], named the way `spec.md` §4.1/§7 name
/// them so a caller can match on cause rather than parse the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphStructureKind {
    Cycle,
    Deadlock,
    DuplicatePreEdgeSignal,
    NonLigatureWhereLigatureRequired,
    UnsupportedGraphShape,
    InvalidOperation,
    SynchronizerOnPostVertex,
    MissingPostVertex,
}

/// Every error kind the core can raise, per `spec.md` §7.
#[derive(Error, Debug)]
pub enum SageError {
    /// Cycle detected, deadlock detected, duplicate pre-edge signal, a non-ligature
    /// found where a ligature was required, a second children-block on an
    /// already-parented edge, cloning a ligature, or a synchronizer attached to a
    /// `Post` vertex.
    #[error("graph structure error ({kind:?}): {message}")]
    GraphStructure { kind: GraphStructureKind, message: String },

    /// No path exists from start to finish, or a timing validation heuristic failed
    /// in a way that isn't a [`SageError::TimeCycle`].
    #[error("analysis failed: {0}")]
    AnalysisFailed(String),

    /// The PERT/CPM analyst's diagnostics pass found inconsistent early/late sums.
    #[error(
        "timing validation failed across {} edge(s): {}",
        offenders.len(),
        offenders.iter().map(|o| format!("{}: {}", o.edge, o.description)).collect::<Vec<_>>().join("; ")
    )]
    TimeCycle { offenders: Vec<TimeCycleOffender> },

    /// `unreserve` called with a non-matching request, or a request aborted while
    /// suspend-blocked. Callers surface this as a warning through the model, per
    /// `spec.md` §7 — it is not meant to unwind the firing engine.
    #[error("resource contention: {0}")]
    ResourceContention(String),

    /// A suspension primitive (`Join`/`Yield`) was invoked outside a suspend-capable
    /// (`Detachable`) event context.
    #[error("illegal context: {0}")]
    IllegalContext(String),

    /// A required parameter on an external collaborator contract was missing or
    /// zero-valued.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SageError {
    pub fn graph_structure(kind: GraphStructureKind, message: impl Into<String>) -> Self {
        Self::GraphStructure { kind, message: message.into() }
    }

    pub fn analysis_failed(message: impl Into<String>) -> Self {
        Self::AnalysisFailed(message.into())
    }

    pub fn time_cycle(offenders: Vec<TimeCycleOffender>) -> Self {
        Self::TimeCycle { offenders }
    }

    pub fn resource_contention(message: impl Into<String>) -> Self {
        Self::ResourceContention(message.into())
    }

    pub fn illegal_context(message: impl Into<String>) -> Self {
        Self::IllegalContext(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True for the two kinds `spec.md` §7 says must surface immediately and are
    /// never retried — useful for callers deciding whether to discard the whole
    /// [`GraphContext`](crate::context::GraphContext) rather than continue.
    pub fn is_fatal_to_context(&self) -> bool {
        matches!(self, Self::GraphStructure { .. } | Self::IllegalContext(_))
    }
}
