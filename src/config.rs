//! Process-wide diagnostics and tolerance knobs, made explicit.
//!
//! The source system used global mutable statics for diagnostics and
//! permit-over/under-booking flags (`spec.md` §9). Those become an immutable config
//! struct threaded through constructors instead — a single per-process diagnostics
//! registry can still exist, but it is passed in explicitly rather than reached for
//! as a global.

/// Configuration shared by a [`GraphModel`](crate::graph::GraphModel), its analysts,
/// and its resource pools.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// When set, the PERT/CPM analyst runs its validation pass after every forward
    /// and backward propagation and raises [`SageError::TimeCycle`] on violation.
    pub diagnostics_mode: bool,

    /// When set, timing queries against an edge the analyst never saw return `0`
    /// instead of a [`SageError::AnalysisFailed`].
    pub permit_unknown_edges: bool,

    /// How far a [`ResourcePool`](crate::resource::ResourcePool) may go negative to
    /// service an otherwise-blocked request. `0.0` disables overbooking.
    pub permissible_overbook: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { diagnostics_mode: false, permit_unknown_edges: false, permissible_overbook: 0.0 }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_diagnostics_mode(mut self, enabled: bool) -> Self {
        self.diagnostics_mode = enabled;
        self
    }

    pub fn with_permit_unknown_edges(mut self, enabled: bool) -> Self {
        self.permit_unknown_edges = enabled;
        self
    }

    pub fn with_permissible_overbook(mut self, amount: f64) -> Self {
        self.permissible_overbook = amount;
        self
    }
}
