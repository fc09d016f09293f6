//! Polymorphic capability objects for fire-triggers, edge-firing managers,
//! edge-receipt managers, and execution delegates.
//!
//! `spec.md` §9 calls for dynamic dispatch over these four seams rather than the
//! source's ad-hoc virtual dispatch; each becomes a small trait with the single
//! operation set `spec.md` §4.2 specifies.

use crate::context::GraphContext;
use crate::error::Result;
use crate::executive::Executive;
use crate::ids::{EdgeId, VertexId};
use std::fmt;

/// Outcome of offering a vertex's firing to its trigger, or an edge's execution
/// delegate its turn to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DelegateOutcome {
    /// The callback ran to completion synchronously.
    Completed,
    /// The callback suspended itself (`spec.md` §5, `Join`/`Yield`); the executive
    /// will drive a later call to [`ExecutionDelegate::resume`] when its wake
    /// condition is met.
    Suspended,
}

/// A vertex's replaceable fire-trigger (`spec.md` §4.2, step 1).
///
/// The default trigger either notifies the vertex's synchronizer (if any) and
/// returns, or calls straight through to `_fire_vertex`.
pub trait FireTrigger: Send + Sync {
    fn fire(&self, ctx: &mut GraphContext, vertex: &VertexId, exec: &dyn Executive) -> Result<()>;
}

/// The built-in default fire-trigger described in `spec.md` §4.2.
pub struct DefaultFireTrigger;

impl FireTrigger for DefaultFireTrigger {
    fn fire(&self, ctx: &mut GraphContext, vertex: &VertexId, exec: &dyn Executive) -> Result<()> {
        if ctx.graph().synchronizer_of(vertex).is_some() {
            crate::firing::engine::notify_synchronizer_ready(ctx, vertex, exec)
        } else {
            crate::firing::engine::fire_vertex(ctx, vertex, exec)
        }
    }
}

/// Policy object deciding which outbound edges of a vertex fire, and in what order
/// (`spec.md` §4.2, "Channel branching").
pub trait EdgeFiringManager: Send + Sync {
    /// Called once when the owning vertex's execution begins for this graph
    /// context, before any successor is offered.
    fn start(&self, ctx: &mut GraphContext, vertex: &VertexId) -> Result<()>;

    /// Decide whether `edge` should fire now; if so, fire it.
    fn fire_if_appropriate(&self, ctx: &mut GraphContext, vertex: &VertexId, edge: &EdgeId, exec: &dyn Executive) -> Result<()>;
}

/// Policy object deciding when a vertex has received enough pre-edge signals to
/// fire (`spec.md` §4.2, step 7).
pub trait EdgeReceiptManager: Send + Sync {
    /// Record that `edge` has signaled satisfaction, and fire `vertex` if the
    /// manager's rule is now met. Implementations must reject a second signal from
    /// the same edge within one execution with a fatal
    /// [`SageError::GraphStructure`](crate::error::SageError::GraphStructure).
    fn pre_edge_satisfied(&self, ctx: &mut GraphContext, vertex: &VertexId, edge: &EdgeId, exec: &dyn Executive) -> Result<()>;
}

/// Application-code callback attached to an edge (`spec.md` §3, "execution
/// delegate"). Runs once the edge's pre-vertex is satisfied.
pub trait ExecutionDelegate: Send + Sync {
    /// Begin execution. Implementations that need to suspend (see `spec.md` §5)
    /// return [`DelegateOutcome::Suspended`] after scheduling their own resumption
    /// through the [`Executive`]; the firing engine will later call [`Self::resume`].
    fn start(&self, ctx: &mut GraphContext, edge: &EdgeId, exec: &dyn Executive) -> Result<DelegateOutcome>;

    /// Continue a previously-suspended execution. The default implementation treats
    /// every delegate as non-resumable and completes immediately, which is correct
    /// for the common case of a delegate that never suspends.
    fn resume(&self, _ctx: &mut GraphContext, _edge: &EdgeId, _exec: &dyn Executive) -> Result<DelegateOutcome> {
        Ok(DelegateOutcome::Completed)
    }
}

impl fmt::Debug for dyn ExecutionDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ExecutionDelegate")
    }
}
