//! Channel-branching firing managers (`spec.md` §4.2, "Channel branching").

use crate::context::GraphContext;
use crate::error::Result;
use crate::executive::Executive;
use crate::firing::engine::start_edge;
use crate::firing::policies::EdgeFiringManager;
use crate::ids::{ChannelId, EdgeId, VertexId};

/// One declared channel group: its marker and how many times it fires before the
/// cycle advances to the next group.
#[derive(Clone, Debug)]
pub struct ChannelGroup {
    pub channel: ChannelId,
    pub count: u32,
}

/// Cycles through channel groups in declaration order, firing each group's channel
/// for its declared count before advancing; the cycle restarts after the last group
/// (`spec.md` §4.2).
pub struct CountedBranchManager {
    groups: Vec<ChannelGroup>,
}

impl CountedBranchManager {
    pub fn new(groups: Vec<ChannelGroup>) -> Self {
        assert!(!groups.is_empty(), "CountedBranchManager requires at least one channel group");
        Self { groups }
    }
}

impl EdgeFiringManager for CountedBranchManager {
    fn start(&self, ctx: &mut GraphContext, vertex: &VertexId) -> Result<()> {
        ctx.firing.branch_cursor.entry(vertex.clone()).or_insert((0, self.groups[0].count));
        Ok(())
    }

    fn fire_if_appropriate(&self, ctx: &mut GraphContext, vertex: &VertexId, edge: &EdgeId, exec: &dyn Executive) -> Result<()> {
        let edge_channel = ctx.graph().edge(edge)?.channel.clone();
        let (idx, remaining) = *ctx
            .firing
            .branch_cursor
            .get(vertex)
            .expect("EdgeFiringManager::start must run before fire_if_appropriate");

        if edge_channel != self.groups[idx].channel {
            return Ok(());
        }

        start_edge(ctx, edge, exec)?;

        let next_state = if remaining <= 1 {
            let next_idx = (idx + 1) % self.groups.len();
            (next_idx, self.groups[next_idx].count)
        } else {
            (idx, remaining - 1)
        };
        ctx.firing.branch_cursor.insert(vertex.clone(), next_state);
        Ok(())
    }
}

/// A single scenario in a [`ConditionalBranchManager`]: the channel to fire when
/// `condition` (not yet implemented) selects it, the optional downstream target,
/// and an optional "master" edge for multi-edge scenarios.
pub struct BranchScenario {
    pub channel: ChannelId,
    pub target: Option<EdgeId>,
    pub master: Option<EdgeId>,
}

/// Selects one branch scenario per activation. Condition evaluation is not yet
/// implemented (`spec.md` §4.2); the manager always fires the first registered
/// scenario's channel, which is the designated default.
pub struct ConditionalBranchManager {
    scenarios: Vec<BranchScenario>,
}

impl ConditionalBranchManager {
    pub fn new(scenarios: Vec<BranchScenario>) -> Self {
        assert!(!scenarios.is_empty(), "ConditionalBranchManager requires at least one scenario");
        Self { scenarios }
    }

    fn default_channel(&self) -> &ChannelId {
        &self.scenarios[0].channel
    }
}

impl EdgeFiringManager for ConditionalBranchManager {
    fn start(&self, _ctx: &mut GraphContext, _vertex: &VertexId) -> Result<()> {
        Ok(())
    }

    fn fire_if_appropriate(&self, ctx: &mut GraphContext, _vertex: &VertexId, edge: &EdgeId, exec: &dyn Executive) -> Result<()> {
        let edge_channel = ctx.graph().edge(edge)?.channel.clone();
        if &edge_channel == self.default_channel() {
            start_edge(ctx, edge, exec)?;
        }
        Ok(())
    }
}
