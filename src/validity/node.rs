//! Shadow-graph node tracked by the Validity Service (`spec.md` §3, "Validity Node").

use crate::ids::EdgeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidityState {
    Valid,
    Invalid,
}

#[derive(Clone, Debug)]
pub struct ValidityNode {
    pub self_state: ValidityState,
    pub invalid_predecessor_count: u32,
    pub invalid_child_count: u32,
    pub parent: Option<EdgeId>,
    pub predecessors: Vec<EdgeId>,
    pub successors: Vec<EdgeId>,
    pub children: Vec<EdgeId>,
}

impl ValidityNode {
    /// `spec.md` §8, "Validity invariant": true iff self-valid and no invalid
    /// child or predecessor.
    pub fn overall(&self) -> ValidityState {
        if self.self_state == ValidityState::Valid && self.invalid_predecessor_count == 0 && self.invalid_child_count == 0 {
            ValidityState::Valid
        } else {
            ValidityState::Invalid
        }
    }
}
