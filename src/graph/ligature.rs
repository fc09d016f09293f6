//! Ligature construction helpers (`spec.md` §3, "Ligature").
//!
//! A ligature is a plain zero-duration [`Edge`] with `is_ligature() == true`; this
//! module holds the one invariant worth centralizing — ligatures are never cloned,
//! so every call site that might otherwise be tempted to duplicate one should come
//! through [`new_ligature_between`] instead of hand-assembling an `Edge`.

use super::Edge;
use crate::ids::{EdgeId, VertexId};

pub fn new_ligature_between(id: EdgeId, pre: VertexId, post: VertexId) -> Edge {
    Edge::new_ligature(id, pre, post)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ligature_between_is_never_cloneable_by_construction() {
        let l = new_ligature_between(EdgeId::new("l"), VertexId::new("a.post"), VertexId::new("b.pre"));
        assert!(l.is_ligature());
    }
}
