//! Stable identifiers for the three node kinds the graph arena owns.
//!
//! Vertices, edges, and synchronizers are identified by a stable name rather than a
//! direct reference (see `spec.md` §9 — "Back-references and cycles among objects").
//! The [`GraphModel`](crate::graph::GraphModel) resolves these through its arenas;
//! nothing outside the graph module holds a borrowed pointer to a node.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! stable_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

stable_id!(VertexId, "Stable identity of a [`Vertex`](crate::graph::Vertex).");
stable_id!(EdgeId, "Stable identity of an [`Edge`](crate::graph::Edge).");
stable_id!(SynchronizerId, "Stable identity of a [`Synchronizer`](crate::graph::Synchronizer).");

/// Singleton sentinel name every edge's channel marker defaults to.
const NULL_CHANNEL_NAME: &str = "__null_channel__";

/// Channel marker carried by an edge for firing-manager branch grouping.
///
/// Defaults to [`ChannelId::null`], matching `spec.md` §3's "Edge" invariant that
/// every edge carries a channel marker even when branching is unused.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The NULL_CHANNEL sentinel.
    pub fn null() -> Self {
        Self(NULL_CHANNEL_NAME.to_string())
    }

    pub fn is_null(&self) -> bool {
        self.0 == NULL_CHANNEL_NAME
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_channel_is_stable() {
        assert!(ChannelId::null().is_null());
        assert_eq!(ChannelId::default(), ChannelId::null());
    }

    #[test]
    fn non_null_channel_reports_as_such() {
        assert!(!ChannelId::new("loop").is_null());
    }

    #[test]
    fn ids_display_their_name() {
        let v = VertexId::new("batch.pre");
        assert_eq!(format!("{v}"), "batch.pre");
    }
}
