use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier of the physical link between two nodes
///
/// A physical link is bidirectional and is unique for two node. I.e.
/// For all nodes `n1` and `n2` the identifier `(n1, n2)` is the
/// same as the identifier `(n2, n1)`. The direction of travel is
/// recovered from the [`PhysicalLink`] endpoints.
///
/// [`PhysicalLink`]: crate::link::PhysicalLink
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkId {
    smaller_id: NodeId,
    larger_id: NodeId,
}

/// Identifier of an antenna.
///
/// Resource usage (transmit power and spectrum) is accounted per antenna,
/// two links sharing an antenna compete for the same resources.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AntennaId(u64);

impl LinkId {
    /// create the link identifier from the given node tuple.
    ///
    /// ```
    /// # use telesim_core::{link::LinkId, node::NodeId};
    /// # let n1 = NodeId::ZERO;
    /// # let n2 = NodeId::ONE;
    /// assert_eq!(LinkId::new((n1, n2)), LinkId::new((n2, n1)));
    /// ```
    pub fn new((a, b): (NodeId, NodeId)) -> Self {
        if a < b {
            Self {
                smaller_id: a,
                larger_id: b,
            }
        } else {
            Self {
                smaller_id: b,
                larger_id: a,
            }
        }
    }

    /// get the [`NodeId`]s that compose this link identifier, smallest
    /// first.
    #[inline]
    pub fn into_nodes(self) -> (NodeId, NodeId) {
        (self.smaller_id, self.larger_id)
    }

    /// `true` if `node` is one of the two ends of the link.
    #[inline]
    pub fn connects(&self, node: NodeId) -> bool {
        self.smaller_id == node || self.larger_id == node
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}", self.smaller_id, self.larger_id)
    }
}

impl AntennaId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use = "function does not modify the current value"]
    pub(crate) fn next(self) -> Self {
        Self::new(self.0 + 1)
    }

    #[inline]
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AntennaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "antenna#{}", self.0)
    }
}
