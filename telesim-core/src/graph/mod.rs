mod link;

use crate::{link::PhysicalNetwork, node::NodeId};
use std::{collections::HashMap, ops};

pub use self::link::OrientedLink;

/// Handle of an [`OrientedLink`] in a [`ResourceGraph`].
///
/// Handles are only valid for the generation of the graph that produced
/// them, [`ResourceGraph::reset`] invalidates all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkHandle(usize);

/// Directed view over a [`PhysicalNetwork`], materialized lazily.
///
/// Each `(tx, rx)` pair is projected into an [`OrientedLink`] the first
/// time it is requested and memoized until the next [`ResourceGraph::reset`].
/// Resetting keeps the allocated capacity so the graph can be reused tick
/// after tick without reallocating.
#[derive(Debug, Default)]
pub struct ResourceGraph {
    links: Vec<OrientedLink>,
    index: HashMap<(NodeId, NodeId), LinkHandle>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every link of the current generation.
    pub fn reset(&mut self) {
        self.links.clear();
        self.index.clear();
    }

    /// Number of links materialized in the current generation.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Look up or materialize the link `tx → rx`.
    ///
    /// Returns `None` if `network` has no link between the two nodes.
    pub fn get<N>(&mut self, network: &N, tx: NodeId, rx: NodeId) -> Option<LinkHandle>
    where
        N: PhysicalNetwork + ?Sized,
    {
        if let Some(handle) = self.index.get(&(tx, rx)) {
            return Some(*handle);
        }

        let physical = network.physical_link(tx, rx)?;
        let link = OrientedLink::new(tx, rx, physical)?;
        let handle = LinkHandle(self.links.len());
        self.links.push(link);
        self.index.insert((tx, rx), handle);
        Some(handle)
    }
}

impl ops::Index<LinkHandle> for ResourceGraph {
    type Output = OrientedLink;

    fn index(&self, handle: LinkHandle) -> &Self::Output {
        &self.links[handle.0]
    }
}
