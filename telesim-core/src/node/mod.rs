mod id;

pub use self::id::NodeId;

/// A vertex of a [`Topology`]: a ground station, a customer or a relay.
///
/// The node only knows which other nodes it is linked to, the resources
/// live on the antennas of the links.
///
/// [`Topology`]: crate::topology::Topology
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    neighbours: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(id: NodeId) -> Self {
        Self {
            id,
            neighbours: Vec::new(),
        }
    }

    /// Returns the unique identifier of this node.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Nodes linked to this one, in the order the links were configured.
    #[inline]
    pub fn neighbours(&self) -> &[NodeId] {
        &self.neighbours
    }

    pub(crate) fn add_neighbour(&mut self, neighbour: NodeId) {
        if !self.neighbours.contains(&neighbour) {
            self.neighbours.push(neighbour);
        }
    }

    pub(crate) fn remove_neighbour(&mut self, neighbour: NodeId) {
        self.neighbours.retain(|n| *n != neighbour);
    }
}
