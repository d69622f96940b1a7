mod antenna;
mod id;

use crate::{measure::DataRate, node::NodeId};

pub use self::{
    antenna::{Antenna, Band, Encoding},
    id::{AntennaId, LinkId},
};

/// One direction of a [`PhysicalLink`]: the antennas at each end and the
/// maximum data rate the transmitter can achieve towards the receiver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectedLink {
    pub tx: Antenna,
    pub rx: Antenna,
    pub max_data_rate: DataRate,
}

/// Physical connection between two nodes.
///
/// The link is stored once for both directions: `a → b` is the forward
/// direction and `b → a` the reverse one. The data rates of the two
/// directions are independent (a ground station may transmit at 20 Mbps to
/// a relay that only answers at 1 Mbps).
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalLink {
    a: NodeId,
    b: NodeId,
    forward: DirectedLink,
    reverse: DirectedLink,
    /// distance between the two ends, in metres
    length: f64,
}

impl PhysicalLink {
    pub fn new(
        a: NodeId,
        b: NodeId,
        forward: DirectedLink,
        reverse: DirectedLink,
        length: f64,
    ) -> Self {
        Self {
            a,
            b,
            forward,
            reverse,
            length,
        }
    }

    pub fn id(&self) -> LinkId {
        LinkId::new((self.a, self.b))
    }

    #[inline]
    pub fn a(&self) -> NodeId {
        self.a
    }

    #[inline]
    pub fn b(&self) -> NodeId {
        self.b
    }

    /// Length of the link, in metres.
    #[inline]
    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn set_length(&mut self, length: f64) {
        self.length = length;
    }

    /// The direction of the link leaving `from`, `None` if `from` is not
    /// one of its ends.
    pub fn directed(&self, from: NodeId) -> Option<&DirectedLink> {
        if from == self.a {
            Some(&self.forward)
        } else if from == self.b {
            Some(&self.reverse)
        } else {
            None
        }
    }

    pub fn directed_mut(&mut self, from: NodeId) -> Option<&mut DirectedLink> {
        if from == self.a {
            Some(&mut self.forward)
        } else if from == self.b {
            Some(&mut self.reverse)
        } else {
            None
        }
    }
}

/// The physical network the router searches.
///
/// Station placement, antenna pointing and link budgets are the concern of
/// the implementor; the router only asks for the neighbours of a node and
/// for the link between two neighbours. Links are rebuilt from this
/// collaborator on every [`Router::reset`].
///
/// [`Router::reset`]: crate::router::Router::reset
pub trait PhysicalNetwork {
    /// The nodes directly linked to `node`, in a stable order.
    fn neighbours(&self, node: NodeId) -> &[NodeId];

    /// The link between `a` and `b`, in either direction.
    fn physical_link(&self, a: NodeId, b: NodeId) -> Option<&PhysicalLink>;
}

impl<T: PhysicalNetwork + ?Sized> PhysicalNetwork for &T {
    fn neighbours(&self, node: NodeId) -> &[NodeId] {
        (**self).neighbours(node)
    }

    fn physical_link(&self, a: NodeId, b: NodeId) -> Option<&PhysicalLink> {
        (**self).physical_link(a, b)
    }
}
