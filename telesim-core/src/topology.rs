use crate::{
    link::{Antenna, AntennaId, Band, DirectedLink, Encoding, LinkId, PhysicalLink, PhysicalNetwork},
    measure::DataRate,
    node::{Node, NodeId},
};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// An in-memory [`PhysicalNetwork`].
///
/// Nodes are created with [`Topology::new_node`], antennas with
/// [`Topology::new_antenna`] and the two are tied together by configuring
/// links between nodes with [`Topology::configure_link`].
///
/// ```
/// use telesim_core::{
///     link::{Band, Encoding},
///     topology::Topology,
/// };
///
/// let mut topology = Topology::new();
/// let band = Band { channel_width: 20e6 };
/// let encoding = Encoding { coding_rate: 1.0, modulation_bits: 1 };
///
/// let n1 = topology.new_node();
/// let n2 = topology.new_node();
/// let a1 = topology.new_antenna(1, band, encoding);
/// let a2 = topology.new_antenna(1, band, encoding);
///
/// topology
///     .configure_link(n1, n2)
///     .set_forward(a1, a2, "20mbps".parse().unwrap())
///     .set_reverse(a2, a1, "1mbps".parse().unwrap())
///     .set_length(36_000_000.0)
///     .apply()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: BTreeMap<NodeId, Node>,
    links: HashMap<LinkId, PhysicalLink>,

    /// the last assigned node ID
    ///
    /// ID 0 is never given
    node_id: NodeId,
    /// the last assigned antenna ID
    antenna_id: AntennaId,
}

/// Builder for configuring a link between two nodes.
///
/// Obtained via [`Topology::configure_link`]. Both directions must be set
/// before calling [`LinkBuilder::apply`].
pub struct LinkBuilder<'a> {
    a: NodeId,
    b: NodeId,
    forward: Option<DirectedLink>,
    reverse: Option<DirectedLink>,
    length: f64,
    topology: &'a mut Topology,
}

/// Error returned when a link cannot be configured.
#[derive(Debug, Error, PartialEq)]
pub enum TopologyError {
    #[error("Node ({node}) Not Found")]
    NodeNotFound { node: NodeId },
    #[error("Link ({link}) is missing its {direction} direction")]
    MissingDirection {
        link: LinkId,
        direction: &'static str,
    },
    #[error("Node ({node}) cannot be linked to itself")]
    SelfLink { node: NodeId },
}

impl LinkBuilder<'_> {
    /// Set the `a → b` direction of the link.
    pub fn set_forward(mut self, tx: Antenna, rx: Antenna, max_data_rate: DataRate) -> Self {
        self.forward = Some(DirectedLink {
            tx,
            rx,
            max_data_rate,
        });
        self
    }

    /// Set the `b → a` direction of the link.
    pub fn set_reverse(mut self, tx: Antenna, rx: Antenna, max_data_rate: DataRate) -> Self {
        self.reverse = Some(DirectedLink {
            tx,
            rx,
            max_data_rate,
        });
        self
    }

    /// Set the length of the link, in metres.
    pub fn set_length(mut self, length: f64) -> Self {
        self.length = length;
        self
    }

    /// Commit the link configuration to the topology.
    ///
    /// If a link already exists between these nodes it is replaced.
    pub fn apply(self) -> Result<LinkId, TopologyError> {
        let Self {
            a,
            b,
            forward,
            reverse,
            length,
            topology,
        } = self;
        let id = LinkId::new((a, b));

        if a == b {
            return Err(TopologyError::SelfLink { node: a });
        }
        for node in [a, b] {
            if !topology.nodes.contains_key(&node) {
                return Err(TopologyError::NodeNotFound { node });
            }
        }
        let forward = forward.ok_or(TopologyError::MissingDirection {
            link: id,
            direction: "forward",
        })?;
        let reverse = reverse.ok_or(TopologyError::MissingDirection {
            link: id,
            direction: "reverse",
        })?;

        if let Some(node) = topology.nodes.get_mut(&a) {
            node.add_neighbour(b);
        }
        if let Some(node) = topology.nodes.get_mut(&b) {
            node.add_neighbour(a);
        }
        topology
            .links
            .insert(id, PhysicalLink::new(a, b, forward, reverse, length));

        Ok(id)
    }
}

impl Topology {
    /// Create a new, empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new node.
    ///
    /// Node IDs are assigned sequentially starting at `1`.
    pub fn new_node(&mut self) -> NodeId {
        self.node_id = self.node_id.next();
        self.nodes.insert(self.node_id, Node::new(self.node_id));
        self.node_id
    }

    /// Create a new antenna with a fresh [`AntennaId`].
    pub fn new_antenna(&mut self, tech_level: u8, band: Band, encoding: Encoding) -> Antenna {
        self.antenna_id = self.antenna_id.next();
        Antenna {
            id: self.antenna_id,
            tech_level,
            band,
            encoding,
        }
    }

    /// Configure the link between two nodes.
    pub fn configure_link(&mut self, a: NodeId, b: NodeId) -> LinkBuilder<'_> {
        LinkBuilder {
            a,
            b,
            forward: None,
            reverse: None,
            length: 0.0,
            topology: self,
        }
    }

    /// Remove the link between two nodes, returning it if it existed.
    pub fn remove_link(&mut self, a: NodeId, b: NodeId) -> Option<PhysicalLink> {
        let link = self.links.remove(&LinkId::new((a, b)))?;
        if let Some(node) = self.nodes.get_mut(&a) {
            node.remove_neighbour(b);
        }
        if let Some(node) = self.nodes.get_mut(&b) {
            node.remove_neighbour(a);
        }
        Some(link)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn links(&self) -> impl Iterator<Item = &PhysicalLink> {
        self.links.values()
    }

    pub fn link_mut(&mut self, a: NodeId, b: NodeId) -> Option<&mut PhysicalLink> {
        self.links.get_mut(&LinkId::new((a, b)))
    }
}

impl PhysicalNetwork for Topology {
    fn neighbours(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(&node)
            .map(Node::neighbours)
            .unwrap_or_default()
    }

    fn physical_link(&self, a: NodeId, b: NodeId) -> Option<&PhysicalLink> {
        self.links.get(&LinkId::new((a, b)))
    }
}
