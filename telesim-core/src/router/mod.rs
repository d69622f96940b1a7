//! Capacity and latency constrained routing.
//!
//! The [`Router`] finds the shortest (in propagation time) channels from a
//! source to one or several destinations, among the links that still have
//! the capacity to carry the requested data rate. Queries come in two
//! flavours:
//!
//! * *in isolation*: the search ignores the resources used by the other
//!   connections and does not use any (a dry run);
//! * *find and use*: the search sees the resources used so far during the
//!   tick and, on success, uses the resources the channels need.
//!
//! Connections are served in the order the queries are made: later queries
//! see the resources depleted by earlier ones.

mod channel;

use crate::{
    PriorityQueue,
    defaults::SPEED_OF_LIGHT,
    graph::{LinkHandle, ResourceGraph},
    link::{AntennaId, PhysicalNetwork},
    measure::{DataRate, Latency},
    node::NodeId,
    stats::UsageStats,
    usage::{NetworkUsage, SourcedLink},
};
use std::{
    cmp,
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};
use tracing::{debug, trace};

pub use self::channel::{Channel, Channels, Circuit, PointToMultipointAvailability};

/// Distance along a path, in metres of light travel.
#[derive(Debug, Clone, Copy)]
struct Distance(f64);

impl PartialEq for Distance {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == cmp::Ordering::Equal
    }
}
impl Eq for Distance {}
impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Distance {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Classification of the nodes for the current tick.
#[derive(Debug, Default)]
struct Partition {
    /// stations only capable of transmitting
    tx_only: HashSet<NodeId>,
    /// stations only capable of receiving
    rx_only: HashSet<NodeId>,
    /// stations tracking multiple targets simultaneously: each of their
    /// antennas really represents multiple independent antennas, neither
    /// their power nor their spectrum get used up
    multiple_tracking: HashSet<NodeId>,
}

/// The router of the network, see the [module](self) documentation.
///
/// ```
/// use telesim_core::{
///     link::{Band, Encoding},
///     measure::{DataRate, Latency},
///     router::{PointToMultipointAvailability, Router},
///     topology::Topology,
/// };
///
/// let mut topology = Topology::new();
/// let band = Band { channel_width: 1e9 };
/// let encoding = Encoding { coding_rate: 0.5, modulation_bits: 2 };
/// let (n1, n2) = (topology.new_node(), topology.new_node());
/// let (a1, a2) = (
///     topology.new_antenna(3, band, encoding),
///     topology.new_antenna(3, band, encoding),
/// );
/// topology
///     .configure_link(n1, n2)
///     .set_forward(a1, a2, "20mbps".parse().unwrap())
///     .set_reverse(a2, a1, "20mbps".parse().unwrap())
///     .set_length(3_000_000.0)
///     .apply()
///     .unwrap();
///
/// let mut router = Router::new();
/// router.reset([], [], []);
///
/// let channels = router.find_and_use_available_channels(
///     &topology,
///     n1,
///     &[n2],
///     Latency::UNLIMITED,
///     "10mbps".parse().unwrap(),
///     None,
/// );
/// assert_eq!(channels.availability(), PointToMultipointAvailability::Available);
/// assert_eq!(router.usage().tx_power_usage(a1.id), 0.5);
/// ```
#[derive(Debug, Default)]
pub struct Router {
    graph: ResourceGraph,
    usage: NetworkUsage,
    partition: Partition,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new tick.
    ///
    /// Forgets the links of the previous tick (they are rebuilt from the
    /// [`PhysicalNetwork`] as they are needed), clears the resources in use
    /// and classifies the nodes for the tick.
    pub fn reset<T, R, M>(&mut self, tx_only: T, rx_only: R, multiple_tracking: M)
    where
        T: IntoIterator<Item = NodeId>,
        R: IntoIterator<Item = NodeId>,
        M: IntoIterator<Item = NodeId>,
    {
        self.graph.reset();
        self.usage.clear();

        self.partition = Partition {
            tx_only: tx_only.into_iter().collect(),
            rx_only: rx_only.into_iter().collect(),
            multiple_tracking: multiple_tracking.into_iter().collect(),
        };
    }

    /// The resources used so far during the tick.
    pub fn usage(&self) -> &NetworkUsage {
        &self.usage
    }

    /// Snapshot of the resources used so far during the tick.
    pub fn stats(&self) -> UsageStats {
        self.usage.stats()
    }

    /// The links materialized so far during the tick.
    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    /// `false` for the nodes whose resources are never used up.
    pub fn is_limited(&self, node: NodeId) -> bool {
        !self.partition.multiple_tracking.contains(&node)
    }

    /// Find channels from `source` to each of the `destinations`, without
    /// taking into account nor using any resource.
    pub fn find_channels_in_isolation<N>(
        &mut self,
        network: &N,
        source: NodeId,
        destinations: &[NodeId],
        latency_limit: Latency,
        data_rate: DataRate,
    ) -> Channels
    where
        N: PhysicalNetwork + ?Sized,
    {
        find_channels(
            &mut self.graph,
            &self.partition,
            network,
            source,
            destinations,
            latency_limit,
            data_rate,
            NetworkUsage::none(),
        )
    }

    /// Find channels from `source` to each of the `destinations` with the
    /// resources left, and use the resources they need if *all* the
    /// destinations are reached.
    ///
    /// Links sharing a transmit antenna are used as a single broadcast: the
    /// antenna's power is used once, at the level needed by the weakest of
    /// them.
    pub fn find_and_use_available_channels<N>(
        &mut self,
        network: &N,
        source: NodeId,
        destinations: &[NodeId],
        latency_limit: Latency,
        data_rate: DataRate,
        connection: Option<Arc<str>>,
    ) -> Channels
    where
        N: PhysicalNetwork + ?Sized,
    {
        let channels = find_channels(
            &mut self.graph,
            &self.partition,
            network,
            source,
            destinations,
            latency_limit,
            data_rate,
            &self.usage,
        );

        if channels.availability() == PointToMultipointAvailability::Available {
            self.use_channels(&channels, data_rate, connection);
        }

        channels
    }

    /// Find a circuit between `source` and `destination` without taking
    /// into account nor using any resource.
    pub fn find_circuit_in_isolation<N>(
        &mut self,
        network: &N,
        source: NodeId,
        destination: NodeId,
        round_trip_latency_limit: Latency,
        one_way_data_rate: DataRate,
    ) -> Option<Circuit>
    where
        N: PhysicalNetwork + ?Sized,
    {
        find_circuit(
            &mut self.graph,
            &self.partition,
            network,
            source,
            destination,
            round_trip_latency_limit,
            one_way_data_rate,
            NetworkUsage::none(),
        )
    }

    /// Find a circuit between `source` and `destination` with the resources
    /// left, and use the resources it needs in both directions.
    pub fn find_and_use_available_circuit<N>(
        &mut self,
        network: &N,
        source: NodeId,
        destination: NodeId,
        round_trip_latency_limit: Latency,
        one_way_data_rate: DataRate,
        connection: Option<Arc<str>>,
    ) -> Option<Circuit>
    where
        N: PhysicalNetwork + ?Sized,
    {
        let circuit = find_circuit(
            &mut self.graph,
            &self.partition,
            network,
            source,
            destination,
            round_trip_latency_limit,
            one_way_data_rate,
            &self.usage,
        )?;

        for link in circuit.forward().links().iter().chain(circuit.backward().links()) {
            self.usage.use_links(
                &[link.sourced(connection.clone())],
                one_way_data_rate,
                &self.partition.multiple_tracking,
            );
        }
        debug!(
            %source,
            %destination,
            round_trip_latency = %circuit.round_trip_latency(),
            "circuit in use"
        );

        Some(circuit)
    }

    fn use_channels(&mut self, channels: &Channels, data_rate: DataRate, connection: Option<Arc<str>>) {
        // a multiple tracking transmitter may serve its branches at
        // different tech levels, each level is a broadcast of its own
        let mut broadcasts: BTreeMap<(AntennaId, u8), Vec<SourcedLink>> = BTreeMap::new();
        for channel in channels.channels().iter().flatten() {
            for link in channel.links() {
                broadcasts
                    .entry((link.tx_antenna().id, link.tech_level()))
                    .or_default()
                    .push(link.sourced(connection.clone()));
            }
        }

        for links in broadcasts.values() {
            self.usage
                .use_links(links, data_rate, &self.partition.multiple_tracking);
        }
        debug!(broadcasts = broadcasts.len(), %data_rate, "channels in use");
    }
}

#[allow(clippy::too_many_arguments)]
fn find_circuit<N>(
    graph: &mut ResourceGraph,
    partition: &Partition,
    network: &N,
    source: NodeId,
    destination: NodeId,
    round_trip_latency_limit: Latency,
    one_way_data_rate: DataRate,
    usage: &NetworkUsage,
) -> Option<Circuit>
where
    N: PhysicalNetwork + ?Sized,
{
    let forward = find_channels(
        graph,
        partition,
        network,
        source,
        &[destination],
        round_trip_latency_limit,
        one_way_data_rate,
        usage,
    )
    .into_channels()
    .pop()
    .flatten()?;

    // the backward search must see the resources the forward channel would
    // use, links used in both directions are then charged twice
    let mut usage_with_forward_channel = usage.clone();
    for link in forward.links() {
        usage_with_forward_channel.use_links(
            &[link.unsourced()],
            one_way_data_rate,
            &partition.multiple_tracking,
        );
    }

    let backward = find_channels(
        graph,
        partition,
        network,
        destination,
        &[source],
        round_trip_latency_limit - forward.latency(),
        one_way_data_rate,
        &usage_with_forward_channel,
    )
    .into_channels()
    .pop()
    .flatten()?;

    Some(Circuit::new(forward, backward))
}

/// Dijkstra's algorithm without decrease-key, stopping once every
/// destination is reached or the latency limit is exceeded.
#[allow(clippy::too_many_arguments)]
fn find_channels<N>(
    graph: &mut ResourceGraph,
    partition: &Partition,
    network: &N,
    source: NodeId,
    destinations: &[NodeId],
    latency_limit: Latency,
    data_rate: DataRate,
    usage: &NetworkUsage,
) -> Channels
where
    N: PhysicalNetwork + ?Sized,
{
    let mut channels: Vec<Option<Channel>> = vec![None; destinations.len()];
    if destinations.is_empty() {
        return Channels::new(PointToMultipointAvailability::Unavailable, channels);
    }

    let distance_limit = latency_limit.as_secs_f64() * SPEED_OF_LIGHT;
    // broadcasts need a single encoding shared by all the branches
    let is_point_to_multipoint = destinations.len() > 1;

    let mut distances: HashMap<NodeId, f64> = HashMap::new();
    let mut previous: HashMap<NodeId, LinkHandle> = HashMap::new();
    let mut boundary = PriorityQueue::new();
    let mut interior: HashSet<NodeId> = HashSet::new();
    let mut found = 0;

    distances.insert(source, 0.0);
    boundary.enqueue(source, Distance(0.0));

    while let Some((tx, Distance(tx_distance))) = boundary.try_dequeue() {
        if distances.get(&tx) != Some(&tx_distance) {
            // already reached through a shorter path
            continue;
        }
        if tx_distance > distance_limit {
            trace!(%source, found, "latency limit exceeded");
            break;
        }

        for (index, destination) in destinations.iter().enumerate() {
            if *destination == tx && channels[index].is_none() {
                channels[index] = Some(trace_back(graph, &previous, tx, tx_distance));
                found += 1;
            }
        }
        if found == destinations.len() {
            trace!(%source, destinations = found, "all destinations reached");
            return Channels::new(PointToMultipointAvailability::Available, channels);
        }

        interior.insert(tx);

        if partition.rx_only.contains(&tx) {
            continue;
        }

        for &rx in network.neighbours(tx) {
            if partition.tx_only.contains(&rx) || interior.contains(&rx) {
                continue;
            }
            let Some(handle) = graph.get(network, tx, rx) else {
                continue;
            };
            let link = &graph[handle];

            if is_point_to_multipoint
                && !partition.multiple_tracking.contains(&tx)
                && !link.is_at_tx_tech_level()
            {
                continue;
            }
            if link.max_data_rate() < data_rate || link.capacity_with_usage(usage) < data_rate {
                continue;
            }

            let tentative_distance = tx_distance + link.length();
            if distances
                .get(&rx)
                .is_none_or(|distance| tentative_distance < *distance)
            {
                distances.insert(rx, tentative_distance);
                previous.insert(rx, handle);
                boundary.enqueue(rx, Distance(tentative_distance));
            }
        }
    }

    trace!(%source, found, destinations = destinations.len(), "search exhausted");
    let availability = if found == 0 {
        PointToMultipointAvailability::Unavailable
    } else {
        PointToMultipointAvailability::Partial
    };
    Channels::new(availability, channels)
}

fn trace_back(
    graph: &ResourceGraph,
    previous: &HashMap<NodeId, LinkHandle>,
    destination: NodeId,
    distance: f64,
) -> Channel {
    let mut links = Vec::new();
    let mut node = destination;
    while let Some(&handle) = previous.get(&node) {
        let link = graph[handle];
        node = link.tx();
        links.push(link);
    }
    links.reverse();

    Channel::new(links, Latency::from_secs_f64(distance / SPEED_OF_LIGHT))
}
