use crate::{graph::OrientedLink, measure::Latency, node::NodeId};
use std::fmt;

/// Result of a point to multipoint search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointToMultipointAvailability {
    /// none of the destinations can be reached
    Unavailable,
    /// some, but not all, of the destinations can be reached
    Partial,
    /// every destination can be reached
    Available,
}

/// A path from a source to one destination.
///
/// The links are contiguous: the receiver of a link is the transmitter of
/// the next.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    links: Vec<OrientedLink>,
    latency: Latency,
}

/// A pair of channels between the same two endpoints, for duplex
/// communication.
#[derive(Debug, Clone, PartialEq)]
pub struct Circuit {
    forward: Channel,
    backward: Channel,
}

/// The channels found by a point to multipoint search, one per destination
/// in the order of the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Channels {
    availability: PointToMultipointAvailability,
    channels: Vec<Option<Channel>>,
}

impl Channel {
    pub(crate) fn new(links: Vec<OrientedLink>, latency: Latency) -> Self {
        Self { links, latency }
    }

    #[inline]
    pub fn links(&self) -> &[OrientedLink] {
        &self.links
    }

    /// Propagation time from the source to the destination.
    #[inline]
    pub fn latency(&self) -> Latency {
        self.latency
    }

    /// `None` for the channel from a node to itself.
    pub fn source(&self) -> Option<NodeId> {
        self.links.first().map(OrientedLink::tx)
    }

    /// `None` for the channel from a node to itself.
    pub fn destination(&self) -> Option<NodeId> {
        self.links.last().map(OrientedLink::rx)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(first) = self.links.first() {
            write!(f, "{}", first.tx())?;
            for link in &self.links {
                write!(f, " -> {}", link.rx())?;
            }
            f.write_str(" ")?;
        }
        write!(f, "({})", self.latency)
    }
}

impl Circuit {
    pub(crate) fn new(forward: Channel, backward: Channel) -> Self {
        Self { forward, backward }
    }

    #[inline]
    pub fn forward(&self) -> &Channel {
        &self.forward
    }

    #[inline]
    pub fn backward(&self) -> &Channel {
        &self.backward
    }

    pub fn round_trip_latency(&self) -> Latency {
        self.forward.latency + self.backward.latency
    }
}

impl Channels {
    pub(crate) fn new(
        availability: PointToMultipointAvailability,
        channels: Vec<Option<Channel>>,
    ) -> Self {
        Self {
            availability,
            channels,
        }
    }

    #[inline]
    pub fn availability(&self) -> PointToMultipointAvailability {
        self.availability
    }

    /// One entry per destination, `None` when it could not be reached.
    #[inline]
    pub fn channels(&self) -> &[Option<Channel>] {
        &self.channels
    }

    pub fn into_channels(self) -> Vec<Option<Channel>> {
        self.channels
    }
}
