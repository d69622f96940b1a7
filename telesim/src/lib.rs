/*!
# Ground station network simulator

Named stations, the connections between them and the availability of the
services they provide, driven one tick at a time by [`Network::tick`] over a
[`PhysicalNetwork`] provided by the caller.

A network is usually loaded from a JSON [`NetworkConfig`], its history can be
saved as a [`NetworkState`] and restored later.
*/

pub mod config;
pub mod connection;
mod error;
mod metric;
mod network;

// convenient re-export of `telesim_core` core objects
pub use telesim_core::{
    availability::{Alert, AvailabilityLedger, AvailabilityMetric, LedgerState},
    link::PhysicalNetwork,
    measure::{DataRate, Latency},
    node::NodeId,
    router::{Channel, Channels, Circuit, PointToMultipointAvailability},
    stats::UsageStats,
    topology::Topology,
};

pub use self::{
    config::NetworkConfig,
    connection::{Connection, ConnectionOutcome},
    error::{ConfigError, NetworkError},
    metric::{Calendar, MetricDefinition},
    network::{AlertedMonitor, MonitorAlert, Network, NetworkState, Station, TickReport},
};
