//! Connections between stations and the availability of their services.

use crate::{ConfigError, config::ConnectionConfig, config::EndpointsConfig};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use telesim_core::{
    availability::{AvailabilityLedger, LedgerError, LedgerState},
    link::PhysicalNetwork,
    measure::{DataRate, Latency},
    node::NodeId,
    router::{Channel, Channels, Circuit, PointToMultipointAvailability, Router},
};

/// A station taking part in a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    pub node: NodeId,
}

/// The availability of one service: at the connection's latency limit (the
/// basic service) and at stricter latencies.
#[derive(Debug, Clone)]
pub struct Services {
    basic: AvailabilityLedger,
    improved_by_latency: BTreeMap<Latency, AvailabilityLedger>,
}

#[derive(Debug, Clone)]
pub enum Endpoints {
    /// One transmitter to any number of receivers, each with its own
    /// services.
    PointToMultipoint {
        tx: Endpoint,
        rx: Vec<Endpoint>,
        services: Vec<Services>,
    },
    /// Two way communication between two stations.
    Duplex {
        trx: [Endpoint; 2],
        services: Services,
    },
}

/// A connection, attempted at every tick of the network.
#[derive(Debug, Clone)]
pub struct Connection {
    name: Arc<str>,
    exclusive: bool,
    latency_limit: Latency,
    data_rate: DataRate,
    active: bool,
    endpoints: Endpoints,
}

/// The result of one attempt of a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionOutcome {
    PointToMultipoint(Channels),
    Duplex(Option<Circuit>),
}

/// Persisted state of [`Services`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServicesState {
    pub basic: LedgerState,
    #[serde(default)]
    pub improved: Vec<ImprovedServiceState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovedServiceState {
    pub latency: Latency,
    pub ledger: LedgerState,
}

impl Services {
    fn new(window_size: usize, day_length: f64, improved_latencies: &[Latency]) -> Self {
        let ledger = || AvailabilityLedger::new(window_size).with_day_length(day_length);
        Self {
            basic: ledger(),
            improved_by_latency: improved_latencies
                .iter()
                .map(|latency| (*latency, ledger()))
                .collect(),
        }
    }

    pub fn basic(&self) -> &AvailabilityLedger {
        &self.basic
    }

    /// The service at `latency`, the basic service if `None`.
    pub fn ledger(&self, latency: Option<Latency>) -> Option<&AvailabilityLedger> {
        match latency {
            None => Some(&self.basic),
            Some(latency) => self.improved_by_latency.get(&latency),
        }
    }

    pub fn ledger_mut(&mut self, latency: Option<Latency>) -> Option<&mut AvailabilityLedger> {
        match latency {
            None => Some(&mut self.basic),
            Some(latency) => self.improved_by_latency.get_mut(&latency),
        }
    }

    /// The services at stricter latencies, in increasing latency.
    pub fn improved(&self) -> impl Iterator<Item = (Latency, &AvailabilityLedger)> {
        self.improved_by_latency
            .iter()
            .map(|(latency, ledger)| (*latency, ledger))
    }

    /// Record the latency achieved at `t`, `None` if there was no channel.
    fn report(&mut self, latency: Option<Latency>, t: f64) {
        self.basic.report_availability(latency.is_some(), t);
        for (threshold, ledger) in &mut self.improved_by_latency {
            ledger.report_availability(latency.is_some_and(|latency| latency <= *threshold), t);
        }
    }

    fn state(&self) -> ServicesState {
        ServicesState {
            basic: self.basic.state(),
            improved: self
                .improved_by_latency
                .iter()
                .map(|(latency, ledger)| ImprovedServiceState {
                    latency: *latency,
                    ledger: ledger.state(),
                })
                .collect(),
        }
    }

    fn restore(&mut self, state: ServicesState) -> Result<(), LedgerError> {
        self.basic.restore(state.basic)?;
        for improved in state.improved {
            let ledger = self.improved_by_latency.get_mut(&improved.latency).ok_or(
                LedgerError::InvalidState {
                    reason: "no service at this latency",
                },
            )?;
            ledger.restore(improved.ledger)?;
        }
        Ok(())
    }
}

impl Connection {
    /// Build the connection defined by `config`, `resolve` gives the node of
    /// a station from its name.
    pub(crate) fn new<F>(config: &ConnectionConfig, day_length: f64, resolve: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<NodeId>,
    {
        let endpoint = |name: &String| {
            resolve(name)
                .map(|node| Endpoint {
                    name: name.clone(),
                    node,
                })
                .ok_or_else(|| ConfigError::UnknownStation {
                    connection: config.name.clone(),
                    station: name.clone(),
                })
        };
        let services = || Services::new(config.window, day_length, &config.improved_latencies);

        let endpoints = match &config.endpoints {
            EndpointsConfig::PointToMultipoint { tx, rx } => Endpoints::PointToMultipoint {
                tx: endpoint(tx)?,
                rx: rx.iter().map(endpoint).collect::<Result<_, _>>()?,
                services: rx.iter().map(|_| services()).collect(),
            },
            EndpointsConfig::Duplex { trx } => {
                let [a, b] = trx.as_slice() else {
                    return Err(ConfigError::DuplexEndpoints {
                        connection: config.name.clone(),
                        count: trx.len(),
                    });
                };
                Endpoints::Duplex {
                    trx: [endpoint(a)?, endpoint(b)?],
                    services: services(),
                }
            }
        };

        Ok(Self {
            name: Arc::from(config.name.as_str()),
            exclusive: config.exclusive,
            latency_limit: config.latency,
            data_rate: config.rate,
            active: config.active,
            endpoints,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    /// One way for point to multipoint connections, round trip for duplex
    /// connections.
    pub fn latency_limit(&self) -> Latency {
        self.latency_limit
    }

    /// One way data rate.
    pub fn data_rate(&self) -> DataRate {
        self.data_rate
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// The services of `receiver`. Duplex connections and point to
    /// multipoint connections with a single receiver accept `None`.
    pub fn services(&self, receiver: Option<&str>) -> Option<&Services> {
        match &self.endpoints {
            Endpoints::Duplex { services, .. } => receiver.is_none().then_some(services),
            Endpoints::PointToMultipoint { rx, services, .. } => {
                services.get(receiver_index(rx, services.len(), receiver)?)
            }
        }
    }

    pub fn services_mut(&mut self, receiver: Option<&str>) -> Option<&mut Services> {
        match &mut self.endpoints {
            Endpoints::Duplex { services, .. } => receiver.is_none().then_some(services),
            Endpoints::PointToMultipoint { rx, services, .. } => {
                let index = receiver_index(rx, services.len(), receiver)?;
                services.get_mut(index)
            }
        }
    }

    /// Look for channels (or a circuit) at time `t` and record the result in
    /// the services' ledgers.
    pub(crate) fn attempt<N>(&mut self, router: &mut Router, physical: &N, t: f64) -> ConnectionOutcome
    where
        N: PhysicalNetwork + ?Sized,
    {
        match &mut self.endpoints {
            Endpoints::PointToMultipoint { tx, rx, services } => {
                let destinations: Vec<NodeId> = rx.iter().map(|endpoint| endpoint.node).collect();
                let channels = if self.exclusive {
                    router.find_and_use_available_channels(
                        physical,
                        tx.node,
                        &destinations,
                        self.latency_limit,
                        self.data_rate,
                        Some(Arc::clone(&self.name)),
                    )
                } else {
                    router.find_channels_in_isolation(
                        physical,
                        tx.node,
                        &destinations,
                        self.latency_limit,
                        self.data_rate,
                    )
                };

                // an exclusive broadcast only runs when it reaches every receiver
                let running = !self.exclusive
                    || channels.availability() == PointToMultipointAvailability::Available;
                for (services, channel) in services.iter_mut().zip(channels.channels()) {
                    let latency = channel.as_ref().filter(|_| running).map(Channel::latency);
                    services.report(latency, t);
                }
                ConnectionOutcome::PointToMultipoint(channels)
            }
            Endpoints::Duplex {
                trx: [a, b],
                services,
            } => {
                let circuit = if self.exclusive {
                    router.find_and_use_available_circuit(
                        physical,
                        a.node,
                        b.node,
                        self.latency_limit,
                        self.data_rate,
                        Some(Arc::clone(&self.name)),
                    )
                } else {
                    router.find_circuit_in_isolation(
                        physical,
                        a.node,
                        b.node,
                        self.latency_limit,
                        self.data_rate,
                    )
                };

                services.report(circuit.as_ref().map(Circuit::round_trip_latency), t);
                ConnectionOutcome::Duplex(circuit)
            }
        }
    }

    /// One entry per receiver, a single one for duplex connections.
    pub fn state(&self) -> Vec<ServicesState> {
        match &self.endpoints {
            Endpoints::PointToMultipoint { services, .. } => {
                services.iter().map(Services::state).collect()
            }
            Endpoints::Duplex { services, .. } => vec![services.state()],
        }
    }

    /// Either every service is restored or the connection is left as it
    /// was.
    pub fn restore(&mut self, state: Vec<ServicesState>) -> Result<(), LedgerError> {
        let mut endpoints = self.endpoints.clone();
        let services = match &mut endpoints {
            Endpoints::PointToMultipoint { services, .. } => services.as_mut_slice(),
            Endpoints::Duplex { services, .. } => std::slice::from_mut(services),
        };
        if services.len() != state.len() {
            return Err(LedgerError::InvalidState {
                reason: "not one state per service",
            });
        }
        for (services, state) in services.iter_mut().zip(state) {
            services.restore(state)?;
        }
        self.endpoints = endpoints;
        Ok(())
    }
}

impl ConnectionOutcome {
    /// Whether every receiver (or both ends of the circuit) was reached.
    pub fn is_available(&self) -> bool {
        match self {
            Self::PointToMultipoint(channels) => channels
                .channels()
                .iter()
                .all(Option::is_some),
            Self::Duplex(circuit) => circuit.is_some(),
        }
    }
}

/// Position of `receiver` among the receivers of a point to multipoint
/// connection, `None` stands for the only one.
fn receiver_index(rx: &[Endpoint], count: usize, receiver: Option<&str>) -> Option<usize> {
    match receiver {
        None => (count == 1).then_some(0),
        Some(receiver) => rx.iter().position(|endpoint| endpoint.name == receiver),
    }
}
