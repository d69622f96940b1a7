use crate::{
    Calendar, ConfigError, NetworkError,
    config::{ConnectionConfig, MonitorConfig, NetworkConfig, Role, StationConfig},
    connection::{Connection, ConnectionOutcome, ServicesState},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use telesim_core::{
    availability::{Alert, AvailabilityLedger, AvailabilityMetric, MetricHandle, Monitor},
    link::PhysicalNetwork,
    measure::Latency,
    node::NodeId,
    router::Router,
    stats::UsageStats,
};
use tracing::{debug, info, warn};

/// A named ground station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    name: String,
    node: NodeId,
    role: Role,
    multiple_tracking: bool,
}

/// A monitor on one service of a connection.
#[derive(Debug, Clone)]
struct NetworkMonitor {
    connection: usize,
    receiver: Option<String>,
    latency: Option<Latency>,
    monitor: Monitor,
}

/// An alert raised during a tick, with the service it was raised on.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorAlert {
    pub connection: String,
    pub receiver: Option<String>,
    pub latency: Option<Latency>,
    pub alert: Alert,
}

/// What happened during one [`Network::tick`].
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub time: f64,
    pub date: Option<NaiveDate>,
    /// Outcome of every active connection, in definition order.
    pub outcomes: Vec<(String, ConnectionOutcome)>,
    pub alerts: Vec<MonitorAlert>,
}

/// Persisted state of a [`Network`]: the history of every service and the
/// monitors in the alerted state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NetworkState {
    #[serde(default)]
    pub connections: BTreeMap<String, Vec<ServicesState>>,
    #[serde(default)]
    pub alerted: Vec<AlertedMonitor>,
}

/// A monitor in the alerted state, identified by the service it watches and
/// its threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertedMonitor {
    pub connection: String,
    #[serde(default)]
    pub receiver: Option<String>,
    #[serde(default)]
    pub latency: Option<Latency>,
    pub threshold: f64,
}

/// Stations, the connections between them and the monitors on their
/// services, driven one tick at a time.
///
/// ```
/// # use telesim::{Network, NetworkConfig};
/// let config = NetworkConfig::from_json(r#"{
///     "stations": [
///         { "name": "Goonhilly", "node": 1 },
///         { "name": "Pleumeur-Bodou", "node": 2 }
///     ],
///     "connections": [
///         { "name": "relay", "kind": "duplex", "trx": ["Goonhilly", "Pleumeur-Bodou"] }
///     ]
/// }"#).unwrap();
/// let network = Network::from_config(&config).unwrap();
/// assert!(network.connection("relay").unwrap().is_active());
/// ```
#[derive(Debug)]
pub struct Network {
    calendar: Calendar,
    stations: BTreeMap<String, Station>,
    connections: Vec<Connection>,
    connection_ids: HashMap<String, usize>,
    monitors: Vec<NetworkMonitor>,
    router: Router,
}

impl Station {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_multiple_tracking(&self) -> bool {
        self.multiple_tracking
    }
}

impl TickReport {
    pub fn outcome(&self, connection: &str) -> Option<&ConnectionOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == connection)
            .map(|(_, outcome)| outcome)
    }
}

impl Network {
    pub fn new(calendar: Calendar) -> Self {
        Self {
            calendar,
            stations: BTreeMap::new(),
            connections: Vec::new(),
            connection_ids: HashMap::new(),
            monitors: Vec::new(),
            router: Router::new(),
        }
    }

    pub fn from_config(config: &NetworkConfig) -> Result<Self, NetworkError> {
        config.validate()?;
        let mut network = Self::new(Calendar::new(config.epoch, config.day_length));

        for station in &config.stations {
            network.add_station(station)?;
        }
        for connection in &config.connections {
            network.add_connection(connection)?;
        }
        for monitor in &config.monitors {
            network.add_monitor(monitor)?;
        }

        Ok(network)
    }

    pub fn from_json(json: &str) -> Result<Self, NetworkError> {
        Self::from_config(&NetworkConfig::from_json(json)?)
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn add_station(&mut self, config: &StationConfig) -> Result<(), ConfigError> {
        if self.stations.contains_key(&config.name) {
            return Err(ConfigError::DuplicateStation {
                name: config.name.clone(),
            });
        }

        info!(name = %config.name, node = %config.node, role = ?config.role, "station added");
        self.stations.insert(
            config.name.clone(),
            Station {
                name: config.name.clone(),
                node: config.node,
                role: config.role,
                multiple_tracking: config.multiple_tracking,
            },
        );
        Ok(())
    }

    /// Add a connection between stations already added.
    pub fn add_connection(&mut self, config: &ConnectionConfig) -> Result<(), ConfigError> {
        if self.connection_ids.contains_key(&config.name) {
            return Err(ConfigError::DuplicateConnection {
                name: config.name.clone(),
            });
        }

        let stations = &self.stations;
        let connection = Connection::new(config, self.calendar.day_length(), |name| {
            stations.get(name).map(Station::node)
        })?;

        info!(
            name = %config.name,
            exclusive = connection.is_exclusive(),
            latency = %connection.latency_limit(),
            rate = %connection.data_rate(),
            "connection added"
        );
        self.connection_ids
            .insert(config.name.clone(), self.connections.len());
        self.connections.push(connection);
        Ok(())
    }

    /// Register the metric of `config` on its service and watch it.
    pub fn add_monitor(&mut self, config: &MonitorConfig) -> Result<(), NetworkError> {
        let metric = config.metric.to_metric(&self.calendar, config.accepted)?;
        let handle = self.register_metric(
            &config.connection,
            config.receiver.as_deref(),
            config.latency,
            metric,
        )?;

        let connection = self.connection_id(&config.connection)?;
        self.monitors.push(NetworkMonitor {
            connection,
            receiver: config.receiver.clone(),
            latency: config.latency,
            monitor: Monitor::new(handle, config.threshold),
        });
        Ok(())
    }

    /// Register `metric` on a service of `connection`: the basic one if
    /// `latency` is `None`, the improved one at `latency` otherwise.
    pub fn register_metric(
        &mut self,
        connection: &str,
        receiver: Option<&str>,
        latency: Option<Latency>,
        metric: AvailabilityMetric,
    ) -> Result<MetricHandle, NetworkError> {
        let id = self.connection_id(connection)?;
        let ledger = self.connections[id]
            .services_mut(receiver)
            .and_then(|services| services.ledger_mut(latency))
            .ok_or_else(|| NetworkError::ServiceNotFound {
                connection: connection.to_owned(),
                receiver: receiver.map(str::to_owned),
                latency,
            })?;

        Ok(ledger.register_metric(metric).map_err(ConfigError::from)?)
    }

    pub fn station(&self, name: &str) -> Result<&Station, NetworkError> {
        self.stations
            .get(name)
            .ok_or_else(|| NetworkError::StationNotFound {
                name: name.to_owned(),
            })
    }

    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    pub fn connection(&self, name: &str) -> Result<&Connection, NetworkError> {
        let id = self.connection_id(name)?;
        Ok(&self.connections[id])
    }

    /// The connections, in definition order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    pub fn set_active(&mut self, name: &str, active: bool) -> Result<(), NetworkError> {
        let id = self.connection_id(name)?;
        debug!(name, active, "connection activation changed");
        self.connections[id].set_active(active);
        Ok(())
    }

    /// The ledger of a service of `connection`.
    pub fn ledger(
        &self,
        connection: &str,
        receiver: Option<&str>,
        latency: Option<Latency>,
    ) -> Result<&AvailabilityLedger, NetworkError> {
        self.connection(connection)?
            .services(receiver)
            .and_then(|services| services.ledger(latency))
            .ok_or_else(|| NetworkError::ServiceNotFound {
                connection: connection.to_owned(),
                receiver: receiver.map(str::to_owned),
                latency,
            })
    }

    /// Attempt every active connection at time `t` on `physical`, in
    /// definition order, and check the monitors.
    ///
    /// Exclusive connections use up the resources they are given: the
    /// connections defined first are served first.
    pub fn tick<N>(&mut self, physical: &N, t: f64) -> TickReport
    where
        N: PhysicalNetwork + ?Sized,
    {
        let stations = self.stations.values();
        self.router.reset(
            stations
                .clone()
                .filter(|station| station.role == Role::Tx)
                .map(Station::node),
            stations
                .clone()
                .filter(|station| station.role == Role::Rx)
                .map(Station::node),
            stations
                .filter(|station| station.multiple_tracking)
                .map(Station::node),
        );

        let outcomes: Vec<_> = self
            .connections
            .iter_mut()
            .filter(|connection| connection.is_active())
            .map(|connection| {
                let outcome = connection.attempt(&mut self.router, physical, t);
                (connection.name().to_owned(), outcome)
            })
            .collect();

        let alerts = self.check_monitors();

        debug!(
            t,
            attempted = outcomes.len(),
            available = outcomes
                .iter()
                .filter(|(_, outcome)| outcome.is_available())
                .count(),
            alerts = alerts.len(),
            "tick"
        );

        TickReport {
            time: t,
            date: self.calendar.date_at(t),
            outcomes,
            alerts,
        }
    }

    fn check_monitors(&mut self) -> Vec<MonitorAlert> {
        let mut alerts = Vec::new();

        for monitor in &mut self.monitors {
            let connection = &self.connections[monitor.connection];
            let Some(ledger) = connection
                .services(monitor.receiver.as_deref())
                .and_then(|services| services.ledger(monitor.latency))
            else {
                continue;
            };
            let Some(alert) = monitor.monitor.check(ledger) else {
                continue;
            };

            match alert {
                Alert::BelowTarget { .. } => {
                    warn!(connection = connection.name(), receiver = ?monitor.receiver, "{alert}")
                }
                Alert::BackToNormal { .. } => {
                    info!(connection = connection.name(), receiver = ?monitor.receiver, "{alert}")
                }
            }
            alerts.push(MonitorAlert {
                connection: connection.name().to_owned(),
                receiver: monitor.receiver.clone(),
                latency: monitor.latency,
                alert,
            });
        }

        alerts
    }

    /// Resources used during the last tick.
    pub fn stats(&self) -> UsageStats {
        self.router.stats()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn state(&self) -> NetworkState {
        let connections = self
            .connections
            .iter()
            .map(|connection| (connection.name().to_owned(), connection.state()))
            .collect();

        let alerted = self
            .monitors
            .iter()
            .filter(|monitor| monitor.monitor.is_alerted())
            .map(|monitor| AlertedMonitor {
                connection: self.connections[monitor.connection].name().to_owned(),
                receiver: monitor.receiver.clone(),
                latency: monitor.latency,
                threshold: monitor.monitor.threshold(),
            })
            .collect();

        NetworkState {
            connections,
            alerted,
        }
    }

    /// Restore the history of the services and the alerted monitors.
    ///
    /// Connections missing from `state` are left as they are. Nothing is
    /// restored if any part of `state` does not fit the network.
    pub fn restore(&mut self, state: NetworkState) -> Result<(), NetworkError> {
        for alerted in &state.alerted {
            self.ledger(&alerted.connection, alerted.receiver.as_deref(), alerted.latency)?;
        }

        let mut connections = self.connections.clone();
        for (name, services) in state.connections {
            let id = self.connection_id(&name)?;
            connections[id]
                .restore(services)
                .map_err(ConfigError::from)?;
        }
        self.connections = connections;

        for monitor in &mut self.monitors {
            let name = self.connections[monitor.connection].name();
            let alerted = state.alerted.iter().any(|alerted| {
                alerted.connection == name
                    && alerted.receiver == monitor.receiver
                    && alerted.latency == monitor.latency
                    && alerted.threshold == monitor.monitor.threshold()
            });
            monitor.monitor = monitor.monitor.clone().with_alerted(alerted);
        }

        Ok(())
    }

    fn connection_id(&self, name: &str) -> Result<usize, NetworkError> {
        self.connection_ids
            .get(name)
            .copied()
            .ok_or_else(|| NetworkError::ConnectionNotFound {
                name: name.to_owned(),
            })
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new(Calendar::default())
    }
}
