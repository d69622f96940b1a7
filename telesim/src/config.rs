use crate::{ConfigError, MetricDefinition, metric::default_epoch};
use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use telesim_core::{
    defaults::{DEFAULT_DATA_RATE, DEFAULT_DAY_LENGTH, DEFAULT_LATENCY_LIMIT, DEFAULT_WINDOW_SIZE},
    measure::{DataRate, Latency},
    node::NodeId,
};

/// Definition of a [`Network`](crate::Network).
///
/// ```
/// # use telesim::NetworkConfig;
/// let config = NetworkConfig::from_json(r#"{
///     "stations": [
///         { "name": "Goonhilly", "node": 1, "role": "tx" },
///         { "name": "Andover", "node": 2 }
///     ],
///     "connections": [{
///         "name": "telstar",
///         "kind": "point_to_multipoint",
///         "tx": "Goonhilly",
///         "rx": ["Andover"],
///         "latency": "150ms",
///         "rate": "1mbps"
///     }]
/// }"#).unwrap();
/// assert_eq!(config.stations.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    /// Length of a day, in seconds of simulation time.
    #[serde(default = "default_day_length")]
    pub day_length: f64,
    /// Date of day `0`.
    #[serde(default = "default_epoch")]
    pub epoch: NaiveDate,
    #[serde(default)]
    pub stations: Vec<StationConfig>,
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
    #[serde(default)]
    pub monitors: Vec<MonitorConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StationConfig {
    pub name: String,
    /// The node of the station in the physical network.
    pub node: NodeId,
    #[serde(default)]
    pub role: Role,
    /// Whether the station's antennas can track any number of targets:
    /// nothing is ever used up on them.
    #[serde(default)]
    pub multiple_tracking: bool,
}

/// What a station is capable of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Transmit only.
    Tx,
    /// Receive only.
    Rx,
    /// Transmit and receive, possibly relaying.
    #[default]
    Trx,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub name: String,
    #[serde(flatten)]
    pub endpoints: EndpointsConfig,
    /// Exclusive connections use up the resources of the channels they are
    /// given, the others are only checked for.
    #[serde(default)]
    pub exclusive: bool,
    /// One way for point to multipoint connections, round trip for duplex
    /// ones.
    #[serde(default = "default_latency")]
    pub latency: Latency,
    /// One way data rate.
    #[serde(default = "default_data_rate")]
    pub rate: DataRate,
    /// Days of availability history kept.
    #[serde(default = "default_window")]
    pub window: usize,
    /// Stricter latencies at which the availability is also tracked.
    #[serde(default)]
    pub improved_latencies: Vec<Latency>,
    /// Inactive connections are not attempted.
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EndpointsConfig {
    PointToMultipoint { tx: String, rx: Vec<String> },
    Duplex { trx: Vec<String> },
}

/// A metric watched against an availability target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    pub connection: String,
    /// The receiver of a point to multipoint connection, may be omitted if
    /// there is only one.
    #[serde(default)]
    pub receiver: Option<String>,
    /// One of the connection's improved latencies, the basic service if
    /// omitted.
    #[serde(default)]
    pub latency: Option<Latency>,
    pub metric: MetricDefinition,
    pub threshold: f64,
    /// Reference date of monthly metrics.
    #[serde(default)]
    pub accepted: Option<NaiveDate>,
}

fn default_day_length() -> f64 {
    DEFAULT_DAY_LENGTH
}

fn default_latency() -> Latency {
    DEFAULT_LATENCY_LIMIT
}

fn default_data_rate() -> DataRate {
    DEFAULT_DATA_RATE
}

fn default_window() -> usize {
    DEFAULT_WINDOW_SIZE
}

fn default_active() -> bool {
    true
}

impl NetworkConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check what the JSON schema cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.day_length > 0.0 && self.day_length.is_finite()) {
            return Err(ConfigError::InvalidDayLength {
                day_length: self.day_length,
            });
        }
        Ok(())
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Failed to load {}", path.display()))
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            day_length: DEFAULT_DAY_LENGTH,
            epoch: default_epoch(),
            stations: Vec::new(),
            connections: Vec::new(),
            monitors: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_defaults() {
        let config: ConnectionConfig = serde_json::from_str(
            r#"{ "name": "relay", "kind": "duplex", "trx": ["a", "b"], "rate": 2000 }"#,
        )
        .unwrap();

        assert_eq!(
            config.endpoints,
            EndpointsConfig::Duplex {
                trx: vec!["a".to_owned(), "b".to_owned()]
            }
        );
        assert!(!config.exclusive);
        assert!(config.active);
        assert_eq!(config.latency, Latency::UNLIMITED);
        assert_eq!(config.rate, DataRate::new(2_000.0));
        assert_eq!(config.window, DEFAULT_WINDOW_SIZE);
    }

    #[test]
    fn units() {
        let config: ConnectionConfig = serde_json::from_str(
            r#"{
                "name": "broadcast",
                "kind": "point_to_multipoint",
                "tx": "a",
                "rx": ["b", "c"],
                "latency": "150ms",
                "rate": "20mbps",
                "improved_latencies": ["100ms", 0.05]
            }"#,
        )
        .unwrap();

        assert_eq!(config.latency, "150ms".parse::<Latency>().unwrap());
        assert_eq!(config.rate, DataRate::new(20e6));
        assert_eq!(
            config.improved_latencies,
            vec!["100ms".parse().unwrap(), Latency::from_secs_f64(0.05)]
        );
    }

    #[test]
    fn network_defaults() {
        let config = NetworkConfig::from_json(
            r#"{ "stations": [{ "name": "a", "node": 4, "multiple_tracking": true }] }"#,
        )
        .unwrap();
        assert_eq!(config.day_length, DEFAULT_DAY_LENGTH);
        assert_eq!(config.epoch, default_epoch());
        assert_eq!(config.stations[0].role, Role::Trx);
        assert_eq!(config.stations[0].node, NodeId::new(4));
        assert!(config.stations[0].multiple_tracking);
    }

    #[test]
    fn invalid() {
        assert!(matches!(
            NetworkConfig::from_json(r#"{ "stations": [{ "name": "a" }] }"#),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            NetworkConfig::from_json(r#"{ "satellites": [] }"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn day_length_must_be_positive() {
        for day_length in ["0", "-86400"] {
            let json = format!(r#"{{ "day_length": {day_length} }}"#);
            assert!(matches!(
                NetworkConfig::from_json(&json),
                Err(ConfigError::InvalidDayLength { .. })
            ));
        }

        let config = NetworkConfig {
            day_length: f64::NAN,
            ..NetworkConfig::default()
        };
        assert!(matches!(
            crate::Network::from_config(&config),
            Err(crate::NetworkError::Config(ConfigError::InvalidDayLength { .. }))
        ));
        assert!(NetworkConfig::from_json(r#"{ "day_length": 0.5 }"#).is_ok());
    }
}
