use telesim_core::{availability::LedgerError, measure::Latency};
use thiserror::Error;

/// Error in the definition of the network.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Duplex connection {connection} needs exactly 2 endpoints, got {count}")]
    DuplexEndpoints { connection: String, count: usize },
    #[error("Station {name} is defined more than once")]
    DuplicateStation { name: String },
    #[error("Connection {name} is defined more than once")]
    DuplicateConnection { name: String },
    #[error("Connection {connection} refers to an unknown station {station}")]
    UnknownStation { connection: String, station: String },
    #[error("Day length must be a positive number of seconds, got {day_length}")]
    InvalidDayLength { day_length: f64 },
    #[error("Invalid date: {reason}")]
    InvalidDate { reason: String },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Failed to parse the configuration")]
    Json(#[from] serde_json::Error),
}

/// Error returned when operating on a [`Network`](crate::Network).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("No station named {name}")]
    StationNotFound { name: String },
    #[error("No connection named {name}")]
    ConnectionNotFound { name: String },
    #[error("Connection {connection} has no service for {receiver:?} at latency {latency:?}")]
    ServiceNotFound {
        connection: String,
        receiver: Option<String>,
        latency: Option<Latency>,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}
