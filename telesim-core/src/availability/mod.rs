//! Daily availability accounting.
//!
//! An [`AvailabilityLedger`] turns a stream of connected/disconnected
//! samples into daily availability fractions over a moving window. The
//! [`AvailabilityMetric`]s registered with it derive the figures service
//! levels are expressed in, and a [`Monitor`] raises an [`Alert`] when one
//! of them crosses a target.

mod ledger;
mod metric;
mod monitor;

use thiserror::Error;

pub use self::{
    ledger::{AvailabilityLedger, LedgerState, MetricHandle},
    metric::{
        AvailabilityMetric, MetricKind, MovingWindowAvailability, PartialMovingWindowAvailability,
        PeriodAvailability, PeriodState,
    },
    monitor::{Alert, Monitor},
};

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("metric needs {required} days of history, the ledger keeps {window_size}")]
    MetricNotComputable { required: usize, window_size: usize },
    #[error("invalid ledger state: {reason}")]
    InvalidState { reason: &'static str },
}
