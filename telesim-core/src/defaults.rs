use crate::measure::{DataRate, Latency};

/// Propagation speed of every radio link, in metres per second.
///
/// The router measures distances in metres of light travel, a link's
/// latency is its length divided by this constant.
///
/// ```
/// # use telesim_core::defaults::*;
/// assert_eq!(SPEED_OF_LIGHT, 299_792_458.0);
/// ```
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Default length of a calendar day, in seconds.
///
/// This is the bucket size used by the [`AvailabilityLedger`] to turn the
/// continuous stream of availability samples into daily fractions.
///
/// [`AvailabilityLedger`]: crate::availability::AvailabilityLedger
pub const DEFAULT_DAY_LENGTH: f64 = 86_400.0;

/// Default number of finalized days kept by an [`AvailabilityLedger`].
///
/// [`AvailabilityLedger`]: crate::availability::AvailabilityLedger
pub const DEFAULT_WINDOW_SIZE: usize = 30;

/// Default latency limit of a query: no limit at all.
///
/// ```
/// # use telesim_core::defaults::*;
/// assert_eq!(
///     DEFAULT_LATENCY_LIMIT.to_string(),
///     "unlimited"
/// );
/// ```
pub const DEFAULT_LATENCY_LIMIT: Latency = Latency::UNLIMITED;

/// Default data rate of a query: any path will do.
pub const DEFAULT_DATA_RATE: DataRate = DataRate::ZERO;
