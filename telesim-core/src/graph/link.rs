use crate::{
    defaults::SPEED_OF_LIGHT,
    link::{Antenna, Band, DirectedLink, PhysicalLink},
    measure::{DataRate, Latency},
    node::NodeId,
    usage::{NetworkUsage, SourcedLink},
};
use std::sync::Arc;

/// One direction of a [`PhysicalLink`], as used by the router.
///
/// The encoding of the link (hence its bits per symbol) is the one of its
/// lowest tech level endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedLink {
    tx: NodeId,
    rx: NodeId,
    tx_antenna: Antenna,
    rx_antenna: Antenna,
    max_data_rate: DataRate,
    /// in metres
    length: f64,

    bits_per_symbol: f64,
    max_symbol_rate: f64,
}

impl OrientedLink {
    pub(crate) fn new(tx: NodeId, rx: NodeId, physical: &PhysicalLink) -> Option<Self> {
        let &DirectedLink {
            tx: tx_antenna,
            rx: rx_antenna,
            max_data_rate,
        } = physical.directed(tx)?;

        let mut link = Self {
            tx,
            rx,
            tx_antenna,
            rx_antenna,
            max_data_rate,
            length: physical.length(),
            bits_per_symbol: 0.0,
            max_symbol_rate: 0.0,
        };
        link.bits_per_symbol = link.lowest_tech_antenna().encoding.bits_per_symbol();
        link.max_symbol_rate = max_data_rate / link.bits_per_symbol;
        Some(link)
    }

    /// The transmitting node.
    #[inline]
    pub fn tx(&self) -> NodeId {
        self.tx
    }

    /// The receiving node.
    #[inline]
    pub fn rx(&self) -> NodeId {
        self.rx
    }

    #[inline]
    pub fn tx_antenna(&self) -> &Antenna {
        &self.tx_antenna
    }

    #[inline]
    pub fn rx_antenna(&self) -> &Antenna {
        &self.rx_antenna
    }

    #[inline]
    pub fn max_data_rate(&self) -> DataRate {
        self.max_data_rate
    }

    /// Length of the link in metres.
    #[inline]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Propagation time along the link.
    pub fn latency(&self) -> Latency {
        Latency::from_secs_f64(self.length / SPEED_OF_LIGHT)
    }

    pub fn tech_level(&self) -> u8 {
        self.tx_antenna.tech_level.min(self.rx_antenna.tech_level)
    }

    /// `true` if the link does not need to downgrade the transmitter to the
    /// receiver's tech level.
    pub fn is_at_tx_tech_level(&self) -> bool {
        self.tech_level() == self.tx_antenna.tech_level
    }

    pub fn lowest_tech_antenna(&self) -> &Antenna {
        if self.is_at_tx_tech_level() {
            &self.tx_antenna
        } else {
            &self.rx_antenna
        }
    }

    #[inline]
    pub fn band(&self) -> Band {
        self.tx_antenna.band
    }

    #[inline]
    pub fn bits_per_symbol(&self) -> f64 {
        self.bits_per_symbol
    }

    /// The data rate the link can still carry once `usage` is accounted for.
    ///
    /// This is the smallest of the rate allowed by the spectrum left on
    /// both antennas and the rate allowed by the transmit power left on the
    /// transmitter.
    pub fn capacity_with_usage(&self, usage: &NetworkUsage) -> DataRate {
        let available_spectrum = self.band().channel_width
            - usage
                .spectrum_usage(self.tx_antenna.id)
                .max(usage.spectrum_usage(self.rx_antenna.id));
        let bandwidth_limited =
            self.max_symbol_rate.min(available_spectrum) * self.bits_per_symbol;
        let power_limited = self.max_data_rate * (1.0 - usage.tx_power_usage(self.tx_antenna.id));

        DataRate::new(bandwidth_limited).min(power_limited)
    }

    /// Fraction of the transmitter's power needed to send at `data_rate`.
    pub fn tx_power_usage_from_data_rate(&self, data_rate: DataRate) -> f64 {
        if data_rate == DataRate::ZERO {
            0.0
        } else {
            data_rate.ratio(self.max_data_rate)
        }
    }

    /// Spectrum needed to send at `data_rate`, in Hz.
    pub fn spectrum_usage_from_data_rate(&self, data_rate: DataRate) -> f64 {
        data_rate / self.bits_per_symbol
    }

    /// The link, attributed to no connection.
    pub fn unsourced(self) -> SourcedLink {
        SourcedLink {
            connection: None,
            link: self,
        }
    }

    /// The link, attributed to `connection`.
    pub fn sourced(self, connection: Option<Arc<str>>) -> SourcedLink {
        SourcedLink {
            connection,
            link: self,
        }
    }
}
