//! Usage statistics and observability types.
//!
//! [`UsageStats`] provides a point-in-time snapshot of the resources in use.
//! Obtain one via [`NetworkUsage::stats`] (or [`Router::stats`] for the
//! current tick).
//!
//! [`Router::stats`]: crate::router::Router::stats

use crate::{link::AntennaId, usage::NetworkUsage};
use std::{collections::BTreeSet, sync::Arc};

/// Snapshot of the resources in use on a single antenna.
#[derive(Debug, Clone, PartialEq)]
pub struct AntennaStats {
    /// The antenna's identifier.
    pub antenna: AntennaId,
    /// Fraction of the transmit power in use, on `[0, 1]`.
    pub tx_power: f64,
    /// Spectrum in use, in Hz.
    pub spectrum: f64,
    /// The connections using the antenna, in name order.
    pub connections: Vec<Arc<str>>,
}

/// Point-in-time snapshot of the resources in use in the network.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UsageStats {
    /// Every antenna with some power or spectrum in use, in id order.
    pub antennas: Vec<AntennaStats>,
}

impl UsageStats {
    pub fn antenna(&self, antenna: AntennaId) -> Option<&AntennaStats> {
        self.antennas
            .binary_search_by_key(&antenna, |stats| stats.antenna)
            .ok()
            .map(|index| &self.antennas[index])
    }
}

impl NetworkUsage {
    pub fn stats(&self) -> UsageStats {
        let antennas: BTreeSet<AntennaId> = self.transmitters().chain(self.users()).collect();

        let antennas = antennas
            .into_iter()
            .map(|antenna| {
                let power = self.sourced_tx_power_usage(antenna);
                let spectrum = self.sourced_spectrum_usage(antenna);

                let power_connections = power
                    .usages()
                    .flatten()
                    .filter_map(|usage| usage.link.connection.clone());
                let spectrum_connections = spectrum
                    .usages()
                    .flatten()
                    .filter_map(|usage| usage.link.connection.clone());
                let connections: BTreeSet<Arc<str>> =
                    power_connections.chain(spectrum_connections).collect();

                AntennaStats {
                    antenna,
                    tx_power: power.power(),
                    spectrum: spectrum.spectrum(),
                    connections: connections.into_iter().collect(),
                }
            })
            .collect();

        UsageStats { antennas }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        link::{Band, Encoding},
        measure::{DataRate, Latency},
        router::Router,
        topology::Topology,
    };

    #[test]
    fn snapshot() {
        let band = Band {
            channel_width: 100e6,
        };
        let encoding = Encoding {
            coding_rate: 1.0,
            modulation_bits: 2,
        };
        let mut topology = Topology::new();
        let (a, b, c) = (topology.new_node(), topology.new_node(), topology.new_node());
        let (ta, tb, tc) = (
            topology.new_antenna(3, band, encoding),
            topology.new_antenna(3, band, encoding),
            topology.new_antenna(3, band, encoding),
        );
        for (x, tx, y, ty) in [(a, ta, b, tb), (a, ta, c, tc)] {
            topology
                .configure_link(x, y)
                .set_forward(tx, ty, DataRate::new(10e6))
                .set_reverse(ty, tx, DataRate::new(10e6))
                .set_length(1e6)
                .apply()
                .unwrap();
        }

        let mut router = Router::new();
        router.reset([], [], []);
        assert!(router.stats().antennas.is_empty());

        for (destination, name) in [(b, "alpha"), (c, "beta")] {
            router.find_and_use_available_channels(
                &topology,
                a,
                &[destination],
                Latency::UNLIMITED,
                DataRate::new(2e6),
                Some(Arc::from(name)),
            );
        }

        let stats = router.stats();
        assert_eq!(stats.antennas.len(), 3);

        let source = stats.antenna(ta.id).unwrap();
        assert_eq!(source.tx_power, 0.4);
        assert_eq!(source.spectrum, 2e6);
        assert_eq!(
            source.connections,
            vec![Arc::<str>::from("alpha"), Arc::from("beta")]
        );

        let receiver = stats.antenna(tc.id).unwrap();
        assert_eq!(receiver.tx_power, 0.0);
        assert_eq!(receiver.spectrum, 1e6);
        assert_eq!(receiver.connections, vec![Arc::<str>::from("beta")]);
    }
}
