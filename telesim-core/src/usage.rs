//! Accounting of the radio resources committed by the connections.
//!
//! Every antenna has a transmit power, normalized on `[0, 1]`, and a
//! channel of finite width, in Hz. Committing a channel at a given data
//! rate uses some of both; later searches see the capacity left.

use crate::{graph::OrientedLink, link::AntennaId, measure::DataRate, node::NodeId};
use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};
use thiserror::Error;
use tracing::debug;

/// A link together with the connection it is used for, if any.
///
/// Links committed speculatively (while searching the backward channel of
/// a circuit) are not attributed to any connection.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedLink {
    pub connection: Option<Arc<str>>,
    pub link: OrientedLink,
}

/// Power used by one link of a broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerUsage {
    pub link: SourcedLink,
    pub power: f64,
}

/// The transmit power used on one antenna, broken down by broadcast.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerBreakdown {
    power: f64,
    usages: Vec<Vec<PowerUsage>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectrumUsageKind {
    Transmit,
    Receive,
}

/// Spectrum used by one link on one of its antennas.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumUsage {
    pub link: SourcedLink,
    pub kind: SpectrumUsageKind,
    pub spectrum: f64,
}

/// The spectrum used on one antenna, broken down by commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectrumBreakdown {
    spectrum: f64,
    usages: Vec<Vec<SpectrumUsage>>,
}

/// Error returned by [`NetworkUsage::ensure_same_tx_antenna_and_tech_level`].
#[derive(Debug, Error, PartialEq)]
pub enum UsageError {
    #[error("Broadcast without any link")]
    EmptyBroadcast,
    #[error("Broadcast from multiple antennas ({first} and {other})")]
    MultipleTransmitAntennas { first: AntennaId, other: AntennaId },
    #[error("Broadcast at multiple tech levels ({first} and {other})")]
    MultipleTechLevels { first: u8, other: u8 },
}

/// Resource usage committed on the antennas of the network.
///
/// [`NetworkUsage::none`] is the usage of an idle network, it is used for
/// queries in isolation. The router owns the live usage of the current
/// tick; the search of a circuit works on a clone of it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkUsage {
    tx_power: BTreeMap<AntennaId, PowerBreakdown>,
    spectrum: BTreeMap<AntennaId, SpectrumBreakdown>,
}

static NO_USAGE: NetworkUsage = NetworkUsage::new();
static NO_POWER_USAGE: PowerBreakdown = PowerBreakdown::new();
static NO_SPECTRUM_USAGE: SpectrumBreakdown = SpectrumBreakdown::new();

impl PowerBreakdown {
    const fn new() -> Self {
        Self {
            power: 0.0,
            usages: Vec::new(),
        }
    }

    /// Fraction of the antenna's power in use, normalized on `[0, 1]`.
    #[inline]
    pub fn power(&self) -> f64 {
        self.power
    }

    /// The broadcasts using the antenna, one slice per commit.
    pub fn usages(&self) -> impl Iterator<Item = &[PowerUsage]> {
        self.usages.iter().map(Vec::as_slice)
    }

    /// A broadcast is limited by its weakest link: the power charged is the
    /// one needed by the most demanding branch, not the sum.
    fn add_usages(&mut self, broadcast: Vec<PowerUsage>) {
        self.power += broadcast
            .iter()
            .map(|usage| usage.power)
            .fold(0.0, f64::max);
        self.usages.push(broadcast);
    }
}

impl SpectrumBreakdown {
    const fn new() -> Self {
        Self {
            spectrum: 0.0,
            usages: Vec::new(),
        }
    }

    /// Spectrum in use, in Hz.
    #[inline]
    pub fn spectrum(&self) -> f64 {
        self.spectrum
    }

    pub fn usages(&self) -> impl Iterator<Item = &[SpectrumUsage]> {
        self.usages.iter().map(Vec::as_slice)
    }

    /// All the usages of a commit share the same channel: only the first one
    /// is charged.
    fn add_usages(&mut self, usages: Vec<SpectrumUsage>) {
        if let Some(first) = usages.first() {
            self.spectrum += first.spectrum;
            self.usages.push(usages);
        }
    }
}

impl NetworkUsage {
    pub const fn new() -> Self {
        Self {
            tx_power: BTreeMap::new(),
            spectrum: BTreeMap::new(),
        }
    }

    /// The usage of an idle network.
    pub fn none() -> &'static Self {
        &NO_USAGE
    }

    pub fn clear(&mut self) {
        self.tx_power.clear();
        self.spectrum.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.tx_power.is_empty() && self.spectrum.is_empty()
    }

    /// Fraction of the antenna's transmit power in use, on `[0, 1]`.
    pub fn tx_power_usage(&self, antenna: AntennaId) -> f64 {
        self.sourced_tx_power_usage(antenna).power()
    }

    /// Spectrum in use on the antenna, in Hz.
    pub fn spectrum_usage(&self, antenna: AntennaId) -> f64 {
        self.sourced_spectrum_usage(antenna).spectrum()
    }

    pub fn sourced_tx_power_usage(&self, antenna: AntennaId) -> &PowerBreakdown {
        self.tx_power.get(&antenna).unwrap_or(&NO_POWER_USAGE)
    }

    pub fn sourced_spectrum_usage(&self, antenna: AntennaId) -> &SpectrumBreakdown {
        self.spectrum.get(&antenna).unwrap_or(&NO_SPECTRUM_USAGE)
    }

    /// Antennas with some transmit power in use.
    pub fn transmitters(&self) -> impl Iterator<Item = AntennaId> + '_ {
        self.tx_power.keys().copied()
    }

    /// Antennas with some spectrum in use.
    pub fn users(&self) -> impl Iterator<Item = AntennaId> + '_ {
        self.spectrum.keys().copied()
    }

    /// Check that the links of a broadcast batch share their transmit
    /// antenna and their tech level.
    pub fn ensure_same_tx_antenna_and_tech_level(
        links: &[SourcedLink],
    ) -> Result<(), UsageError> {
        let Some(first) = links.first() else {
            return Err(UsageError::EmptyBroadcast);
        };
        let tx_antenna = first.link.tx_antenna().id;
        let tech_level = first.link.tech_level();

        for sourced in links {
            let other = sourced.link.tx_antenna().id;
            if other != tx_antenna {
                return Err(UsageError::MultipleTransmitAntennas {
                    first: tx_antenna,
                    other,
                });
            }
            let other = sourced.link.tech_level();
            if other != tech_level {
                return Err(UsageError::MultipleTechLevels {
                    first: tech_level,
                    other,
                });
            }
        }
        Ok(())
    }

    /// Commit a broadcast at `data_rate` along `links`.
    ///
    /// The links must all share the same transmit antenna and tech level.
    /// The transmitter's power is used once, at the level needed by the
    /// weakest link. Spectrum is used once on the transmitter and once on
    /// each distinct receiving antenna. Nodes in `multiple_tracking` model
    /// independent copies of their antennas, nothing is used on them.
    pub fn use_links(
        &mut self,
        links: &[SourcedLink],
        data_rate: DataRate,
        multiple_tracking: &HashSet<NodeId>,
    ) {
        let Some(first) = links.first() else {
            return;
        };
        debug_assert_eq!(Self::ensure_same_tx_antenna_and_tech_level(links), Ok(()));

        let tx = first.link.tx();
        let tx_antenna = first.link.tx_antenna().id;
        let tx_is_limited = !multiple_tracking.contains(&tx);

        if tx_is_limited {
            let usages = links
                .iter()
                .map(|sourced| PowerUsage {
                    link: sourced.clone(),
                    power: sourced.link.tx_power_usage_from_data_rate(data_rate),
                })
                .collect();
            self.tx_power
                .entry(tx_antenna)
                .or_default()
                .add_usages(usages);
        }

        let spectrum = first.link.spectrum_usage_from_data_rate(data_rate);

        let mut by_rx_antenna: BTreeMap<AntennaId, Vec<SpectrumUsage>> = BTreeMap::new();
        for sourced in links {
            if multiple_tracking.contains(&sourced.link.rx()) {
                continue;
            }
            by_rx_antenna
                .entry(sourced.link.rx_antenna().id)
                .or_default()
                .push(SpectrumUsage {
                    link: sourced.clone(),
                    kind: SpectrumUsageKind::Receive,
                    spectrum,
                });
        }
        for (rx_antenna, usages) in by_rx_antenna {
            self.spectrum
                .entry(rx_antenna)
                .or_default()
                .add_usages(usages);
        }

        if tx_is_limited {
            let usages = links
                .iter()
                .map(|sourced| SpectrumUsage {
                    link: sourced.clone(),
                    kind: SpectrumUsageKind::Transmit,
                    spectrum,
                })
                .collect();
            self.spectrum
                .entry(tx_antenna)
                .or_default()
                .add_usages(usages);
        }

        debug!(
            antenna = %tx_antenna,
            links = links.len(),
            %data_rate,
            power = self.tx_power_usage(tx_antenna),
            "usage committed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::ResourceGraph,
        link::{Band, Encoding},
        topology::Topology,
    };

    const BAND: Band = Band {
        channel_width: 10e6,
    };
    const ENCODING: Encoding = Encoding {
        coding_rate: 1.0,
        modulation_bits: 1,
    };

    struct Broadcast {
        links: Vec<SourcedLink>,
        v: NodeId,
        x: NodeId,
        /// `x → v`, sent from another antenna
        reverse: SourcedLink,
        /// `v → z`, downgraded to the tech level of `z`
        downgraded: SourcedLink,
    }

    /// `v` broadcasting from a single antenna to `x` (10 Mbps) and `y`
    /// (1 Mbps).
    fn broadcast() -> Broadcast {
        let mut topology = Topology::new();
        let v = topology.new_node();
        let x = topology.new_node();
        let y = topology.new_node();
        let z = topology.new_node();
        let v_antenna = topology.new_antenna(1, BAND, ENCODING);
        let x_antenna = topology.new_antenna(1, BAND, ENCODING);
        let y_antenna = topology.new_antenna(1, BAND, ENCODING);
        let z_antenna = topology.new_antenna(0, BAND, ENCODING);
        for (rx, rx_antenna, rate) in [(x, x_antenna, 10e6), (y, y_antenna, 1e6), (z, z_antenna, 1e6)] {
            topology
                .configure_link(v, rx)
                .set_forward(v_antenna, rx_antenna, DataRate::new(rate))
                .set_reverse(rx_antenna, v_antenna, DataRate::new(rate))
                .apply()
                .unwrap();
        }

        let mut graph = ResourceGraph::new();
        let vx = graph.get(&topology, v, x).unwrap();
        let vy = graph.get(&topology, v, y).unwrap();
        let vz = graph.get(&topology, v, z).unwrap();
        let xv = graph.get(&topology, x, v).unwrap();
        let connection: Arc<str> = Arc::from("broadcast");
        Broadcast {
            links: vec![
                graph[vx].sourced(Some(Arc::clone(&connection))),
                graph[vy].sourced(Some(connection)),
            ],
            v,
            x,
            reverse: graph[xv].unsourced(),
            downgraded: graph[vz].unsourced(),
        }
    }

    #[test]
    fn none_is_empty() {
        let usage = NetworkUsage::none();
        assert!(usage.is_empty());
        assert_eq!(usage.tx_power_usage(AntennaId::new(1)), 0.0);
        assert_eq!(usage.spectrum_usage(AntennaId::new(1)), 0.0);
        assert_eq!(usage.sourced_tx_power_usage(AntennaId::new(1)).usages().count(), 0);
    }

    #[test]
    fn broadcast_uses_power_of_the_weakest_link() {
        let Broadcast { links, .. } = broadcast();
        let mut usage = NetworkUsage::new();

        usage.use_links(&links, DataRate::new(500e3), &HashSet::new());

        let v_antenna = links[0].link.tx_antenna().id;
        assert_eq!(usage.tx_power_usage(v_antenna), 0.5);
        let breakdown = usage.sourced_tx_power_usage(v_antenna);
        let broadcasts: Vec<_> = breakdown.usages().collect();
        assert_eq!(broadcasts.len(), 1);
        assert_eq!(broadcasts[0].len(), 2);
        assert_eq!(broadcasts[0][0].power, 0.05);
        assert_eq!(broadcasts[0][1].power, 0.5);
        assert_eq!(
            broadcasts[0][0].link.connection.as_deref(),
            Some("broadcast")
        );
    }

    #[test]
    fn broadcast_uses_spectrum_once_per_antenna() {
        let Broadcast { links, .. } = broadcast();
        let mut usage = NetworkUsage::new();

        usage.use_links(&links, DataRate::new(500e3), &HashSet::new());

        let v_antenna = links[0].link.tx_antenna().id;
        let x_antenna = links[0].link.rx_antenna().id;
        let y_antenna = links[1].link.rx_antenna().id;
        assert_eq!(usage.spectrum_usage(v_antenna), 500e3);
        assert_eq!(usage.spectrum_usage(x_antenna), 500e3);
        assert_eq!(usage.spectrum_usage(y_antenna), 500e3);

        let transmit = usage.sourced_spectrum_usage(v_antenna);
        assert!(
            transmit
                .usages()
                .flatten()
                .all(|usage| usage.kind == SpectrumUsageKind::Transmit)
        );

        assert_eq!(usage.transmitters().collect::<Vec<_>>(), vec![v_antenna]);
        assert_eq!(usage.users().count(), 3);
    }

    #[test]
    fn multiple_tracking_transmitter_uses_nothing() {
        let Broadcast { links, v, .. } = broadcast();
        let mut usage = NetworkUsage::new();

        usage.use_links(&links, DataRate::new(500e3), &HashSet::from([v]));

        let v_antenna = links[0].link.tx_antenna().id;
        assert_eq!(usage.tx_power_usage(v_antenna), 0.0);
        assert_eq!(usage.spectrum_usage(v_antenna), 0.0);
        // the receivers still use their spectrum
        assert_eq!(usage.spectrum_usage(links[1].link.rx_antenna().id), 500e3);
    }

    #[test]
    fn multiple_tracking_receiver_uses_no_spectrum() {
        let Broadcast { links, x, .. } = broadcast();
        let mut usage = NetworkUsage::new();

        usage.use_links(&links, DataRate::new(500e3), &HashSet::from([x]));

        assert_eq!(usage.spectrum_usage(links[0].link.rx_antenna().id), 0.0);
        assert_eq!(usage.spectrum_usage(links[1].link.rx_antenna().id), 500e3);
    }

    #[test]
    fn usage_reduces_capacity() {
        let Broadcast { links, .. } = broadcast();
        let mut usage = NetworkUsage::new();
        let vx = links[0].link;

        assert_eq!(vx.capacity_with_usage(&usage), DataRate::new(10e6));
        usage.use_links(&links, DataRate::new(500e3), &HashSet::new());
        // half of the power is gone
        assert_eq!(vx.capacity_with_usage(&usage), DataRate::new(5e6));
    }

    #[test]
    fn clone_is_independent() {
        let Broadcast { links, .. } = broadcast();
        let mut usage = NetworkUsage::new();
        usage.use_links(&links[..1], DataRate::new(1e6), &HashSet::new());

        let mut speculative = usage.clone();
        speculative.use_links(&links[..1], DataRate::new(1e6), &HashSet::new());

        let v_antenna = links[0].link.tx_antenna().id;
        assert_eq!(usage.tx_power_usage(v_antenna), 0.1);
        assert_eq!(speculative.tx_power_usage(v_antenna), 0.2);

        usage.clear();
        assert!(usage.is_empty());
    }

    #[test]
    fn ensure_same_tx_antenna_and_tech_level() {
        let Broadcast {
            links,
            reverse,
            downgraded,
            ..
        } = broadcast();
        assert_eq!(
            NetworkUsage::ensure_same_tx_antenna_and_tech_level(&links),
            Ok(())
        );
        assert_eq!(
            NetworkUsage::ensure_same_tx_antenna_and_tech_level(&[]),
            Err(UsageError::EmptyBroadcast)
        );
        assert!(matches!(
            NetworkUsage::ensure_same_tx_antenna_and_tech_level(&[links[0].clone(), reverse]),
            Err(UsageError::MultipleTransmitAntennas { .. })
        ));
        assert_eq!(
            NetworkUsage::ensure_same_tx_antenna_and_tech_level(&[links[0].clone(), downgraded]),
            Err(UsageError::MultipleTechLevels { first: 1, other: 0 })
        );
    }
}
