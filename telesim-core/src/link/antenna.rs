use super::AntennaId;
use serde::{Deserialize, Serialize};

/// Frequency band an antenna operates in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Width of the channel, in Hz. This is the spectrum shared by every
    /// link using the antenna.
    pub channel_width: f64,
}

/// Encoder and modulator of an antenna.
///
/// A link carries `coding_rate * modulation_bits` bits per symbol, using
/// the encoding of its lowest tech level endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Encoding {
    pub coding_rate: f64,
    pub modulation_bits: u8,
}

impl Encoding {
    #[inline]
    pub fn bits_per_symbol(&self) -> f64 {
        self.coding_rate * f64::from(self.modulation_bits)
    }
}

/// A digital antenna, as seen by the router.
///
/// The physical modeling of the antenna (gain, pointing, noise) is done by
/// whoever provides the [`PhysicalNetwork`]: the router only needs the
/// antenna's identity, tech level, band and encoding.
///
/// [`PhysicalNetwork`]: super::PhysicalNetwork
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Antenna {
    pub id: AntennaId,
    pub tech_level: u8,
    pub band: Band,
    pub encoding: Encoding,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_per_symbol() {
        let encoding = Encoding {
            coding_rate: 0.5,
            modulation_bits: 2,
        };
        assert_eq!(encoding.bits_per_symbol(), 1.0);
    }
}
