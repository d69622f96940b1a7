use anyhow::{bail, ensure};
use logos::{Lexer, Logos};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, ops, str::FromStr};

/// A data rate, in bits per second.
///
/// This is the unit of every capacity computation of the router: a link's
/// maximum data rate, the rate requested by a connection and the capacity
/// left on a link once the committed usage has been accounted for.
///
/// # Example
///
/// ```
/// # use telesim_core::measure::DataRate;
/// let rate: DataRate = "20mbps".parse().unwrap();
/// assert_eq!(rate, DataRate::new(20_000_000.0));
/// assert_eq!(rate.to_string(), "20mbps");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct DataRate(f64);

impl DataRate {
    /// no data at all
    pub const ZERO: Self = Self::new(0.0);

    pub const fn new(bits_per_second: f64) -> Self {
        Self(bits_per_second)
    }

    #[inline]
    pub const fn bits_per_second(self) -> f64 {
        self.0
    }

    /// Ratio of `self` over `other`, used for power usage fractions.
    #[inline]
    pub fn ratio(self, other: Self) -> f64 {
        self.0 / other.0
    }

    /// The smaller of the two rates.
    #[inline]
    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }
}

impl ops::Mul<f64> for DataRate {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl ops::Div<f64> for DataRate {
    type Output = f64;
    fn div(self, rhs: f64) -> Self::Output {
        self.0 / rhs
    }
}

// --- Display ---

const K: f64 = 1_000.0;
const M: f64 = 1_000_000.0;
const G: f64 = 1_000_000_000.0;

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bps = self.0;

        if bps >= G {
            write!(f, "{}gbps", bps / G)
        } else if bps >= M {
            write!(f, "{}mbps", bps / M)
        } else if bps >= K {
            write!(f, "{}kbps", bps / K)
        } else {
            write!(f, "{bps}bps")
        }
    }
}

// --- FromStr ---

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")] // Ignore this regex pattern between tokens
enum DataRateToken {
    #[token("bps")]
    Bps,
    #[token("kbps")]
    Kbps,
    #[token("mbps")]
    Mbps,
    #[token("gbps")]
    Gbps,

    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Value,
}

impl FromStr for DataRate {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::<'_, DataRateToken>::new(s);

        let Some(Ok(DataRateToken::Value)) = lex.next() else {
            bail!("Expecting to parse a number")
        };
        let number: f64 = lex.slice().parse()?;
        let Some(Ok(token)) = lex.next() else {
            bail!("Expecting to parse a unit")
        };
        let bps = match token {
            DataRateToken::Bps => number,
            DataRateToken::Kbps => number * K,
            DataRateToken::Mbps => number * M,
            DataRateToken::Gbps => number * G,
            DataRateToken::Value => bail!("Expecting to parse a unit (bps, kbps, ...)"),
        };

        ensure!(
            lex.next().is_none(),
            "Not expecting any other tokens to parse a data rate"
        );

        Ok(Self::new(bps))
    }
}

// --- serde ---

impl Serialize for DataRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

impl<'de> Deserialize<'de> for DataRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            BitsPerSecond(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::BitsPerSecond(bps) => Ok(Self::new(bps)),
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_data_rate() {
        macro_rules! assert_data_rate {
            ($string:literal == $value:expr) => {
                assert_eq!($string.parse::<DataRate>().unwrap(), DataRate::new($value));
            };
        }

        assert_data_rate!("0bps" == 0.0);
        assert_data_rate!("42bps" == 42.0);
        assert_data_rate!("42kbps" == 42_000.0);
        assert_data_rate!("42mbps" == 42_000_000.0);
        assert_data_rate!("1.5gbps" == 1_500_000_000.0);
        assert_data_rate!("500 kbps" == 500_000.0);
    }

    #[test]
    fn print_data_rate() {
        assert_eq!(DataRate::ZERO.to_string(), "0bps");
        assert_eq!(DataRate::new(999.0).to_string(), "999bps");
        assert_eq!(DataRate::new(500_000.0).to_string(), "500kbps");
        assert_eq!(DataRate::new(1_500_000.0).to_string(), "1.5mbps");
        assert_eq!(DataRate::new(20_000_000.0).to_string(), "20mbps");
        assert_eq!(DataRate::new(2_000_000_000.0).to_string(), "2gbps");
    }

    #[test]
    fn parse_invalid_strings() {
        assert!("42".parse::<DataRate>().is_err()); // no unit
        assert!("mbps".parse::<DataRate>().is_err()); // no number
        assert!("".parse::<DataRate>().is_err()); // empty
        assert!("42mbps extra".parse::<DataRate>().is_err()); // trailing token
    }

    #[test]
    fn ordering_and_ratio() {
        let low = DataRate::new(500_000.0);
        let high = DataRate::new(1_000_000.0);

        assert!(low < high);
        assert_eq!(low.min(high), low);
        assert_eq!(low.ratio(high), 0.5);
        assert_eq!(high * 0.5, low);
    }

    #[test]
    fn deserialize_number_or_string() {
        let rate: DataRate = serde_json::from_str("1000").unwrap();
        assert_eq!(rate, DataRate::new(1_000.0));

        let rate: DataRate = serde_json::from_str("\"10mbps\"").unwrap();
        assert_eq!(rate, DataRate::new(10_000_000.0));

        assert!(serde_json::from_str::<DataRate>("\"fast\"").is_err());
    }
}
