use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{cmp, fmt, hash, ops, str::FromStr, time::Duration};

/// The latency is a measure of how much a signal takes to
/// travel between two points, in seconds.
///
/// Latencies are used both as the result of a search (the propagation
/// time along a [`Channel`]) and as the limit of a query. A query without
/// limit uses [`Latency::UNLIMITED`].
///
/// ```
/// # use telesim_core::measure::Latency;
/// assert_eq!(Latency::from_secs_f64(0.15).to_string(), "150ms");
/// assert_eq!(Latency::UNLIMITED.to_string(), "unlimited");
/// ```
///
/// Unlike a bare `f64` the latency is totally ordered, so it can be used as
/// the key of ordered maps (for example the latency-improved services of a
/// connection).
///
/// [`Channel`]: crate::router::Channel
#[derive(Debug, Clone, Copy, Default)]
pub struct Latency(f64);

impl Latency {
    /// The `0` latency. I.e. no latency.
    pub const ZERO: Self = Self(0.0);

    /// No latency limit at all.
    pub const UNLIMITED: Self = Self(f64::INFINITY);

    #[inline(always)]
    pub const fn from_secs_f64(seconds: f64) -> Self {
        Self(seconds)
    }

    #[inline(always)]
    pub const fn as_secs_f64(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn is_unlimited(self) -> bool {
        self.0.is_infinite()
    }

    /// Convert to a [`Duration`], `None` for [`Latency::UNLIMITED`] or a
    /// negative latency.
    pub fn to_duration(self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.0).ok()
    }
}

impl From<Duration> for Latency {
    fn from(value: Duration) -> Self {
        Self(value.as_secs_f64())
    }
}

impl PartialEq for Latency {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == cmp::Ordering::Equal
    }
}
impl Eq for Latency {}

impl PartialOrd for Latency {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Latency {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl hash::Hash for Latency {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl ops::Add for Latency {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl ops::Sub for Latency {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unlimited() {
            f.write_str("unlimited")
        } else if self.0 >= 1.0 {
            write!(f, "{}s", self.0)
        } else {
            write!(f, "{}ms", self.0 * 1_000.0)
        }
    }
}

impl FromStr for Latency {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim() == "unlimited" {
            return Ok(Self::UNLIMITED);
        }
        crate::time::parse_seconds(s).map(Self)
    }
}

impl Serialize for Latency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_unlimited() {
            serializer.serialize_str("unlimited")
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Latency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Seconds(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Seconds(seconds) => Ok(Self(seconds)),
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}
