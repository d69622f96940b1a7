//! Deterministic primitives for simulating a ground station network.
//!
//! * [`router::Router`] finds capacity and latency constrained channels and
//!   circuits across a [`link::PhysicalNetwork`], sharing the transmit power
//!   and spectrum of the antennas between the connections of a tick;
//! * [`availability::AvailabilityLedger`] turns connectivity samples into
//!   daily availabilities and the metrics service levels are measured with.
//!
//! Everything is synchronous and single threaded: the caller drives the
//! simulation one tick at a time.

pub mod availability;
pub mod defaults;
pub mod graph;
pub mod link;
pub mod measure;
pub mod node;
mod priority_queue;
pub mod router;
pub mod stats;
mod time;
pub mod topology;
pub mod usage;

pub use self::priority_queue::PriorityQueue;
