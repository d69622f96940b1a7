mod data_rate;
mod latency;

pub use self::{data_rate::DataRate, latency::Latency};
