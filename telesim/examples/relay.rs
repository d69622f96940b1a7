//! Two ground stations talking through a geostationary relay, with a
//! broadcast to a receive only station sharing the relay's transponder.
//!
//! ```sh
//! RUST_LOG=telesim=info cargo run --example relay -- --days 60
//! ```

use anyhow::{Context as _, Result};
use clap::Parser;
use indicatif::ProgressBar;
use telesim::{Network, NetworkConfig, Topology, connection::Endpoints};
use telesim_core::link::{Band, Encoding};
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"{
    "day_length": 86400,
    "epoch": "1965-04-06",
    "stations": [
        { "name": "Andover", "node": 1 },
        { "name": "Goonhilly", "node": 2 },
        { "name": "Early Bird", "node": 3 },
        { "name": "Raisting", "node": 4, "role": "rx" }
    ],
    "connections": [
        {
            "name": "transatlantic",
            "kind": "duplex",
            "trx": ["Andover", "Goonhilly"],
            "exclusive": true,
            "latency": "600ms",
            "rate": "2mbps",
            "improved_latencies": ["560ms"]
        },
        {
            "name": "television",
            "kind": "point_to_multipoint",
            "tx": "Andover",
            "rx": ["Goonhilly", "Raisting"],
            "exclusive": true,
            "latency": "300ms",
            "rate": "3mbps"
        }
    ],
    "monitors": [
        {
            "connection": "transatlantic",
            "metric": { "type": "moving", "window": 7 },
            "threshold": 0.95
        },
        {
            "connection": "television",
            "receiver": "Raisting",
            "metric": { "type": "monthly", "month": 0 },
            "accepted": "1965-04-06",
            "threshold": 0.9
        }
    ]
}"#;

/// Distance from a ground station to the relay, in metres.
const SLANT_RANGE: f64 = 38_000_000.0;

#[derive(Parser)]
struct Command {
    /// Number of days to simulate.
    #[arg(long, default_value = "30")]
    days: u32,

    /// Seconds of simulation time between two ticks.
    #[arg(long, default_value = "600")]
    every: u32,

    /// Load the network from this file instead of the built-in one.
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

/// The relay's view of the stations: node 3 is the satellite, the others
/// are ground stations. `weather` takes the Goonhilly uplink down.
fn topology(weather: bool) -> Result<Topology> {
    let band = Band {
        channel_width: 25e6,
    };
    let encoding = Encoding {
        coding_rate: 0.5,
        modulation_bits: 2,
    };

    let mut topology = Topology::new();
    let andover = topology.new_node();
    let goonhilly = topology.new_node();
    let relay = topology.new_node();
    let raisting = topology.new_node();

    let transponder = topology.new_antenna(1, band, encoding);
    for (station, rate) in [(andover, "8mbps"), (goonhilly, "8mbps"), (raisting, "6mbps")] {
        if weather && station == goonhilly {
            continue;
        }
        let dish = topology.new_antenna(2, band, encoding);
        topology
            .configure_link(station, relay)
            .set_forward(dish, transponder, rate.parse()?)
            .set_reverse(transponder, dish, rate.parse()?)
            .set_length(SLANT_RANGE)
            .apply()?;
    }

    Ok(topology)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cmd = Command::parse();

    let config = match &cmd.config {
        Some(path) => NetworkConfig::from_path(path)?,
        None => NetworkConfig::from_json(CONFIG).context("Failed to load the built-in network")?,
    };
    let mut network = Network::from_config(&config)?;

    let clear = topology(false)?;
    let storm = topology(true)?;

    let ticks = u64::from(cmd.days) * 86_400 / u64::from(cmd.every);
    let pb = ProgressBar::new(ticks);
    let mut alerts = Vec::new();
    for tick in 0..ticks {
        let t = (tick * u64::from(cmd.every)) as f64;
        // a storm over Cornwall every 11th day
        let physical = if (t / 86_400.0) as u64 % 11 == 10 {
            &storm
        } else {
            &clear
        };

        let report = network.tick(physical, t);
        for alert in report.alerts {
            alerts.push((report.date, alert));
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    for (date, alert) in &alerts {
        let date = date.map(|date| date.to_string()).unwrap_or_default();
        let receiver = alert.receiver.as_deref().unwrap_or("-");
        println!("{date} {} ({receiver}): {}", alert.connection, alert.alert);
    }

    for connection in network.connections() {
        let services = match connection.endpoints() {
            Endpoints::PointToMultipoint { rx, services, .. } => rx
                .iter()
                .map(|endpoint| endpoint.name.as_str())
                .zip(services)
                .collect::<Vec<_>>(),
            Endpoints::Duplex { services, .. } => vec![("-", services)],
        };

        for (receiver, services) in services {
            for (_, metric) in services.basic().metrics() {
                println!("{} ({receiver}): {metric}", connection.name());
            }
            for (latency, ledger) in services.improved() {
                let availability = ledger
                    .availability()
                    .map(|availability| format!("{:.2}%", availability * 100.0))
                    .unwrap_or_else(|| "no data".to_owned());
                println!(
                    "{} ({receiver}) within {latency}: {availability}",
                    connection.name()
                );
            }
        }
    }

    Ok(())
}
