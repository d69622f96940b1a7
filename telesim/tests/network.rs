use std::sync::Arc;
use telesim::{
    Alert, AlertedMonitor, ConnectionOutcome, Network, NetworkState, PointToMultipointAvailability,
    Topology,
};
use telesim_core::link::{Band, Encoding};

const CONFIG: &str = r#"{
    "day_length": 10,
    "stations": [
        { "name": "Goonhilly", "node": 1 },
        { "name": "Andover", "node": 2, "role": "rx" },
        { "name": "Raisting", "node": 3 }
    ],
    "connections": [
        {
            "name": "first",
            "kind": "point_to_multipoint",
            "tx": "Goonhilly",
            "rx": ["Andover"],
            "exclusive": true,
            "rate": 6000000
        },
        {
            "name": "second",
            "kind": "point_to_multipoint",
            "tx": "Goonhilly",
            "rx": ["Andover"],
            "exclusive": true,
            "rate": 6000000
        },
        {
            "name": "survey",
            "kind": "point_to_multipoint",
            "tx": "Goonhilly",
            "rx": ["Andover"],
            "rate": 6000000
        },
        {
            "name": "relay",
            "kind": "duplex",
            "trx": ["Goonhilly", "Raisting"],
            "rate": 1000000,
            "improved_latencies": ["1ms"]
        }
    ],
    "monitors": [
        { "connection": "relay", "metric": { "type": "moving", "window": 1 }, "threshold": 0.5 }
    ]
}"#;

/// Goonhilly (1) is linked to Andover (2) and, unless `outage`, to
/// Raisting (3).
fn topology(outage: bool) -> Topology {
    let band = Band {
        channel_width: 100e6,
    };
    let encoding = Encoding {
        coding_rate: 1.0,
        modulation_bits: 2,
    };

    let mut topology = Topology::new();
    let (goonhilly, andover, raisting) =
        (topology.new_node(), topology.new_node(), topology.new_node());
    let dish = topology.new_antenna(3, band, encoding);
    let andover_dish = topology.new_antenna(3, band, encoding);
    let raisting_dish = topology.new_antenna(3, band, encoding);

    topology
        .configure_link(goonhilly, andover)
        .set_forward(dish, andover_dish, "10mbps".parse().unwrap())
        .set_reverse(andover_dish, dish, "10mbps".parse().unwrap())
        .apply()
        .unwrap();
    if !outage {
        topology
            .configure_link(goonhilly, raisting)
            .set_forward(dish, raisting_dish, "10mbps".parse().unwrap())
            .set_reverse(raisting_dish, dish, "10mbps".parse().unwrap())
            .apply()
            .unwrap();
    }
    topology
}

/// Raisting is out of reach during day 1.
fn run(network: &mut Network, ticks: impl Iterator<Item = u32>) -> Vec<(f64, Alert)> {
    let (up, down) = (topology(false), topology(true));
    let mut alerts = Vec::new();

    for tick in ticks {
        let t = f64::from(tick);
        let physical = if (10..20).contains(&tick) { &down } else { &up };
        let report = network.tick(physical, t);
        alerts.extend(report.alerts.into_iter().map(|alert| (t, alert.alert)));
    }
    alerts
}

#[test]
fn exclusive_connections_are_served_in_order() {
    let mut network = Network::from_json(CONFIG).unwrap();
    let report = network.tick(&topology(false), 0.0);

    let availability = |name: &str| match report.outcome(name) {
        Some(ConnectionOutcome::PointToMultipoint(channels)) => channels.availability(),
        other => panic!("unexpected outcome for {name}: {other:?}"),
    };
    assert_eq!(availability("first"), PointToMultipointAvailability::Available);
    assert_eq!(
        availability("second"),
        PointToMultipointAvailability::Unavailable
    );
    // only checked against the physical links
    assert_eq!(availability("survey"), PointToMultipointAvailability::Available);

    let stats = network.stats();
    let goonhilly = &stats.antennas[0];
    assert_eq!(goonhilly.connections, vec![Arc::<str>::from("first")]);
    assert_eq!(goonhilly.tx_power, 0.6);
}

#[test]
fn outage_alerts() {
    let mut network = Network::from_json(CONFIG).unwrap();
    let alerts = run(&mut network, 0..=35);

    assert_eq!(alerts.len(), 2);
    assert!(matches!(alerts[0], (20.0, Alert::BelowTarget { .. })));
    assert!(matches!(alerts[1], (30.0, Alert::BackToNormal { .. })));

    let ledger = network.ledger("relay", None, None).unwrap();
    assert_eq!(ledger.days(), 3);
    assert!(ledger.available());

    // the links have no length, every circuit is within 1ms
    let improved = network
        .ledger("relay", None, Some("1ms".parse().unwrap()))
        .unwrap();
    assert_eq!(improved.state(), ledger.state());
}

#[test]
fn restored_network_carries_on() {
    let mut original = Network::from_json(CONFIG).unwrap();
    run(&mut original, 0..=25);

    let json = serde_json::to_string(&original.state()).unwrap();
    let state: NetworkState = serde_json::from_str(&json).unwrap();
    assert_eq!(
        state.alerted,
        [AlertedMonitor {
            connection: "relay".to_owned(),
            receiver: None,
            latency: None,
            threshold: 0.5,
        }]
    );

    let mut restored = Network::from_json(CONFIG).unwrap();
    restored.restore(state).unwrap();
    assert_eq!(restored.state(), original.state());

    let alerts = run(&mut restored, 26..=35);
    assert_eq!(run(&mut original, 26..=35), alerts);
    assert!(matches!(alerts[..], [(30.0, Alert::BackToNormal { .. })]));
    assert_eq!(restored.state(), original.state());
}

#[test]
fn partially_served_exclusive_broadcast_is_down() {
    let mut network = Network::from_json(
        r#"{
            "day_length": 10,
            "stations": [
                { "name": "a", "node": 1, "role": "tx" },
                { "name": "b", "node": 2, "role": "rx" },
                { "name": "c", "node": 3, "role": "rx" },
                { "name": "d", "node": 4, "role": "tx" }
            ],
            "connections": [
                { "name": "first", "kind": "point_to_multipoint", "tx": "a", "rx": ["b"], "exclusive": true, "rate": 3000000 },
                { "name": "second", "kind": "point_to_multipoint", "tx": "d", "rx": ["b", "c"], "exclusive": true, "rate": 3000000 }
            ]
        }"#,
    )
    .unwrap();

    // b's dish has room for a single 3 Mbps carrier
    let band = Band {
        channel_width: 4e6,
    };
    let encoding = Encoding {
        coding_rate: 1.0,
        modulation_bits: 1,
    };
    let mut topology = Topology::new();
    let nodes: Vec<_> = (0..4).map(|_| topology.new_node()).collect();
    let dishes: Vec<_> = (0..4)
        .map(|_| topology.new_antenna(1, band, encoding))
        .collect();
    for (tx, rx) in [(0, 1), (3, 1), (3, 2)] {
        topology
            .configure_link(nodes[tx], nodes[rx])
            .set_forward(dishes[tx], dishes[rx], "10mbps".parse().unwrap())
            .set_reverse(dishes[rx], dishes[tx], "10mbps".parse().unwrap())
            .apply()
            .unwrap();
    }

    let report = network.tick(&topology, 0.0);
    match report.outcome("second") {
        Some(ConnectionOutcome::PointToMultipoint(channels)) => {
            assert_eq!(channels.availability(), PointToMultipointAvailability::Partial);
            assert!(channels.channels()[1].is_some());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    network.tick(&topology, 5.0);

    let fraction = |connection: &str, receiver: &str| {
        network
            .ledger(connection, Some(receiver), None)
            .unwrap()
            .day_fraction_available()
    };
    assert_eq!(fraction("first", "b"), 0.5);
    // c was reached but the broadcast did not run
    assert_eq!(fraction("second", "b"), 0.0);
    assert_eq!(fraction("second", "c"), 0.0);
}
