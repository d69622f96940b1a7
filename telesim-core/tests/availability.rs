use rand_chacha::ChaChaRng;
use rand_core::{Rng as _, SeedableRng as _};
use telesim_core::availability::{
    Alert, AvailabilityLedger, AvailabilityMetric, LedgerState, MetricHandle, Monitor,
};

const DAY: f64 = 100.0;

fn samples(seed: u64, count: usize, start: f64) -> Vec<(bool, f64)> {
    let mut rng = ChaChaRng::seed_from_u64(seed);
    let mut t = start;
    (0..count)
        .map(|_| {
            t += f64::from(rng.next_u32() % 40);
            (rng.next_u32() % 4 != 0, t)
        })
        .collect()
}

fn ledger() -> (AvailabilityLedger, Vec<MetricHandle>) {
    let mut ledger = AvailabilityLedger::new(14).with_day_length(DAY);
    let handles = vec![
        ledger
            .register_metric(AvailabilityMetric::moving_window(14))
            .unwrap(),
        ledger
            .register_metric(AvailabilityMetric::partial_moving_window(7))
            .unwrap(),
        ledger
            // only measured after the restore
            .register_metric(AvailabilityMetric::period(45, 55))
            .unwrap(),
    ];
    (ledger, handles)
}

fn descriptions(ledger: &AvailabilityLedger) -> Vec<String> {
    ledger.metrics().map(|(_, metric)| metric.to_string()).collect()
}

#[test]
fn replay_after_restore() {
    let (mut original, _) = ledger();
    for (available, t) in samples(1, 200, 0.0) {
        original.report_availability(available, t);
    }

    let json = serde_json::to_string(&original.state()).unwrap();
    let state: LedgerState = serde_json::from_str(&json).unwrap();
    let (mut restored, _) = ledger();
    restored.restore(state).unwrap();
    assert_eq!(descriptions(&restored), descriptions(&original));

    let last = original.state().current_day.unwrap() as f64 * DAY;
    for (available, t) in samples(2, 200, last + DAY) {
        original.report_availability(available, t);
        restored.report_availability(available, t);
        assert_eq!(descriptions(&restored), descriptions(&original));
        assert_eq!(restored.state(), original.state());
    }
}

#[test]
fn state_survives_json() {
    let (mut ledger, _) = ledger();
    for (available, t) in samples(4, 2_000, 0.0) {
        ledger.report_availability(available, t);
        let state = ledger.state();
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(serde_json::from_str::<LedgerState>(&json).unwrap(), state, "{json}");
    }
}

#[test]
fn daily_fractions_stay_in_bounds() {
    let (mut ledger, handles) = ledger();
    for (available, t) in samples(3, 1_000, 0.0) {
        ledger.report_availability(available, t);
        assert!(ledger.days() <= ledger.window_size());
        assert!(ledger.day_fraction_available() <= ledger.day_fraction_elapsed() + 1e-9);
        for availability in ledger.daily_availability() {
            assert!((-1e-9..=1.0 + 1e-9).contains(&availability));
        }
        for handle in &handles {
            if let Some(availability) = ledger.metric(*handle).unwrap().availability() {
                assert!((-1e-9..=1.0 + 1e-9).contains(&availability));
            }
        }
    }
}

#[test]
fn outage_alerts() {
    let mut ledger = AvailabilityLedger::new(3).with_day_length(DAY);
    let handle = ledger
        .register_metric(AvailabilityMetric::partial_moving_window(3))
        .unwrap();
    let mut monitor = Monitor::new(handle, 0.8);
    let mut alerts = Vec::new();

    // up for two days, down for one, up for four
    let schedule = (0..70).map(|step| {
        let t = f64::from(step) * 10.0;
        (!(200.0..300.0).contains(&t), t)
    });
    for (available, t) in schedule {
        ledger.report_availability(available, t);
        alerts.extend(monitor.check(&ledger));
    }

    assert_eq!(alerts.len(), 2, "{alerts:?}");
    assert!(matches!(alerts[0], Alert::BelowTarget { .. }));
    assert!(matches!(alerts[1], Alert::BackToNormal { .. }));
}
