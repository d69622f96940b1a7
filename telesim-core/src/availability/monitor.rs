use super::{AvailabilityLedger, MetricHandle};
use std::fmt;

/// Notification emitted by a [`Monitor`] when the state of its metric
/// relative to the target changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Alert {
    BelowTarget { availability: f64, threshold: f64 },
    BackToNormal { availability: f64, threshold: f64 },
}

/// Watches one metric of a ledger against an availability target.
///
/// An alert is raised once when the availability drops below the target and
/// once when it gets back above it, not at every check in between.
#[derive(Debug, Clone, PartialEq)]
pub struct Monitor {
    metric: MetricHandle,
    threshold: f64,
    alerted: bool,
}

impl Monitor {
    pub fn new(metric: MetricHandle, threshold: f64) -> Self {
        Self {
            metric,
            threshold,
            alerted: false,
        }
    }

    /// Restore whether the monitor was in the alerted state.
    pub fn with_alerted(mut self, alerted: bool) -> Self {
        self.alerted = alerted;
        self
    }

    pub fn metric(&self) -> MetricHandle {
        self.metric
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_alerted(&self) -> bool {
        self.alerted
    }

    /// Compare the metric with the target.
    ///
    /// Returns `None` when nothing changed, or when the metric has no value
    /// yet.
    pub fn check(&mut self, ledger: &AvailabilityLedger) -> Option<Alert> {
        let availability = ledger.metric(self.metric)?.availability()?;

        match (availability >= self.threshold, self.alerted) {
            (true, true) => {
                self.alerted = false;
                Some(Alert::BackToNormal {
                    availability,
                    threshold: self.threshold,
                })
            }
            (false, false) => {
                self.alerted = true;
                Some(Alert::BelowTarget {
                    availability,
                    threshold: self.threshold,
                })
            }
            _ => None,
        }
    }
}

impl Alert {
    pub fn threshold(&self) -> f64 {
        match self {
            Self::BelowTarget { threshold, .. } | Self::BackToNormal { threshold, .. } => *threshold,
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BelowTarget {
                availability,
                threshold,
            } => write!(
                f,
                "availability {:.2}% is below the target of {:.2}%",
                availability * 100.0,
                threshold * 100.0
            ),
            Self::BackToNormal {
                availability,
                threshold,
            } => write!(
                f,
                "availability {:.2}% is back above the target of {:.2}%",
                availability * 100.0,
                threshold * 100.0
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::AvailabilityMetric;

    #[test]
    fn alerts_once_each_way() {
        let mut ledger = AvailabilityLedger::new(2).with_day_length(10.0);
        let handle = ledger
            .register_metric(AvailabilityMetric::partial_moving_window(2))
            .unwrap();
        let mut monitor = Monitor::new(handle, 0.9);

        // no data yet
        ledger.report_availability(true, 0.0);
        assert_eq!(monitor.check(&ledger), None);

        ledger.report_availability(false, 5.0);
        assert!(matches!(
            monitor.check(&ledger),
            Some(Alert::BelowTarget { availability, threshold }) if availability == 0.0 && threshold == 0.9
        ));
        assert!(monitor.is_alerted());

        ledger.report_availability(false, 6.0);
        assert_eq!(monitor.check(&ledger), None);

        // the whole of the next day is available
        ledger.report_availability(true, 19.0);
        ledger.report_availability(true, 29.0);
        ledger.report_availability(true, 39.0);
        assert!(matches!(
            monitor.check(&ledger),
            Some(Alert::BackToNormal { .. })
        ));
        assert!(!monitor.is_alerted());
        assert_eq!(monitor.check(&ledger), None);
    }

    #[test]
    fn restored_alert() {
        let mut ledger = AvailabilityLedger::new(2).with_day_length(10.0);
        let handle = ledger
            .register_metric(AvailabilityMetric::partial_moving_window(2))
            .unwrap();
        let mut monitor = Monitor::new(handle, 0.5).with_alerted(true);

        ledger.report_availability(false, 0.0);
        ledger.report_availability(false, 5.0);
        // still below the target, already alerted
        assert_eq!(monitor.check(&ledger), None);
    }

    #[test]
    fn display() {
        let alert = Alert::BelowTarget {
            availability: 0.987,
            threshold: 0.99,
        };
        assert_eq!(
            alert.to_string(),
            "availability 98.70% is below the target of 99.00%"
        );
        assert_eq!(alert.threshold(), 0.99);
    }
}
