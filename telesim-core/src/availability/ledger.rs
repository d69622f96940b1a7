use super::{AvailabilityMetric, LedgerError, PeriodState};
use crate::defaults::{DEFAULT_DAY_LENGTH, DEFAULT_WINDOW_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Handle of a metric registered with an [`AvailabilityLedger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetricHandle(usize);

/// Tracks the availability of a service in daily buckets.
///
/// Availability is reported as a stream of samples: each sample tells
/// whether the service was available from the previous sample up to now.
/// Full days are finalized into a moving window of `window_size` days, the
/// current day is tracked as two fractions: the part of the day elapsed and
/// the part of the day the service was available.
///
/// ```
/// use telesim_core::availability::{AvailabilityLedger, AvailabilityMetric};
///
/// let mut ledger = AvailabilityLedger::new(7).with_day_length(10.0);
/// let weekly = ledger
///     .register_metric(AvailabilityMetric::moving_window(7))
///     .unwrap();
///
/// ledger.report_availability(true, 0.0);
/// ledger.report_availability(false, 5.0);
/// ledger.report_availability(true, 10.0);
///
/// let metric = ledger.metric(weekly).unwrap();
/// assert_eq!(metric.availability(), Some(0.5));
/// assert_eq!(metric.to_string(), "50.00% over 1/7 days");
/// ```
#[derive(Debug, Clone)]
pub struct AvailabilityLedger {
    window_size: usize,
    day_length: f64,

    /// oldest first
    daily_availability: VecDeque<f64>,
    current_day: Option<i64>,
    day_fraction_available: f64,
    day_fraction_elapsed: f64,
    available: bool,

    metrics: Vec<AvailabilityMetric>,
}

/// The persisted state of an [`AvailabilityLedger`].
///
/// Metrics are re-derived from the daily availabilities when the state is
/// restored, except completed periods whose days may have left the window:
/// their figures are kept in `periods`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LedgerState {
    /// oldest first
    pub daily_availability: Vec<f64>,
    pub current_day: Option<i64>,
    pub day_fraction_available: f64,
    pub day_fraction_elapsed: f64,
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub periods: Vec<PeriodState>,
}

impl AvailabilityLedger {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            day_length: DEFAULT_DAY_LENGTH,
            daily_availability: VecDeque::with_capacity(window_size + 1),
            current_day: None,
            day_fraction_available: 0.0,
            day_fraction_elapsed: 0.0,
            available: false,
            metrics: Vec::new(),
        }
    }

    /// Length of a day, in seconds of simulation time.
    pub fn with_day_length(mut self, day_length: f64) -> Self {
        debug_assert!(day_length > 0.0, "days must have a positive length");
        self.day_length = day_length;
        self
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn day_length(&self) -> f64 {
        self.day_length
    }

    /// Whether the service was available at the last sample.
    pub fn available(&self) -> bool {
        self.available
    }

    /// Index of the day of the last sample, `None` before the first sample.
    pub fn current_day(&self) -> Option<i64> {
        self.current_day
    }

    /// Number of finalized days in the window.
    pub fn days(&self) -> usize {
        self.daily_availability.len()
    }

    /// The finalized days, oldest first.
    pub fn daily_availability(&self) -> impl DoubleEndedIterator<Item = f64> + '_ {
        self.daily_availability.iter().copied()
    }

    pub fn day_fraction_available(&self) -> f64 {
        self.day_fraction_available
    }

    pub fn day_fraction_elapsed(&self) -> f64 {
        self.day_fraction_elapsed
    }

    /// The availability over the window and the current day, `None` until a
    /// whole sample interval has been accounted for.
    pub fn availability(&self) -> Option<f64> {
        let available: f64 = self.daily_availability.iter().sum::<f64>() + self.day_fraction_available;
        let elapsed = self.daily_availability.len() as f64 + self.day_fraction_elapsed;
        (elapsed > 0.0).then(|| available / elapsed)
    }

    /// Record that the service was (or was not) `available` from the last
    /// sample until `t`, in seconds of simulation time.
    pub fn report_availability(&mut self, available: bool, t: f64) {
        let t_in_days = t / self.day_length;
        // days past i64 range are not a concern for a simulation clock
        let new_day = t_in_days.floor() as i64;
        let day_fraction = t_in_days - new_day as f64;

        let Some(current_day) = self.current_day else {
            // nothing is known of what happened before the first sample
            self.available = available;
            self.current_day = Some(new_day);
            return;
        };

        if new_day < current_day {
            warn!(new_day, current_day, "ignoring an availability sample from a past day");
            return;
        }
        self.available = available;

        if new_day > current_day {
            let last = self.day_fraction_available
                + if available {
                    1.0 - self.day_fraction_elapsed
                } else {
                    0.0
                };
            self.daily_availability.push_back(last);

            let skipped = usize::try_from(new_day - current_day - 1)
                .unwrap_or(usize::MAX)
                .min(self.window_size);
            let skipped_availability = if available { 1.0 } else { 0.0 };
            self.daily_availability
                .extend(std::iter::repeat_n(skipped_availability, skipped));

            self.day_fraction_elapsed = day_fraction;
            self.day_fraction_available = if available { day_fraction } else { 0.0 };

            while self.daily_availability.len() > self.window_size {
                self.daily_availability.pop_front();
            }

            debug!(
                day = new_day,
                finalized = last,
                skipped,
                days = self.daily_availability.len(),
                "new day"
            );
            self.current_day = Some(new_day);
            self.update_timelines();
        } else {
            if available {
                self.day_fraction_available += day_fraction - self.day_fraction_elapsed;
            }
            self.day_fraction_elapsed = day_fraction;
        }

        self.update_current_days();
    }

    /// Register a metric, computed from the history accumulated so far and
    /// kept up to date from now on.
    pub fn register_metric(
        &mut self,
        mut metric: AvailabilityMetric,
    ) -> Result<MetricHandle, LedgerError> {
        if !metric.computable_from(self.window_size) {
            return Err(LedgerError::MetricNotComputable {
                required: metric.required_days(),
                window_size: self.window_size,
            });
        }

        if let Some(current_day) = self.current_day {
            metric.update_timeline(self.daily_availability.iter().rev().copied(), current_day - 1);
            metric.update_current_day(self.day_fraction_available, self.day_fraction_elapsed);
        }

        info!(kind = ?metric.kind(), window_size = self.window_size, "metric registered");
        self.metrics.push(metric);
        Ok(MetricHandle(self.metrics.len() - 1))
    }

    pub fn metric(&self, handle: MetricHandle) -> Option<&AvailabilityMetric> {
        self.metrics.get(handle.0)
    }

    pub fn metrics(&self) -> impl Iterator<Item = (MetricHandle, &AvailabilityMetric)> {
        self.metrics
            .iter()
            .enumerate()
            .map(|(index, metric)| (MetricHandle(index), metric))
    }

    pub fn state(&self) -> LedgerState {
        LedgerState {
            daily_availability: self.daily_availability.iter().copied().collect(),
            current_day: self.current_day,
            day_fraction_available: self.day_fraction_available,
            day_fraction_elapsed: self.day_fraction_elapsed,
            available: self.available,
            periods: self
                .metrics
                .iter()
                .filter_map(|metric| match metric {
                    AvailabilityMetric::Period(period) => period.state(),
                    _ => None,
                })
                .collect(),
        }
    }

    /// Replace the history with `state` and bring the registered metrics up
    /// to date with it.
    pub fn restore(&mut self, state: LedgerState) -> Result<(), LedgerError> {
        state.validate(self.window_size)?;

        let LedgerState {
            daily_availability,
            current_day,
            day_fraction_available,
            day_fraction_elapsed,
            available,
            periods,
        } = state;
        self.daily_availability = daily_availability.into();
        self.current_day = current_day;
        self.day_fraction_available = day_fraction_available;
        self.day_fraction_elapsed = day_fraction_elapsed;
        self.available = available;

        if self.current_day.is_some() {
            self.update_timelines();
            for metric in &mut self.metrics {
                let AvailabilityMetric::Period(period) = metric else {
                    continue;
                };
                let bounds = (period.first_day(), period.last_day());
                if let Some(state) = periods
                    .iter()
                    .find(|state| (state.first_day, state.last_day) == bounds)
                {
                    period.restore(state);
                }
            }
            self.update_current_days();
        }
        Ok(())
    }

    fn update_timelines(&mut self) {
        let Some(current_day) = self.current_day else {
            return;
        };
        for metric in &mut self.metrics {
            metric.update_timeline(self.daily_availability.iter().rev().copied(), current_day - 1);
        }
    }

    fn update_current_days(&mut self) {
        for metric in &mut self.metrics {
            metric.update_current_day(self.day_fraction_available, self.day_fraction_elapsed);
        }
    }
}

impl Default for AvailabilityLedger {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

impl LedgerState {
    fn validate(&self, window_size: usize) -> Result<(), LedgerError> {
        let is_fraction = |value: f64| (0.0..=1.0).contains(&value);

        if self.daily_availability.len() > window_size {
            return Err(LedgerError::InvalidState {
                reason: "more days than the window holds",
            });
        }
        if !self.daily_availability.iter().copied().all(is_fraction) {
            return Err(LedgerError::InvalidState {
                reason: "daily availability outside of [0, 1]",
            });
        }
        if !is_fraction(self.day_fraction_elapsed)
            || !is_fraction(self.day_fraction_available)
            || self.day_fraction_available > self.day_fraction_elapsed
        {
            return Err(LedgerError::InvalidState {
                reason: "inconsistent current day fractions",
            });
        }
        if self.current_day.is_none() && !self.daily_availability.is_empty() {
            return Err(LedgerError::InvalidState {
                reason: "days recorded without a current day",
            });
        }
        for period in &self.periods {
            if self.current_day.is_none_or(|day| period.last_day >= day)
                || period.last_day < period.first_day
            {
                return Err(LedgerError::InvalidState {
                    reason: "period completed after the current day",
                });
            }
            let span = period.last_day.abs_diff(period.first_day) + 1;
            if period.days as u64 > span
                || !(0.0..=period.days as f64).contains(&period.days_available)
            {
                return Err(LedgerError::InvalidState {
                    reason: "inconsistent period figures",
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: f64 = 10.0;

    fn ledger(window_size: usize) -> AvailabilityLedger {
        AvailabilityLedger::new(window_size).with_day_length(DAY)
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "{actual} is not close to {expected}"
        );
    }

    #[test]
    fn first_sample_only_starts_the_clock() {
        let mut ledger = ledger(3);
        let handle = ledger
            .register_metric(AvailabilityMetric::partial_moving_window(3))
            .unwrap();

        ledger.report_availability(true, 15.0);
        assert_eq!(ledger.current_day(), Some(1));
        assert!(ledger.available());
        assert_eq!(ledger.days(), 0);
        assert_eq!(ledger.availability(), None);
        assert_eq!(ledger.metric(handle).unwrap().availability(), None);
    }

    #[test]
    fn same_day_fractions() {
        let mut ledger = ledger(3);
        ledger.report_availability(true, 0.0);
        ledger.report_availability(true, 2.0);
        ledger.report_availability(false, 5.0);
        ledger.report_availability(true, 6.0);

        assert_close(ledger.day_fraction_elapsed(), 0.6);
        // [0, 0.2] and [0.5, 0.6]
        assert_close(ledger.day_fraction_available(), 0.3);
        assert_close(ledger.availability().unwrap(), 0.5);
    }

    #[test]
    fn rollover_credits_the_rest_of_the_day() {
        let mut ledger = ledger(3);
        ledger.report_availability(true, 0.0);
        ledger.report_availability(true, 4.0);
        ledger.report_availability(true, 12.0);

        // 0.4 up to the second sample, then the remaining 0.6 of day 0 at the
        // availability of the third
        let days: Vec<_> = ledger.daily_availability().collect();
        assert_eq!(days.len(), 1);
        assert_close(days[0], 1.0);
        assert_close(ledger.day_fraction_elapsed(), 0.2);
        assert_close(ledger.day_fraction_available(), 0.2);

        ledger.report_availability(false, 25.0);
        let days: Vec<_> = ledger.daily_availability().collect();
        assert_close(days[1], 0.2);
        assert_eq!(ledger.day_fraction_available(), 0.0);
    }

    #[test]
    fn skipped_days() {
        let mut ledger = ledger(3);
        ledger.report_availability(true, 5.0);
        ledger.report_availability(true, 45.0);

        // day 0 then the skipped days 1 to 3, the window keeps 3 of them
        assert_eq!(ledger.current_day(), Some(4));
        assert_eq!(ledger.daily_availability().collect::<Vec<_>>(), vec![1.0, 1.0, 1.0]);

        // a very long gap does not fill the window more than once
        ledger.report_availability(false, 1e12);
        assert_eq!(ledger.daily_availability().collect::<Vec<_>>(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn past_samples_are_ignored() {
        let mut ledger = ledger(3);
        ledger.report_availability(true, 25.0);
        ledger.report_availability(false, 5.0);

        assert_eq!(ledger.current_day(), Some(2));
        assert!(ledger.available());
    }

    #[test]
    fn metric_not_computable() {
        let mut ledger = ledger(3);
        assert!(matches!(
            ledger.register_metric(AvailabilityMetric::moving_window(4)),
            Err(LedgerError::MetricNotComputable {
                required: 4,
                window_size: 3
            })
        ));
        assert!(ledger.register_metric(AvailabilityMetric::partial_moving_window(4)).is_ok());
        assert!(matches!(
            ledger.register_metric(AvailabilityMetric::period(0, 3)),
            Err(LedgerError::MetricNotComputable { required: 4, .. })
        ));
    }

    #[test]
    fn late_registration_is_backfilled() {
        let mut ledger = ledger(3);
        ledger.report_availability(true, 0.0);
        ledger.report_availability(true, 10.0);
        ledger.report_availability(false, 20.0);
        ledger.report_availability(true, 25.0);

        let moving = ledger
            .register_metric(AvailabilityMetric::moving_window(3))
            .unwrap();
        let period = ledger
            .register_metric(AvailabilityMetric::period(0, 1))
            .unwrap();

        let moving = ledger.metric(moving).unwrap();
        assert_eq!(moving.availability(), Some(0.5));
        assert!(moving.is_partial());

        let period = ledger.metric(period).unwrap();
        assert_eq!(period.availability(), Some(0.5));
        assert!(!period.is_partial());
    }

    #[test]
    fn state_round_trip() {
        let mut ledger = ledger(3);
        ledger.report_availability(true, 3.0);
        ledger.report_availability(false, 17.0);
        ledger.report_availability(true, 21.0);

        let state = ledger.state();
        let json = serde_json::to_string(&state).unwrap();
        let restored: LedgerState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);

        let mut copy = self::ledger(3);
        copy.restore(restored).unwrap();
        assert_eq!(copy.state(), ledger.state());
    }

    #[test]
    fn completed_period_survives_restore() {
        let mut ledger = ledger(3);
        let handle = ledger
            .register_metric(AvailabilityMetric::period(0, 1))
            .unwrap();
        // up on day 0 and half of day 1
        for step in 0..=60 {
            let t = f64::from(step);
            ledger.report_availability(t <= 15.0, t);
        }
        assert_eq!(ledger.days(), 3);
        let period = ledger.metric(handle).unwrap();
        assert_close(period.availability().unwrap(), 0.75);

        let mut restored = self::ledger(3);
        let handle = restored
            .register_metric(AvailabilityMetric::period(0, 1))
            .unwrap();
        restored.restore(ledger.state()).unwrap();
        let restored_period = restored.metric(handle).unwrap();
        assert_eq!(restored_period, period);
        assert_eq!(restored_period.to_string(), "75.00% from day 0 to day 1");
        assert_eq!(restored.state(), ledger.state());
    }

    #[test]
    fn invalid_state() {
        let mut ledger = ledger(2);
        let state = LedgerState {
            daily_availability: vec![1.0, 1.0, 1.0],
            current_day: Some(3),
            ..LedgerState::default()
        };
        assert!(matches!(
            ledger.restore(state),
            Err(LedgerError::InvalidState { .. })
        ));

        let state = LedgerState {
            current_day: Some(3),
            day_fraction_available: 0.5,
            day_fraction_elapsed: 0.25,
            ..LedgerState::default()
        };
        assert!(matches!(
            ledger.restore(state),
            Err(LedgerError::InvalidState { .. })
        ));

        let state = LedgerState {
            current_day: Some(3),
            periods: vec![PeriodState {
                first_day: 2,
                last_day: 3,
                days_available: 1.0,
                days: 2,
            }],
            ..LedgerState::default()
        };
        assert!(matches!(
            ledger.restore(state),
            Err(LedgerError::InvalidState { .. })
        ));
    }
}
