use serde::{Deserialize, Serialize};
use std::fmt;

/// A property derived from a timeline of daily availabilities.
///
/// Metrics are registered with an
/// [`AvailabilityLedger`](super::AvailabilityLedger) which keeps them up to
/// date as days go by.
#[derive(Debug, Clone, PartialEq)]
pub enum AvailabilityMetric {
    MovingWindow(MovingWindowAvailability),
    PartialMovingWindow(PartialMovingWindowAvailability),
    Period(PeriodAvailability),
}

/// Availability over a moving window of full days, e.g. 98.7% over the 14
/// days ending yesterday (included).
#[derive(Debug, Clone, PartialEq)]
pub struct MovingWindowAvailability {
    window_size: usize,
    availability: Option<f64>,
    window_filling: usize,
}

/// Availability over a moving window that includes the current day, e.g.
/// 98.7% over the last 15 days, including today.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialMovingWindowAvailability {
    window_size: usize,
    full_days_available: f64,
    full_days: usize,
    day_fraction_available: f64,
    day_fraction_elapsed: f64,
}

/// Availability over a fixed range of days, both ends included.
///
/// The metric stops changing once the ledger has finalized its last day.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodAvailability {
    first_day: i64,
    last_day: i64,
    days_available: f64,
    days: usize,
    complete: bool,
}

/// The persisted figures of a completed [`PeriodAvailability`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodState {
    pub first_day: i64,
    pub last_day: i64,
    pub days_available: f64,
    pub days: usize,
}

/// How a metric is defined, without its state. This is what gets written in
/// configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricKind {
    Moving { window: usize },
    PartialMoving { window: usize },
    Period { first_day: i64, last_day: i64 },
}

impl AvailabilityMetric {
    pub fn moving_window(window_size: usize) -> Self {
        Self::MovingWindow(MovingWindowAvailability::new(window_size))
    }

    pub fn partial_moving_window(window_size: usize) -> Self {
        Self::PartialMovingWindow(PartialMovingWindowAvailability::new(window_size))
    }

    pub fn period(first_day: i64, last_day: i64) -> Self {
        Self::Period(PeriodAvailability::new(first_day, last_day))
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Self::MovingWindow(metric) => MetricKind::Moving {
                window: metric.window_size,
            },
            Self::PartialMovingWindow(metric) => MetricKind::PartialMoving {
                window: metric.window_size,
            },
            Self::Period(metric) => MetricKind::Period {
                first_day: metric.first_day,
                last_day: metric.last_day,
            },
        }
    }

    /// Number of full days of history the metric needs, in addition to the
    /// current partial day.
    pub fn required_days(&self) -> usize {
        match self {
            Self::MovingWindow(metric) => metric.window_size,
            Self::PartialMovingWindow(metric) => metric.window_size.saturating_sub(1),
            Self::Period(metric) => metric.span(),
        }
    }

    /// Whether the metric can be computed from a moving window of `days`
    /// full days.
    pub fn computable_from(&self, days: usize) -> bool {
        days >= self.required_days()
    }

    /// Update the timeline of full days, most recent first. `last_day` is
    /// the index of the first day yielded.
    pub fn update_timeline<I>(&mut self, daily_availabilities: I, last_day: i64)
    where
        I: IntoIterator<Item = f64>,
    {
        match self {
            Self::MovingWindow(metric) => metric.update_timeline(daily_availabilities),
            Self::PartialMovingWindow(metric) => metric.update_timeline(daily_availabilities),
            Self::Period(metric) => metric.update_timeline(daily_availabilities, last_day),
        }
    }

    /// Update the current partial day.
    pub fn update_current_day(&mut self, day_fraction_available: f64, day_fraction_elapsed: f64) {
        if let Self::PartialMovingWindow(metric) = self {
            metric.day_fraction_available = day_fraction_available;
            metric.day_fraction_elapsed = day_fraction_elapsed;
        }
    }

    /// The availability, between 0 and 1, or `None` while there is nothing
    /// to measure it from.
    pub fn availability(&self) -> Option<f64> {
        match self {
            Self::MovingWindow(metric) => metric.availability,
            Self::PartialMovingWindow(metric) => metric.availability(),
            Self::Period(metric) => metric.availability(),
        }
    }

    /// `true` while the metric does not yet cover all the days it is
    /// defined over.
    pub fn is_partial(&self) -> bool {
        match self {
            Self::MovingWindow(metric) => metric.window_filling < metric.window_size,
            Self::PartialMovingWindow(metric) => metric.full_days + 1 < metric.window_size,
            Self::Period(metric) => !metric.complete,
        }
    }
}

impl MovingWindowAvailability {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            availability: None,
            window_filling: 0,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Number of full days currently accounted for.
    pub fn window_filling(&self) -> usize {
        self.window_filling
    }

    fn update_timeline<I>(&mut self, daily_availabilities: I)
    where
        I: IntoIterator<Item = f64>,
    {
        let (sum, count) = sum_and_count(daily_availabilities.into_iter().take(self.window_size));
        self.availability = (count > 0).then(|| sum / count as f64);
        self.window_filling = count;
    }
}

impl PartialMovingWindowAvailability {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            full_days_available: 0.0,
            full_days: 0,
            day_fraction_available: 0.0,
            day_fraction_elapsed: 0.0,
        }
    }

    /// Includes the current day.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Number of days accounted for, the current day included.
    pub fn window_filling(&self) -> usize {
        self.full_days + 1
    }

    fn update_timeline<I>(&mut self, daily_availabilities: I)
    where
        I: IntoIterator<Item = f64>,
    {
        let full_days = self.window_size.saturating_sub(1);
        let (sum, count) = sum_and_count(daily_availabilities.into_iter().take(full_days));
        self.full_days_available = sum;
        self.full_days = count;
    }

    fn availability(&self) -> Option<f64> {
        let elapsed = self.full_days as f64 + self.day_fraction_elapsed;
        (elapsed > 0.0).then(|| (self.full_days_available + self.day_fraction_available) / elapsed)
    }
}

impl PeriodAvailability {
    pub fn new(first_day: i64, last_day: i64) -> Self {
        Self {
            first_day,
            last_day,
            days_available: 0.0,
            days: 0,
            complete: false,
        }
    }

    pub fn first_day(&self) -> i64 {
        self.first_day
    }

    pub fn last_day(&self) -> i64 {
        self.last_day
    }

    /// Number of days in the period.
    pub fn span(&self) -> usize {
        usize::try_from(self.last_day - self.first_day + 1).unwrap_or(0)
    }

    fn update_timeline<I>(&mut self, daily_availabilities: I, last_day: i64)
    where
        I: IntoIterator<Item = f64>,
    {
        if self.complete {
            return;
        }

        let in_period = daily_availabilities
            .into_iter()
            .zip((0..).map(|age| last_day - age))
            .map(|(availability, day)| (day, availability))
            .take_while(|(day, _)| *day >= self.first_day)
            .filter(|(day, _)| *day <= self.last_day)
            .map(|(_, availability)| availability);
        let (sum, count) = sum_and_count(in_period);
        self.days_available = sum;
        self.days = count;
        self.complete = last_day >= self.last_day;
    }

    fn availability(&self) -> Option<f64> {
        (self.days > 0).then(|| self.days_available / self.days as f64)
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// The figures of the period, once it is complete.
    pub fn state(&self) -> Option<PeriodState> {
        self.complete.then(|| PeriodState {
            first_day: self.first_day,
            last_day: self.last_day,
            days_available: self.days_available,
            days: self.days,
        })
    }

    /// Take the figures of a completed period, whose days may have left the
    /// ledger's window since.
    pub(super) fn restore(&mut self, state: &PeriodState) {
        self.days_available = state.days_available;
        self.days = state.days;
        self.complete = true;
    }
}

fn sum_and_count<I>(availabilities: I) -> (f64, usize)
where
    I: IntoIterator<Item = f64>,
{
    availabilities
        .into_iter()
        .fold((0.0, 0), |(sum, count), availability| (sum + availability, count + 1))
}

struct Percent(f64);

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.0 * 100.0)
    }
}

impl fmt::Display for AvailabilityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(availability) = self.availability() else {
            return match self {
                Self::Period(metric) => write!(
                    f,
                    "no data from day {} to day {}",
                    metric.first_day, metric.last_day
                ),
                _ => f.write_str("no data"),
            };
        };
        let availability = Percent(availability);

        match self {
            Self::MovingWindow(metric) if self.is_partial() => write!(
                f,
                "{availability} over {}/{} days",
                metric.window_filling, metric.window_size
            ),
            Self::MovingWindow(metric) => {
                write!(f, "{availability} over the last {} days", metric.window_size)
            }
            Self::PartialMovingWindow(metric) if self.is_partial() => write!(
                f,
                "{availability} over {}/{} days including today",
                metric.window_filling(),
                metric.window_size
            ),
            Self::PartialMovingWindow(metric) => write!(
                f,
                "{availability} over the last {} days including today",
                metric.window_size
            ),
            Self::Period(metric) => {
                write!(
                    f,
                    "{availability} from day {} to day {}",
                    metric.first_day, metric.last_day
                )?;
                if !metric.complete {
                    f.write_str(" (in progress)")?;
                }
                Ok(())
            }
        }
    }
}

impl From<MetricKind> for AvailabilityMetric {
    fn from(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Moving { window } => Self::moving_window(window),
            MetricKind::PartialMoving { window } => Self::partial_moving_window(window),
            MetricKind::Period {
                first_day,
                last_day,
            } => Self::period(first_day, last_day),
        }
    }
}
