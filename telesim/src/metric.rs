use crate::ConfigError;
use chrono::{Datelike as _, Months, NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};
use telesim_core::{availability::AvailabilityMetric, defaults::DEFAULT_DAY_LENGTH};

/// Maps simulation time to calendar dates.
///
/// Day `0` starts on the epoch, at time `0`. Every day lasts `day_length`
/// seconds of simulation time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calendar {
    epoch: NaiveDate,
    day_length: f64,
}

/// How a metric is defined in a configuration file.
///
/// ```
/// # use telesim::MetricDefinition;
/// let definition: MetricDefinition =
///     serde_json::from_str(r#"{ "type": "monthly", "month": 1 }"#).unwrap();
/// assert_eq!(definition, MetricDefinition::Monthly { month: 1 });
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricDefinition {
    /// The last `window` full days.
    Moving { window: usize },
    /// The last `window` days, the current day included.
    PartialMoving { window: usize },
    /// From `first` to `last`, both included.
    Fixed { first: NaiveDate, last: NaiveDate },
    /// A calendar month, `month` months after the one the acceptance date
    /// pertains to.
    ///
    /// An acceptance within the first seven days of a month pertains to that
    /// month, later ones to the next month.
    Monthly { month: i32 },
}

/// Days of the month on which an acceptance still pertains to the month.
const GRACE_DAYS: u32 = 7;

impl Calendar {
    pub fn new(epoch: NaiveDate, day_length: f64) -> Self {
        Self { epoch, day_length }
    }

    pub fn epoch(&self) -> NaiveDate {
        self.epoch
    }

    pub fn day_length(&self) -> f64 {
        self.day_length
    }

    /// Index of the day of `date`.
    pub fn day(&self, date: NaiveDate) -> i64 {
        (date - self.epoch).num_days()
    }

    /// The date of the day `day`, `None` if out of the calendar's range.
    pub fn date(&self, day: i64) -> Option<NaiveDate> {
        self.epoch.checked_add_signed(TimeDelta::try_days(day)?)
    }

    /// Simulation time at the start of `date`.
    pub fn time(&self, date: NaiveDate) -> f64 {
        self.day(date) as f64 * self.day_length
    }

    /// The date at simulation time `t`.
    pub fn date_at(&self, t: f64) -> Option<NaiveDate> {
        self.date((t / self.day_length).floor() as i64)
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::new(default_epoch(), DEFAULT_DAY_LENGTH)
    }
}

pub(crate) fn default_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1951, 1, 1).unwrap_or(NaiveDate::MIN)
}

impl MetricDefinition {
    /// Build the metric in `calendar`.
    ///
    /// `accepted` is the date monthly metrics are relative to, it is ignored
    /// by the other definitions.
    pub fn to_metric(
        &self,
        calendar: &Calendar,
        accepted: Option<NaiveDate>,
    ) -> Result<AvailabilityMetric, ConfigError> {
        match *self {
            Self::Moving { window } => Ok(AvailabilityMetric::moving_window(window)),
            Self::PartialMoving { window } => Ok(AvailabilityMetric::partial_moving_window(window)),
            Self::Fixed { first, last } => {
                if last < first {
                    return Err(ConfigError::InvalidDate {
                        reason: format!("period ends on {last}, before it starts on {first}"),
                    });
                }
                Ok(AvailabilityMetric::period(calendar.day(first), calendar.day(last)))
            }
            Self::Monthly { month } => {
                let accepted = accepted.ok_or_else(|| ConfigError::InvalidDate {
                    reason: "monthly metric without an acceptance date".to_owned(),
                })?;
                let (first, last) = month_of(accepted, month).ok_or_else(|| {
                    ConfigError::InvalidDate {
                        reason: format!("month {month} after {accepted} is out of range"),
                    }
                })?;
                Ok(AvailabilityMetric::period(calendar.day(first), calendar.day(last)))
            }
        }
    }
}

/// First and last day of the month `offset` months after the one `accepted`
/// pertains to.
fn month_of(accepted: NaiveDate, offset: i32) -> Option<(NaiveDate, NaiveDate)> {
    let mut effective = accepted.with_day(1)?;
    if accepted.day() > GRACE_DAYS {
        effective = effective.checked_add_months(Months::new(1))?;
    }

    let months = Months::new(offset.unsigned_abs());
    let first = if offset >= 0 {
        effective.checked_add_months(months)?
    } else {
        effective.checked_sub_months(months)?
    };
    let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
    Some((first, last))
}
