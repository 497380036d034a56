//! Planning of `add` requests.
//!
//! The `add` command accepts a loose bag of flags. [`AddOptions::validate`]
//! checks them once, up front, and produces an [`EventPlan`]; nothing is
//! resolved or sent before that pass succeeds. The plan then expands a list
//! of [`EventSpec`]s (one from flags, or one per batch file line) into
//! ready-to-send [`EventRequest`]s.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::debug;

use crate::event::EventRequest;
use crate::recurrence::{Recurrence, Repeat};
use crate::resolve::{PartialDateTime, ResolveError, resolve, shift_days};

/// A time of day as typed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    /// Hour of the day.
    pub hour: u32,
    /// Minute of the hour.
    pub minute: u32,
}

impl TimeOfDay {
    /// Creates a new time of day. Range checks happen at resolution.
    pub fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    fn partial(self, day: Option<u32>, month: Option<u32>) -> PartialDateTime {
        PartialDateTime {
            day,
            month,
            year: None,
            hour: Some(self.hour),
            minute: self.minute,
            second: 0,
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// One event to create: a name and its start and end times of day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSpec {
    /// Event title.
    pub name: String,
    /// Start time of day.
    pub start: TimeOfDay,
    /// End time of day.
    pub end: TimeOfDay,
}

impl EventSpec {
    /// Creates a new event spec.
    pub fn new(name: impl Into<String>, start: TimeOfDay, end: TimeOfDay) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }
}

/// A day named relative to today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelativeDay {
    /// The current day.
    #[default]
    Today,
    /// The day after the current day.
    Tomorrow,
}

/// Error returned when parsing an unknown relative day.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown day '{0}', expected 'today' or 'tomorrow'")]
pub struct UnknownDay(pub String);

impl FromStr for RelativeDay {
    type Err = UnknownDay;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "tomorrow" => Ok(Self::Tomorrow),
            _ => Err(UnknownDay(s.to_string())),
        }
    }
}

/// Which day the planned events fall on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySelector {
    /// Today or tomorrow.
    Relative(RelativeDay),
    /// An explicit day-of-month and/or month; absent parts default to now.
    Explicit {
        /// Day of the month.
        date: Option<u32>,
        /// Month of the year.
        month: Option<u32>,
    },
}

impl Default for DaySelector {
    fn default() -> Self {
        Self::Relative(RelativeDay::Today)
    }
}

impl DaySelector {
    /// Returns the (day, month) fields to resolve against.
    fn fields(&self, now: &DateTime<Tz>) -> Result<(Option<u32>, Option<u32>), ResolveError> {
        match self {
            Self::Relative(RelativeDay::Today) => {
                let today = now.date_naive();
                Ok((Some(today.day()), Some(today.month())))
            }
            Self::Relative(RelativeDay::Tomorrow) => {
                let tomorrow = now
                    .date_naive()
                    .succ_opt()
                    .ok_or(ResolveError::OutOfRange)?;
                Ok((Some(tomorrow.day()), Some(tomorrow.month())))
            }
            Self::Explicit { date, month } => Ok((*date, *month)),
        }
    }
}

/// Largest count accepted for any repetition or recurrence option.
pub const MAX_COUNT: u32 = 1000;

/// Flags of two options that may not be combined, or an invalid count.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    /// Two mutually exclusive options were supplied.
    #[error("'{0}' option can't be used with the '{1}' option")]
    Exclusive(&'static str, &'static str),

    /// A repetition count of zero was supplied.
    #[error("'{0}' count must be at least 1")]
    ZeroCount(&'static str),

    /// A repetition count above [`MAX_COUNT`] was supplied.
    #[error("'{0}' count must be at most {max}, got {1}", max = MAX_COUNT)]
    CountTooLarge(&'static str, u32),
}

/// Raw scheduling flags of the `add` command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOptions {
    /// Explicit day of the month.
    pub date: Option<u32>,
    /// Explicit month.
    pub month: Option<u32>,
    /// Relative day.
    pub day: Option<RelativeDay>,
    /// Fortnightly repeat count.
    pub fortnightly: Option<u32>,
    /// Repeat as (interval in days, count).
    pub repeat: Option<(u32, u32)>,
    /// Weekly recurrence count.
    pub weekly: Option<u32>,
    /// Daily recurrence count.
    pub daily: Option<u32>,
}

impl AddOptions {
    /// Checks flag combinations and builds the plan.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError`] when mutually exclusive options are
    /// combined or a count is zero or above [`MAX_COUNT`].
    pub fn validate(&self) -> Result<EventPlan, ConflictError> {
        let exclusive = [
            (self.daily.is_some(), self.weekly.is_some(), "daily", "weekly"),
            (
                self.fortnightly.is_some(),
                self.weekly.is_some(),
                "fortnightly",
                "weekly",
            ),
            (
                self.fortnightly.is_some(),
                self.repeat.is_some(),
                "fortnightly",
                "repeat",
            ),
            (self.day.is_some(), self.date.is_some(), "day", "date"),
            (self.day.is_some(), self.month.is_some(), "day", "month"),
        ];
        if let Some((_, _, a, b)) = exclusive.iter().find(|(x, y, _, _)| *x && *y) {
            return Err(ConflictError::Exclusive(*a, *b));
        }

        let counts = [
            ("weekly", self.weekly),
            ("daily", self.daily),
            ("fortnightly", self.fortnightly),
            ("repeat", self.repeat.map(|(_, count)| count)),
        ];
        for (name, count) in counts {
            match count {
                Some(0) => return Err(ConflictError::ZeroCount(name)),
                Some(n) if n > MAX_COUNT => return Err(ConflictError::CountTooLarge(name, n)),
                _ => {}
            }
        }

        let day = match self.day {
            Some(relative) => DaySelector::Relative(relative),
            None if self.date.is_none() && self.month.is_none() => DaySelector::default(),
            None => DaySelector::Explicit {
                date: self.date,
                month: self.month,
            },
        };

        let recurrence = match (self.weekly, self.daily) {
            (Some(count), _) => Recurrence::Weekly(count),
            (None, Some(count)) => Recurrence::Daily(count),
            (None, None) => Recurrence::None,
        };

        let repeat = match (self.fortnightly, self.repeat) {
            (Some(count), _) => Repeat::Fortnightly(count),
            (None, Some((interval_days, count))) => Repeat::Every {
                interval_days,
                count,
            },
            (None, None) => Repeat::Once,
        };

        Ok(EventPlan {
            day,
            recurrence,
            repeat,
        })
    }
}

/// A validated schedule for one `add` invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventPlan {
    /// Day the events fall on.
    pub day: DaySelector,
    /// Server-side recurrence applied to every event.
    pub recurrence: Recurrence,
    /// Client-side repetition.
    pub repeat: Repeat,
}

impl EventPlan {
    /// Expands the plan into event requests.
    ///
    /// Every spec is resolved once: the start against `now`, the end against
    /// `now` with the start as reference. The pair is then shifted by each
    /// repeat offset. Requests are ordered by repetition first, then by spec.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if a time or date is out of range.
    pub fn build(
        &self,
        specs: &[EventSpec],
        now: &DateTime<Tz>,
    ) -> Result<Vec<EventRequest>, ResolveError> {
        let (day, month) = self.day.fields(now)?;

        let resolved = specs
            .iter()
            .map(|spec| {
                let start = resolve(&spec.start.partial(day, month), now, None)?;
                let end = resolve(&spec.end.partial(day, month), now, Some(&start))?;
                Ok::<_, ResolveError>((spec, start, end))
            })
            .collect::<Result<Vec<_>, ResolveError>>()?;

        let mut requests = Vec::new();
        for offset in self.repeat.offsets() {
            for (spec, start, end) in &resolved {
                let start = shift_days(start, offset)?;
                let end = shift_days(end, offset)?;
                debug!(name = %spec.name, %start, %end, "planned event");
                requests.push(
                    EventRequest::new(&spec.name, &start, &end).with_recurrence(self.recurrence),
                );
            }
        }

        Ok(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::London;

    fn london(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        London.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn spec(name: &str, start: (u32, u32), end: (u32, u32)) -> EventSpec {
        EventSpec::new(
            name,
            TimeOfDay::new(start.0, start.1),
            TimeOfDay::new(end.0, end.1),
        )
    }

    mod validation {
        use super::*;

        #[test]
        fn defaults_to_single_event_today() {
            let plan = AddOptions::default().validate().unwrap();
            assert_eq!(plan, EventPlan::default());
            assert_eq!(plan.day, DaySelector::Relative(RelativeDay::Today));
        }

        #[test]
        fn rejects_exclusive_combinations() {
            let cases = [
                (
                    AddOptions {
                        weekly: Some(2),
                        daily: Some(3),
                        ..Default::default()
                    },
                    ("daily", "weekly"),
                ),
                (
                    AddOptions {
                        fortnightly: Some(2),
                        weekly: Some(3),
                        ..Default::default()
                    },
                    ("fortnightly", "weekly"),
                ),
                (
                    AddOptions {
                        fortnightly: Some(2),
                        repeat: Some((3, 4)),
                        ..Default::default()
                    },
                    ("fortnightly", "repeat"),
                ),
                (
                    AddOptions {
                        day: Some(RelativeDay::Tomorrow),
                        date: Some(12),
                        ..Default::default()
                    },
                    ("day", "date"),
                ),
                (
                    AddOptions {
                        day: Some(RelativeDay::Today),
                        month: Some(5),
                        ..Default::default()
                    },
                    ("day", "month"),
                ),
            ];
            for (options, (a, b)) in cases {
                assert_eq!(
                    options.validate().unwrap_err(),
                    ConflictError::Exclusive(a, b)
                );
            }
        }

        #[test]
        fn allows_recurrence_with_client_repeat() {
            let plan = AddOptions {
                daily: Some(2),
                fortnightly: Some(3),
                ..Default::default()
            }
            .validate()
            .unwrap();
            assert_eq!(plan.recurrence, Recurrence::Daily(2));
            assert_eq!(plan.repeat, Repeat::Fortnightly(3));
        }

        #[test]
        fn rejects_zero_counts() {
            let options = AddOptions {
                repeat: Some((7, 0)),
                ..Default::default()
            };
            assert_eq!(
                options.validate().unwrap_err(),
                ConflictError::ZeroCount("repeat")
            );
        }

        #[test]
        fn rejects_huge_counts() {
            let options = AddOptions {
                repeat: Some((1, u32::MAX)),
                ..Default::default()
            };
            assert_eq!(
                options.validate().unwrap_err(),
                ConflictError::CountTooLarge("repeat", u32::MAX)
            );

            let options = AddOptions {
                weekly: Some(MAX_COUNT + 1),
                ..Default::default()
            };
            assert!(matches!(
                options.validate(),
                Err(ConflictError::CountTooLarge("weekly", _))
            ));

            let options = AddOptions {
                fortnightly: Some(MAX_COUNT),
                ..Default::default()
            };
            assert!(options.validate().is_ok());
        }

        #[test]
        fn explicit_date_and_month() {
            let plan = AddOptions {
                date: Some(20),
                month: Some(6),
                ..Default::default()
            }
            .validate()
            .unwrap();
            assert_eq!(
                plan.day,
                DaySelector::Explicit {
                    date: Some(20),
                    month: Some(6)
                }
            );
        }

        #[test]
        fn conflict_message() {
            let err = ConflictError::Exclusive("daily", "weekly");
            assert_eq!(
                err.to_string(),
                "'daily' option can't be used with the 'weekly' option"
            );
        }

        #[test]
        fn relative_day_parsing() {
            assert_eq!("today".parse::<RelativeDay>().unwrap(), RelativeDay::Today);
            assert_eq!(
                "TOMORROW".parse::<RelativeDay>().unwrap(),
                RelativeDay::Tomorrow
            );
            assert!("yesterday".parse::<RelativeDay>().is_err());
        }
    }

    mod build {
        use super::*;

        #[test]
        fn batch_line_on_explicit_date() {
            let now = london(2024, 6, 1, 8, 0);
            let plan = AddOptions {
                date: Some(20),
                month: Some(6),
                ..Default::default()
            }
            .validate()
            .unwrap();

            let requests = plan
                .build(&[spec("TeamSync", (9, 30), (10, 45))], &now)
                .unwrap();
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0].summary, "TeamSync");
            assert_eq!(requests[0].start.date_time, "2024-06-20T09:30:00");
            assert_eq!(requests[0].end.date_time, "2024-06-20T10:45:00");
            assert_eq!(requests[0].start.time_zone, "Europe/London");
        }

        #[test]
        fn tomorrow_crosses_month_end() {
            let now = london(2024, 1, 31, 12, 0);
            let plan = AddOptions {
                day: Some(RelativeDay::Tomorrow),
                ..Default::default()
            }
            .validate()
            .unwrap();
            let requests = plan.build(&[spec("Standup", (9, 0), (9, 15))], &now).unwrap();
            assert_eq!(requests[0].start.date_time, "2024-02-01T09:00:00");
        }

        #[test]
        fn tomorrow_crosses_year_end() {
            let now = london(2024, 12, 31, 12, 0);
            let plan = AddOptions {
                day: Some(RelativeDay::Tomorrow),
                ..Default::default()
            }
            .validate()
            .unwrap();
            let requests = plan.build(&[spec("Brunch", (11, 0), (12, 0))], &now).unwrap();
            assert_eq!(requests[0].start.date_time, "2025-01-01T11:00:00");
        }

        #[test]
        fn midnight_crossing_end_moves_to_next_day() {
            let now = london(2024, 3, 15, 9, 0);
            let plan = EventPlan::default();
            let requests = plan.build(&[spec("Night shift", (22, 0), (2, 0))], &now).unwrap();
            assert_eq!(requests[0].start.date_time, "2024-03-15T22:00:00");
            assert_eq!(requests[0].end.date_time, "2024-03-16T02:00:00");
        }

        #[test]
        fn fortnightly_repeats_keep_end_after_start() {
            let now = london(2024, 3, 15, 9, 0);
            let plan = AddOptions {
                fortnightly: Some(3),
                ..Default::default()
            }
            .validate()
            .unwrap();
            let requests = plan.build(&[spec("Late", (23, 0), (1, 0))], &now).unwrap();

            let pairs: Vec<(&str, &str)> = requests
                .iter()
                .map(|r| (r.start.date_time.as_str(), r.end.date_time.as_str()))
                .collect();
            assert_eq!(
                pairs,
                vec![
                    ("2024-03-15T23:00:00", "2024-03-16T01:00:00"),
                    ("2024-03-29T23:00:00", "2024-03-30T01:00:00"),
                    ("2024-04-12T23:00:00", "2024-04-13T01:00:00"),
                ]
            );
        }

        #[test]
        fn repeats_iterate_outside_specs() {
            let now = london(2024, 5, 1, 7, 0);
            let plan = AddOptions {
                repeat: Some((7, 2)),
                weekly: Some(4),
                ..Default::default()
            }
            .validate()
            .unwrap();
            let specs = [spec("A", (9, 0), (10, 0)), spec("B", (11, 0), (12, 0))];
            let requests = plan.build(&specs, &now).unwrap();

            let order: Vec<(&str, &str)> = requests
                .iter()
                .map(|r| (r.summary.as_str(), r.start.date_time.as_str()))
                .collect();
            assert_eq!(
                order,
                vec![
                    ("A", "2024-05-01T09:00:00"),
                    ("B", "2024-05-01T11:00:00"),
                    ("A", "2024-05-08T09:00:00"),
                    ("B", "2024-05-08T11:00:00"),
                ]
            );
            assert!(
                requests
                    .iter()
                    .all(|r| r.recurrence == vec!["RRULE:FREQ=WEEKLY;COUNT=4"])
            );
        }

        #[test]
        fn past_explicit_date_rolls_into_next_year() {
            let now = london(2024, 3, 15, 10, 0);
            let plan = AddOptions {
                date: Some(10),
                ..Default::default()
            }
            .validate()
            .unwrap();
            let requests = plan.build(&[spec("Review", (9, 0), (10, 0))], &now).unwrap();
            assert_eq!(requests[0].start.date_time, "2025-03-10T09:00:00");
            assert_eq!(requests[0].end.date_time, "2025-03-10T10:00:00");
        }

        #[test]
        fn end_rolled_into_dst_gap() {
            let now = london(2024, 3, 30, 8, 0);
            let requests = EventPlan::default()
                .build(&[spec("Late", (22, 0), (1, 30))], &now)
                .unwrap();
            assert_eq!(requests[0].start.date_time, "2024-03-30T22:00:00");
            assert_eq!(requests[0].end.date_time, "2024-03-31T02:30:00");
        }

        #[test]
        fn repeat_landing_in_dst_gap() {
            let now = london(2024, 3, 3, 0, 0);
            let plan = AddOptions {
                fortnightly: Some(3),
                ..Default::default()
            }
            .validate()
            .unwrap();
            let requests = plan.build(&[spec("Early", (1, 30), (3, 0))], &now).unwrap();

            let pairs: Vec<(&str, &str)> = requests
                .iter()
                .map(|r| (r.start.date_time.as_str(), r.end.date_time.as_str()))
                .collect();
            assert_eq!(
                pairs,
                vec![
                    ("2024-03-03T01:30:00", "2024-03-03T03:00:00"),
                    ("2024-03-17T01:30:00", "2024-03-17T03:00:00"),
                    ("2024-03-31T02:30:00", "2024-03-31T03:00:00"),
                ]
            );
        }

        #[test]
        fn invalid_hour_is_reported() {
            let now = london(2024, 3, 15, 10, 0);
            let err = EventPlan::default()
                .build(&[spec("Bad", (25, 0), (26, 0))], &now)
                .unwrap_err();
            assert!(matches!(err, ResolveError::InvalidField { .. }));
        }
    }
}
