//! Relative date resolution.
//!
//! Users rarely type a full timestamp: `calend add -s 9 --date 10` means
//! "09:00 on the 10th of whichever month and year makes sense". This module
//! turns such a [`PartialDateTime`] into a concrete, timezone-qualified
//! instant.
//!
//! Resolution is a pure function of the supplied fields, the `now` anchor
//! and an optional reference instant. Nothing here reads the system clock.
//!
//! # Rollover rules
//!
//! - **Year**: when the result lies before `now`, falls on a different
//!   day-of-month than `now`, and no year was supplied, the year is bumped.
//!   The comparison is on the day-of-month only, so "01:00 today" issued at
//!   23:00 stays in the past.
//! - **Day**: when a reference is supplied (the start of an event whose end
//!   is being resolved), a result before the reference is moved one day
//!   forward if that is enough to pass the reference. This covers events
//!   crossing midnight without disturbing ends that are many days off.
//!
//! # DST gaps
//!
//! A wall-clock time typed by the user that falls in a DST gap is an error.
//! Times computed from it (the next-day end, repeat offsets) are moved
//! forward by the length of the gap instead, the way the clocks move.

use std::fmt;

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Timelike,
};
use thiserror::Error;

/// A date/time field a user can supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Day of the month (1-31).
    Day,
    /// Month of the year (1-12).
    Month,
    /// Calendar year.
    Year,
    /// Hour of the day (0-23).
    Hour,
    /// Minute of the hour (0-59).
    Minute,
    /// Second of the minute (0-59).
    Second,
}

impl Field {
    /// Returns the lowercase field name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while resolving a partial date/time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// A field was outside its valid range.
    #[error("invalid {field}: {value}")]
    InvalidField { field: Field, value: i64 },

    /// The combination of year, month and day does not exist.
    #[error("date {year:04}-{month:02}-{day:02} does not exist")]
    NonexistentDate { year: i32, month: u32, day: u32 },

    /// The wall-clock time falls in a DST gap of the timezone.
    #[error("local time {0} does not exist in this timezone")]
    NonexistentLocalTime(NaiveDateTime),

    /// Day arithmetic left the representable range.
    #[error("date arithmetic out of range")]
    OutOfRange,
}

/// A partially-specified moment.
///
/// Absent fields default to the corresponding field of `now` at resolution
/// time. The minute is always required and the second defaults to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartialDateTime {
    /// Day of the month.
    pub day: Option<u32>,
    /// Month of the year.
    pub month: Option<u32>,
    /// Calendar year. Supplying it disables the year rollover.
    pub year: Option<i32>,
    /// Hour of the day.
    pub hour: Option<u32>,
    /// Minute of the hour.
    pub minute: u32,
    /// Second of the minute.
    pub second: u32,
}

impl PartialDateTime {
    /// Creates a partial date/time with only the minute set.
    pub fn at_minute(minute: u32) -> Self {
        Self {
            minute,
            ..Default::default()
        }
    }

    /// Creates a fully-specified partial date/time from a wall-clock value.
    pub fn from_naive(local: &NaiveDateTime) -> Self {
        Self {
            day: Some(local.day()),
            month: Some(local.month()),
            year: Some(local.year()),
            hour: Some(local.hour()),
            minute: local.minute(),
            second: local.second(),
        }
    }

    /// Sets the day of the month.
    #[must_use]
    pub fn with_day(mut self, day: u32) -> Self {
        self.day = Some(day);
        self
    }

    /// Sets the month.
    #[must_use]
    pub fn with_month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    /// Sets the year.
    #[must_use]
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Sets the hour.
    #[must_use]
    pub fn with_hour(mut self, hour: u32) -> Self {
        self.hour = Some(hour);
        self
    }

    /// Sets the second.
    #[must_use]
    pub fn with_second(mut self, second: u32) -> Self {
        self.second = second;
        self
    }

    /// Checks every supplied field against its range.
    pub fn validate(&self) -> Result<(), ResolveError> {
        check(Field::Day, self.day, 1, 31)?;
        check(Field::Month, self.month, 1, 12)?;
        check(Field::Hour, self.hour, 0, 23)?;
        check(Field::Minute, Some(self.minute), 0, 59)?;
        check(Field::Second, Some(self.second), 0, 59)?;
        Ok(())
    }
}

fn check(field: Field, value: Option<u32>, min: u32, max: u32) -> Result<(), ResolveError> {
    match value {
        Some(v) if v < min || v > max => Err(ResolveError::InvalidField {
            field,
            value: i64::from(v),
        }),
        _ => Ok(()),
    }
}

/// Resolves a partial date/time against `now`.
///
/// When `reference` is given the result is additionally moved one day
/// forward if it precedes the reference by less than a day.
///
/// # Errors
///
/// Returns [`ResolveError`] for out-of-range fields, dates that do not
/// exist (including a 29 February rolled into a common year) and wall-clock
/// times skipped by a DST transition.
pub fn resolve<Tz: TimeZone>(
    fields: &PartialDateTime,
    now: &DateTime<Tz>,
    reference: Option<&DateTime<Tz>>,
) -> Result<DateTime<Tz>, ResolveError> {
    fields.validate()?;

    let tz = now.timezone();
    let local_now = now.naive_local();

    let year = fields.year.unwrap_or(local_now.year());
    let month = fields.month.unwrap_or(local_now.month());
    let day = fields.day.unwrap_or(local_now.day());
    let hour = fields.hour.unwrap_or(local_now.hour());

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or(ResolveError::NonexistentDate { year, month, day })?;
    let time = NaiveTime::from_hms_opt(hour, fields.minute, fields.second).ok_or(
        ResolveError::InvalidField {
            field: Field::Hour,
            value: i64::from(hour),
        },
    )?;

    let local = date.and_time(time);
    let mut instant = localize(&tz, local)?;

    if instant < *now && local.day() != local_now.day() && fields.year.is_none() {
        let next_year = local
            .with_year(year + 1)
            .ok_or(ResolveError::NonexistentDate {
                year: year + 1,
                month,
                day,
            })?;
        instant = localize(&tz, next_year)?;
    }

    if let Some(reference) = reference
        && instant < *reference
    {
        let next_day = add_days(instant.naive_local(), 1)?;
        if next_day > reference.naive_local() {
            instant = localize_forward(&tz, next_day)?;
        }
    }

    Ok(instant)
}

/// Moves an instant by whole calendar days, keeping its wall-clock time.
///
/// A wall-clock time skipped on the target day is moved forward by the
/// length of the gap.
pub fn shift_days<Tz: TimeZone>(
    instant: &DateTime<Tz>,
    days: i64,
) -> Result<DateTime<Tz>, ResolveError> {
    let local = add_days(instant.naive_local(), days)?;
    localize_forward(&instant.timezone(), local)
}

fn add_days(local: NaiveDateTime, days: i64) -> Result<NaiveDateTime, ResolveError> {
    Duration::try_days(days)
        .and_then(|delta| local.checked_add_signed(delta))
        .ok_or(ResolveError::OutOfRange)
}

/// Maps a wall-clock value into the timezone, taking the earlier instant
/// when the value is ambiguous.
fn localize<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> Result<DateTime<Tz>, ResolveError> {
    tz.from_local_datetime(&local)
        .earliest()
        .ok_or(ResolveError::NonexistentLocalTime(local))
}

/// Like [`localize`], but a value inside a DST gap is read with the offset
/// in force a day earlier, which lands it past the gap.
fn localize_forward<Tz: TimeZone>(
    tz: &Tz,
    local: NaiveDateTime,
) -> Result<DateTime<Tz>, ResolveError> {
    if let Some(instant) = tz.from_local_datetime(&local).earliest() {
        return Ok(instant);
    }

    let before = add_days(local, -1)?;
    let offset = tz
        .offset_from_local_datetime(&before)
        .earliest()
        .ok_or(ResolveError::NonexistentLocalTime(local))?
        .fix();
    let utc = local
        .checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))
        .ok_or(ResolveError::OutOfRange)?;
    Ok(tz.from_utc_datetime(&utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use chrono_tz::Europe::London;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    mod defaults {
        use super::*;

        #[test]
        fn absent_fields_come_from_now() {
            let now = utc(2024, 3, 15, 10, 17, 42);
            let resolved = resolve(&PartialDateTime::at_minute(30), &now, None).unwrap();
            assert_eq!(resolved, utc(2024, 3, 15, 10, 30, 0));
        }

        #[test]
        fn minute_and_second_always_overwritten() {
            let now = utc(2024, 3, 15, 10, 17, 42);
            let fields = PartialDateTime::at_minute(17).with_hour(11);
            let resolved = resolve(&fields, &now, None).unwrap();
            assert_eq!(resolved.second(), 0);
            assert_eq!(resolved.minute(), 17);
        }

        #[test]
        fn explicit_second() {
            let now = utc(2024, 3, 15, 10, 0, 0);
            let fields = PartialDateTime::at_minute(5).with_hour(12).with_second(9);
            let resolved = resolve(&fields, &now, None).unwrap();
            assert_eq!(resolved, utc(2024, 3, 15, 12, 5, 9));
        }

        #[test]
        fn fully_specified_is_idempotent() {
            let target = utc(2019, 7, 4, 18, 45, 12);
            let fields = PartialDateTime::from_naive(&target.naive_local());
            for now in [
                utc(2024, 3, 15, 10, 0, 0),
                utc(2019, 7, 4, 23, 59, 59),
                utc(2030, 1, 1, 0, 0, 0),
            ] {
                assert_eq!(resolve(&fields, &now, None).unwrap(), target);
            }
        }

        #[test]
        fn combined_date_fields_are_validated_together() {
            // Applying day=30 to a February `now` first would fail; the
            // combination with month=4 is valid.
            let now = utc(2024, 2, 10, 8, 0, 0);
            let fields = PartialDateTime::at_minute(0)
                .with_day(30)
                .with_month(4)
                .with_hour(9);
            let resolved = resolve(&fields, &now, None).unwrap();
            assert_eq!(resolved, utc(2024, 4, 30, 9, 0, 0));
        }
    }

    mod year_rollover {
        use super::*;

        #[test]
        fn past_date_on_other_day_rolls_forward() {
            let now = utc(2024, 3, 15, 10, 0, 0);
            let fields = PartialDateTime::at_minute(0).with_day(10).with_hour(9);
            let resolved = resolve(&fields, &now, None).unwrap();
            assert_eq!(resolved, utc(2025, 3, 10, 9, 0, 0));
        }

        #[test]
        fn past_time_on_same_day_stays_in_past() {
            let now = utc(2024, 3, 15, 23, 30, 0);
            let fields = PartialDateTime::at_minute(0).with_day(15).with_hour(1);
            let resolved = resolve(&fields, &now, None).unwrap();
            assert_eq!(resolved, utc(2024, 3, 15, 1, 0, 0));
        }

        #[test]
        fn next_day_is_not_rolled() {
            let now = utc(2024, 3, 15, 23, 0, 0);
            let fields = PartialDateTime::at_minute(0).with_day(16).with_hour(1);
            let resolved = resolve(&fields, &now, None).unwrap();
            assert_eq!(resolved, utc(2024, 3, 16, 1, 0, 0));
        }

        #[test]
        fn explicit_year_disables_rollover() {
            let now = utc(2024, 3, 15, 10, 0, 0);
            let fields = PartialDateTime::at_minute(0)
                .with_day(10)
                .with_year(2024)
                .with_hour(9);
            let resolved = resolve(&fields, &now, None).unwrap();
            assert_eq!(resolved, utc(2024, 3, 10, 9, 0, 0));
        }

        #[test]
        fn earlier_month_rolls_forward() {
            let now = utc(2024, 11, 20, 12, 0, 0);
            let fields = PartialDateTime::at_minute(30)
                .with_day(5)
                .with_month(1)
                .with_hour(8);
            let resolved = resolve(&fields, &now, None).unwrap();
            assert_eq!(resolved, utc(2025, 1, 5, 8, 30, 0));
        }

        #[test]
        fn leap_day_rolled_into_common_year_fails() {
            let now = utc(2024, 3, 15, 10, 0, 0);
            let fields = PartialDateTime::at_minute(0)
                .with_day(29)
                .with_month(2)
                .with_hour(9);
            let err = resolve(&fields, &now, None).unwrap_err();
            assert_eq!(
                err,
                ResolveError::NonexistentDate {
                    year: 2025,
                    month: 2,
                    day: 29
                }
            );
        }

        #[test]
        fn year_follows_day_of_month_rule_across_the_calendar() {
            let now = utc(2024, 6, 15, 12, 0, 0);
            for month in 1..=12 {
                for day in 1..=28 {
                    for hour in [0, 11, 12, 13, 23] {
                        let fields = PartialDateTime::at_minute(0)
                            .with_day(day)
                            .with_month(month)
                            .with_hour(hour);
                        let resolved = resolve(&fields, &now, None).unwrap();
                        let candidate = utc(2024, month, day, hour, 0, 0);
                        let expected_year = if candidate >= now || day == 15 {
                            2024
                        } else {
                            2025
                        };
                        assert_eq!(
                            resolved.year(),
                            expected_year,
                            "month={month} day={day} hour={hour}"
                        );
                    }
                }
            }
        }
    }

    mod day_rollover {
        use super::*;

        #[test]
        fn end_before_start_moves_to_next_day() {
            let now = utc(2024, 3, 15, 9, 0, 0);
            let start = utc(2024, 3, 15, 22, 0, 0);
            let fields = PartialDateTime::at_minute(0).with_day(15).with_hour(2);
            let end = resolve(&fields, &now, Some(&start)).unwrap();
            assert_eq!(end, utc(2024, 3, 16, 2, 0, 0));
        }

        #[test]
        fn end_after_start_is_untouched() {
            let now = utc(2024, 3, 15, 9, 0, 0);
            let start = utc(2024, 3, 15, 10, 0, 0);
            let fields = PartialDateTime::at_minute(30).with_day(15).with_hour(11);
            let end = resolve(&fields, &now, Some(&start)).unwrap();
            assert_eq!(end, utc(2024, 3, 15, 11, 30, 0));
        }

        #[test]
        fn end_more_than_a_day_before_is_untouched() {
            let now = utc(2024, 3, 1, 9, 0, 0);
            let start = utc(2024, 3, 20, 10, 0, 0);
            let fields = PartialDateTime::at_minute(0).with_day(15).with_hour(11);
            let end = resolve(&fields, &now, Some(&start)).unwrap();
            assert_eq!(end, utc(2024, 3, 15, 11, 0, 0));
        }

        #[test]
        fn end_exactly_one_day_before_is_untouched() {
            let now = utc(2024, 3, 1, 9, 0, 0);
            let start = utc(2024, 3, 16, 10, 0, 0);
            let fields = PartialDateTime::at_minute(0).with_day(15).with_hour(10);
            let end = resolve(&fields, &now, Some(&start)).unwrap();
            assert_eq!(end, utc(2024, 3, 15, 10, 0, 0));
        }

        #[test]
        fn end_equal_to_start_is_untouched() {
            let now = utc(2024, 3, 1, 9, 0, 0);
            let start = utc(2024, 3, 15, 10, 0, 0);
            let fields = PartialDateTime::at_minute(0).with_day(15).with_hour(10);
            let end = resolve(&fields, &now, Some(&start)).unwrap();
            assert_eq!(end, start);
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn out_of_range_fields() {
            let now = utc(2024, 3, 15, 10, 0, 0);
            let cases = [
                (PartialDateTime::at_minute(0).with_month(13), Field::Month, 13),
                (PartialDateTime::at_minute(0).with_day(0), Field::Day, 0),
                (PartialDateTime::at_minute(0).with_day(32), Field::Day, 32),
                (PartialDateTime::at_minute(0).with_hour(24), Field::Hour, 24),
                (PartialDateTime::at_minute(60), Field::Minute, 60),
                (PartialDateTime::at_minute(0).with_second(61), Field::Second, 61),
            ];
            for (fields, field, value) in cases {
                assert_eq!(
                    resolve(&fields, &now, None).unwrap_err(),
                    ResolveError::InvalidField { field, value }
                );
            }
        }

        #[test]
        fn nonexistent_date() {
            let now = utc(2024, 1, 10, 10, 0, 0);
            let fields = PartialDateTime::at_minute(0).with_day(30).with_month(2);
            assert_eq!(
                resolve(&fields, &now, None).unwrap_err(),
                ResolveError::NonexistentDate {
                    year: 2024,
                    month: 2,
                    day: 30
                }
            );
        }

        #[test]
        fn error_messages() {
            let err = ResolveError::InvalidField {
                field: Field::Month,
                value: 13,
            };
            assert_eq!(err.to_string(), "invalid month: 13");

            let err = ResolveError::NonexistentDate {
                year: 2025,
                month: 2,
                day: 29,
            };
            assert_eq!(err.to_string(), "date 2025-02-29 does not exist");
        }
    }

    mod timezones {
        use super::*;

        #[test]
        fn resolves_in_the_timezone_of_now() {
            let now = London.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
            let fields = PartialDateTime::at_minute(30).with_day(20).with_hour(9);
            let resolved = resolve(&fields, &now, None).unwrap();
            assert_eq!(resolved.naive_local().to_string(), "2024-06-20 09:30:00");
            // BST
            assert_eq!(resolved.with_timezone(&Utc), utc(2024, 6, 20, 8, 30, 0));
        }

        #[test]
        fn dst_gap_is_an_error() {
            let now = London.with_ymd_and_hms(2024, 3, 20, 8, 0, 0).unwrap();
            let fields = PartialDateTime::at_minute(30)
                .with_day(31)
                .with_month(3)
                .with_hour(1);
            assert!(matches!(
                resolve(&fields, &now, None),
                Err(ResolveError::NonexistentLocalTime(_))
            ));
        }

        #[test]
        fn dst_overlap_takes_earlier_instant() {
            let now = London.with_ymd_and_hms(2024, 10, 20, 8, 0, 0).unwrap();
            let fields = PartialDateTime::at_minute(30)
                .with_day(27)
                .with_month(10)
                .with_hour(1);
            let resolved = resolve(&fields, &now, None).unwrap();
            assert_eq!(resolved.with_timezone(&Utc), utc(2024, 10, 27, 0, 30, 0));
        }

        #[test]
        fn shift_days_keeps_wall_clock_across_dst() {
            let start = London.with_ymd_and_hms(2024, 3, 30, 9, 0, 0).unwrap();
            let shifted = shift_days(&start, 1).unwrap();
            assert_eq!(shifted.naive_local().to_string(), "2024-03-31 09:00:00");
            assert_eq!(shifted - start, Duration::hours(23));
        }

        #[test]
        fn shift_into_gap_moves_past_it() {
            let start = London.with_ymd_and_hms(2024, 3, 30, 1, 30, 0).unwrap();
            let shifted = shift_days(&start, 1).unwrap();
            assert_eq!(shifted.naive_local().to_string(), "2024-03-31 02:30:00");
            assert_eq!(shifted.with_timezone(&Utc), utc(2024, 3, 31, 1, 30, 0));
        }

        #[test]
        fn end_rolled_into_gap_moves_past_it() {
            let now = London.with_ymd_and_hms(2024, 3, 30, 8, 0, 0).unwrap();
            let start = London.with_ymd_and_hms(2024, 3, 30, 22, 0, 0).unwrap();
            let fields = PartialDateTime::at_minute(30).with_day(30).with_hour(1);
            let end = resolve(&fields, &now, Some(&start)).unwrap();
            assert_eq!(end.naive_local().to_string(), "2024-03-31 02:30:00");
        }

        #[test]
        fn unused_next_day_in_gap_is_not_an_error() {
            // Moving 01:30 on the 30th forward would land in the gap, but a
            // start on the 1st of April is more than a day away.
            let now = London.with_ymd_and_hms(2024, 3, 20, 8, 0, 0).unwrap();
            let start = London.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap();
            let fields = PartialDateTime::at_minute(30)
                .with_day(30)
                .with_month(3)
                .with_hour(1);
            let end = resolve(&fields, &now, Some(&start)).unwrap();
            assert_eq!(end.naive_local().to_string(), "2024-03-30 01:30:00");
        }
    }
}
