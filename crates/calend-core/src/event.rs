//! Event creation payloads.
//!
//! [`EventRequest`] mirrors the body of the Calendar API `events.insert`
//! call. Times are sent as local wall-clock values together with an IANA
//! timezone name, so the service stores the event in that zone.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::recurrence::Recurrence;

/// Wall-clock format of `dateTime` values.
const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Start or end of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    /// Local wall-clock time, `YYYY-MM-DDTHH:MM:SS`.
    pub date_time: String,
    /// IANA timezone the wall-clock time is expressed in.
    pub time_zone: String,
}

impl EventDateTime {
    /// Builds the payload for an instant in its own timezone.
    pub fn from_instant(instant: &DateTime<Tz>) -> Self {
        Self {
            date_time: instant
                .naive_local()
                .format(LOCAL_DATETIME_FORMAT)
                .to_string(),
            time_zone: instant.timezone().name().to_string(),
        }
    }
}

/// An event attendee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    /// Attendee email address.
    pub email: String,
}

/// A reminder override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderOverride {
    /// Delivery method (`email` or `popup`).
    pub method: String,
    /// Minutes before the event start.
    pub minutes: u32,
}

/// Reminder settings for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    /// Whether the calendar's default reminders apply.
    pub use_default: bool,
    /// Event-specific reminders.
    #[serde(default)]
    pub overrides: Vec<ReminderOverride>,
}

impl Default for Reminders {
    fn default() -> Self {
        Self {
            use_default: false,
            overrides: Vec::new(),
        }
    }
}

/// Request body for creating a calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    /// Event title.
    pub summary: String,
    /// Free-form location.
    #[serde(default)]
    pub location: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Event start.
    pub start: EventDateTime,
    /// Event end.
    pub end: EventDateTime,
    /// Recurrence rule lines.
    #[serde(default)]
    pub recurrence: Vec<String>,
    /// Invited attendees.
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    /// Reminder settings.
    #[serde(default)]
    pub reminders: Reminders,
}

impl EventRequest {
    /// Creates a single-occurrence event with no attendees or reminders.
    pub fn new(summary: impl Into<String>, start: &DateTime<Tz>, end: &DateTime<Tz>) -> Self {
        Self {
            summary: summary.into(),
            location: String::new(),
            description: String::new(),
            start: EventDateTime::from_instant(start),
            end: EventDateTime::from_instant(end),
            recurrence: Vec::new(),
            attendees: Vec::new(),
            reminders: Reminders::default(),
        }
    }

    /// Sets the server-side recurrence rule.
    #[must_use]
    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = recurrence.rules();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::London;
    use serde_json::json;

    #[test]
    fn payload_shape() {
        let start = London.with_ymd_and_hms(2024, 6, 20, 9, 30, 0).unwrap();
        let end = London.with_ymd_and_hms(2024, 6, 20, 10, 45, 0).unwrap();
        let request = EventRequest::new("Team Sync", &start, &end);

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "summary": "Team Sync",
                "location": "",
                "description": "",
                "start": {"dateTime": "2024-06-20T09:30:00", "timeZone": "Europe/London"},
                "end": {"dateTime": "2024-06-20T10:45:00", "timeZone": "Europe/London"},
                "recurrence": [],
                "attendees": [],
                "reminders": {"useDefault": false, "overrides": []}
            })
        );
    }

    #[test]
    fn with_recurrence_sets_rules() {
        let start = London.with_ymd_and_hms(2024, 1, 8, 18, 0, 0).unwrap();
        let end = London.with_ymd_and_hms(2024, 1, 8, 19, 0, 0).unwrap();
        let request = EventRequest::new("Gym", &start, &end)
            .with_recurrence(Recurrence::Weekly(6));

        assert_eq!(request.recurrence, vec!["RRULE:FREQ=WEEKLY;COUNT=6"]);
    }

    #[test]
    fn datetime_uses_wall_clock_of_the_zone() {
        let instant = chrono_tz::America::New_York
            .with_ymd_and_hms(2024, 12, 1, 23, 5, 0)
            .unwrap();
        let dt = EventDateTime::from_instant(&instant);
        assert_eq!(dt.date_time, "2024-12-01T23:05:00");
        assert_eq!(dt.time_zone, "America/New_York");
    }
}
