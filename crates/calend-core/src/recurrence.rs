//! Recurring and repeated events.
//!
//! Two different mechanisms produce more than one occurrence of an event:
//!
//! - [`Recurrence`] is a rule handed to the calendar service, which expands
//!   it server-side (`RRULE:FREQ=WEEKLY;COUNT=4`). One event is created.
//! - [`Repeat`] is client-side: the same event is created several times,
//!   shifted by a fixed number of days each time.

/// Number of days between fortnightly repeats.
pub const FORTNIGHT_DAYS: u32 = 14;

/// A server-side recurrence rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Recurrence {
    /// A single occurrence.
    #[default]
    None,
    /// Repeats every week, `count` occurrences in total.
    Weekly(u32),
    /// Repeats every day, `count` occurrences in total.
    Daily(u32),
}

impl Recurrence {
    /// Returns the RFC 5545 rule lines understood by the calendar service.
    pub fn rules(&self) -> Vec<String> {
        match self {
            Self::None => Vec::new(),
            Self::Weekly(count) => vec![format!("RRULE:FREQ=WEEKLY;COUNT={count}")],
            Self::Daily(count) => vec![format!("RRULE:FREQ=DAILY;COUNT={count}")],
        }
    }
}

/// Client-side repetition of an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Repeat {
    /// Create the event once.
    #[default]
    Once,
    /// Create the event `count` times, fourteen days apart.
    Fortnightly(u32),
    /// Create the event `count` times, `interval_days` apart.
    Every { interval_days: u32, count: u32 },
}

impl Repeat {
    /// Number of events to create.
    pub fn count(&self) -> u32 {
        match self {
            Self::Once => 1,
            Self::Fortnightly(count) | Self::Every { count, .. } => *count,
        }
    }

    /// Days between consecutive events.
    pub fn interval_days(&self) -> u32 {
        match self {
            Self::Once => 0,
            Self::Fortnightly(_) => FORTNIGHT_DAYS,
            Self::Every { interval_days, .. } => *interval_days,
        }
    }

    /// Day offsets of every event, starting at zero.
    pub fn offsets(&self) -> impl Iterator<Item = i64> + use<> {
        let interval = i64::from(self.interval_days());
        (0..i64::from(self.count())).map(move |i| i * interval)
    }
}
