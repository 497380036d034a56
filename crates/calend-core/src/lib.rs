//! Core logic: relative date resolution, recurrence, event payloads, batch files

pub mod batch;
pub mod event;
pub mod plan;
pub mod recurrence;
pub mod resolve;
pub mod tracing;

pub use batch::{BatchError, LineError};
pub use event::{Attendee, EventDateTime, EventRequest, ReminderOverride, Reminders};
pub use plan::{
    AddOptions, ConflictError, DaySelector, EventPlan, EventSpec, MAX_COUNT, RelativeDay,
    TimeOfDay, UnknownDay,
};
pub use recurrence::{FORTNIGHT_DAYS, Recurrence, Repeat};
pub use resolve::{Field, PartialDateTime, ResolveError, resolve, shift_days};
pub use crate::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
