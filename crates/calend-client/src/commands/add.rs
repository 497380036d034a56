//! `add`: create calendar events.

use calend_core::{EventRequest, EventSpec, TimeOfDay, batch};
use calend_providers::{CalendarProvider, CreatedEvent};
use chrono::DateTime;
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::cli::AddArgs;
use crate::error::ClientResult;

/// Validates the flags and builds every request the invocation will send.
///
/// Flag conflicts are reported before the batch file is read or any date is
/// resolved.
pub fn plan(args: &AddArgs, now: &DateTime<Tz>) -> ClientResult<Vec<EventRequest>> {
    let plan = args.options().validate()?;
    debug!(?plan, "validated add options");

    let specs = match args.filename {
        Some(ref path) => {
            let specs = batch::load(path)?;
            info!("read {} events from {}", specs.len(), path.display());
            specs
        }
        None => vec![EventSpec::new(
            &args.name,
            TimeOfDay::new(args.start_hour, args.start_minute),
            TimeOfDay::new(args.end_hour, args.end_minute),
        )],
    };

    Ok(plan.build(&specs, now)?)
}

/// Prints the requests as a JSON array instead of sending them.
pub fn print_requests(requests: &[EventRequest]) -> ClientResult<()> {
    println!("{}", serde_json::to_string_pretty(requests)?);
    Ok(())
}

/// Sends the requests in order, stopping at the first failure.
pub async fn insert(
    provider: &dyn CalendarProvider,
    calendar_id: &str,
    requests: &[EventRequest],
) -> ClientResult<Vec<CreatedEvent>> {
    let mut created = Vec::with_capacity(requests.len());
    for request in requests {
        let event = provider.insert_event(calendar_id, request).await?;
        match event.html_link {
            Some(ref link) => println!("Event created: {}", link),
            None => println!("Event created: {} ({})", request.summary, event.id),
        }
        created.push(event);
    }
    info!("created {} events in {}", created.len(), calendar_id);
    Ok(created)
}
