//! `list`: show the events of the configured calendar.

use calend_providers::{CalendarProvider, ListedEvent};

use crate::error::ClientResult;

/// Lists events, optionally only those titled `name`, and prints one line per
/// event.
pub async fn run(
    provider: &dyn CalendarProvider,
    calendar_id: &str,
    name: Option<&str>,
) -> ClientResult<Vec<ListedEvent>> {
    let events: Vec<ListedEvent> = super::all_events(provider, calendar_id)
        .await?
        .into_iter()
        .filter(|event| name.is_none_or(|n| event.summary == n))
        .collect();

    if events.is_empty() {
        println!("No events found.");
    }
    for event in &events {
        println!("{}", format_event(event));
    }
    Ok(events)
}

fn format_event(event: &ListedEvent) -> String {
    let summary = if event.summary.is_empty() {
        "(no title)"
    } else {
        event.summary.as_str()
    };
    format!(
        "{}\t{}\t{}",
        event.id,
        event.start.as_deref().unwrap_or("-"),
        summary
    )
}
