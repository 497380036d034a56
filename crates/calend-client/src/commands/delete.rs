//! `delete`: remove every event with a given title.

use calend_providers::CalendarProvider;
use tracing::info;

use crate::error::ClientResult;

/// Deletes every event whose summary equals `name` and returns how many were
/// removed.
///
/// The whole calendar is listed before anything is deleted, so removals do
/// not shift the pages still to be read.
pub async fn run(
    provider: &dyn CalendarProvider,
    calendar_id: &str,
    name: &str,
) -> ClientResult<usize> {
    let matching: Vec<String> = super::all_events(provider, calendar_id)
        .await?
        .into_iter()
        .filter(|event| event.summary == name)
        .map(|event| event.id)
        .collect();

    for id in &matching {
        provider.delete_event(calendar_id, id).await?;
        info!("deleted event {}", id);
    }

    match matching.len() {
        0 => println!("No events named '{}' found.", name),
        1 => println!("Deleted 1 event named '{}'.", name),
        n => println!("Deleted {} events named '{}'.", n, name),
    }
    Ok(matching.len())
}
