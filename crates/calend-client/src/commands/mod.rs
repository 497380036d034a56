//! Command implementations.

pub mod add;
pub mod config;
pub mod delete;
#[cfg(feature = "google")]
pub mod init;
pub mod list;
pub mod uninstall;

use calend_providers::{CalendarProvider, ListedEvent};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Fetches every event of a calendar, following page tokens to the end.
pub async fn all_events(
    provider: &dyn CalendarProvider,
    calendar_id: &str,
) -> ClientResult<Vec<ListedEvent>> {
    let mut events = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let page = provider
            .list_events(calendar_id, page_token.as_deref())
            .await?;
        debug!("fetched page of {} events", page.items.len());
        events.extend(page.items);

        match page.next_page_token {
            Some(token) if page_token.as_deref() != Some(token.as_str()) => {
                page_token = Some(token)
            }
            _ => break,
        }
    }

    Ok(events)
}

/// Opens the stored Google session.
///
/// Fails with [`ClientError::NotInitialised`] when `init` has not stored
/// credentials and tokens yet.
#[cfg(feature = "google")]
pub fn connect(config: &ClientConfig) -> ClientResult<calend_providers::google::GoogleProvider> {
    use calend_providers::google::GoogleProvider;

    let settings = config.google.as_ref().ok_or(ClientError::NotInitialised)?;
    let provider = GoogleProvider::new(settings.to_provider_config()?)?;
    if !provider.is_authenticated() {
        return Err(ClientError::NotInitialised);
    }
    debug!("using stored {} session", provider.name());
    Ok(provider)
}

/// Without a compiled-in provider there is never a session to open.
#[cfg(not(feature = "google"))]
pub fn connect(_config: &ClientConfig) -> ClientResult<Box<dyn CalendarProvider>> {
    Err(ClientError::NotInitialised)
}

#[cfg(test)]
pub(crate) mod test_support {
    use calend_core::EventRequest;
    use calend_providers::{CalendarProvider, MemoryProvider};
    use chrono::{DateTime, TimeZone};
    use chrono_tz::Europe::London;
    use chrono_tz::Tz;

    pub fn london(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        London.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    /// Inserts one event per summary on 2024-06-20, 09:00 to 10:00.
    pub async fn seed(provider: &MemoryProvider, calendar_id: &str, summaries: &[&str]) {
        let start = london(2024, 6, 20, 9, 0);
        let end = london(2024, 6, 20, 10, 0);
        for summary in summaries {
            provider
                .insert_event(calendar_id, &EventRequest::new(*summary, &start, &end))
                .await
                .unwrap();
        }
    }
}
