//! CalendarProvider trait definition.
//!
//! A provider is an authenticated session against one calendar service. The
//! CLI builds it once at startup and hands `&dyn CalendarProvider` to each
//! command.

use std::future::Future;
use std::pin::Pin;

use calend_core::EventRequest;
use serde::Deserialize;

use crate::error::ProviderResult;

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An event accepted by the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEvent {
    /// Service-assigned identifier.
    pub id: String,
    /// Link to the event in the web UI, if provided.
    #[serde(default)]
    pub html_link: Option<String>,
}

/// An event as returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEvent {
    /// Service-assigned identifier.
    pub id: String,
    /// Event title; empty when the event has none.
    pub summary: String,
    /// Start as reported by the service (RFC 3339 timestamp or all-day date).
    pub start: Option<String>,
}

impl ListedEvent {
    /// Creates a listed event.
    pub fn new(id: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            summary: summary.into(),
            start: None,
        }
    }

    /// Sets the start.
    #[must_use]
    pub fn with_start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPage {
    /// Events on this page.
    pub items: Vec<ListedEvent>,
    /// Token for the next page, `None` on the last page.
    pub next_page_token: Option<String>,
}

/// The operations the CLI needs from a calendar service.
pub trait CalendarProvider: Send + Sync {
    /// Returns the provider name (e.g. "google").
    fn name(&self) -> &str;

    /// Returns true if stored credentials can be used without user
    /// interaction.
    fn is_authenticated(&self) -> bool;

    /// Creates an event.
    fn insert_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event: &'a EventRequest,
    ) -> BoxFuture<'a, ProviderResult<CreatedEvent>>;

    /// Fetches one page of events. Pass the previous page's
    /// `next_page_token` to continue.
    fn list_events<'a>(
        &'a self,
        calendar_id: &'a str,
        page_token: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<EventPage>>;

    /// Deletes an event.
    fn delete_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>>;
}
