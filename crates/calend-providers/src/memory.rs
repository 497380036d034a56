//! In-memory provider.
//!
//! Keeps events in a `Vec` and pages listings like a remote service would.
//! Used to exercise command handlers without network access.

use std::sync::{Mutex, MutexGuard, PoisonError};

use calend_core::EventRequest;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarProvider, CreatedEvent, EventPage, ListedEvent};

const DEFAULT_PAGE_SIZE: usize = 250;

#[derive(Debug, Clone)]
struct StoredEvent {
    id: String,
    calendar_id: String,
    request: EventRequest,
}

/// A provider backed by process memory.
#[derive(Debug)]
pub struct MemoryProvider {
    authenticated: bool,
    page_size: usize,
    next_id: Mutex<u64>,
    events: Mutex<Vec<StoredEvent>>,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    /// Creates an empty, authenticated provider.
    pub fn new() -> Self {
        Self {
            authenticated: true,
            page_size: DEFAULT_PAGE_SIZE,
            next_id: Mutex::new(1),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Sets the number of events per listing page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Marks the provider as lacking credentials.
    #[must_use]
    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// Returns every stored request of a calendar, in insertion order.
    pub fn requests(&self, calendar_id: &str) -> Vec<EventRequest> {
        self.events()
            .iter()
            .filter(|e| e.calendar_id == calendar_id)
            .map(|e| e.request.clone())
            .collect()
    }

    fn events(&self) -> MutexGuard<'_, Vec<StoredEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate_id(&self) -> String {
        let mut next = self.next_id.lock().unwrap_or_else(PoisonError::into_inner);
        let id = format!("mem{}", *next);
        *next += 1;
        id
    }

    fn check_auth(&self) -> ProviderResult<()> {
        if self.authenticated {
            Ok(())
        } else {
            Err(ProviderError::authentication("no credentials").with_provider("memory"))
        }
    }
}

impl CalendarProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    fn insert_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event: &'a EventRequest,
    ) -> BoxFuture<'a, ProviderResult<CreatedEvent>> {
        Box::pin(async move {
            self.check_auth()?;
            let id = self.allocate_id();
            self.events().push(StoredEvent {
                id: id.clone(),
                calendar_id: calendar_id.to_string(),
                request: event.clone(),
            });
            Ok(CreatedEvent {
                id,
                html_link: None,
            })
        })
    }

    fn list_events<'a>(
        &'a self,
        calendar_id: &'a str,
        page_token: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<EventPage>> {
        Box::pin(async move {
            self.check_auth()?;
            let offset = match page_token {
                Some(token) => token
                    .parse::<usize>()
                    .map_err(|_| {
                        ProviderError::bad_request(format!("invalid page token '{token}'"))
                    })?,
                None => 0,
            };

            let events = self.events();
            let matching: Vec<&StoredEvent> = events
                .iter()
                .filter(|e| e.calendar_id == calendar_id)
                .collect();

            let items = matching
                .iter()
                .skip(offset)
                .take(self.page_size)
                .map(|e| {
                    ListedEvent::new(&e.id, &e.request.summary)
                        .with_start(&e.request.start.date_time)
                })
                .collect();
            let end = offset + self.page_size;
            let next_page_token = (end < matching.len()).then(|| end.to_string());

            Ok(EventPage {
                items,
                next_page_token,
            })
        })
    }

    fn delete_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            self.check_auth()?;
            let mut events = self.events();
            let position = events
                .iter()
                .position(|e| e.calendar_id == calendar_id && e.id == event_id)
                .ok_or_else(|| ProviderError::not_found(format!("event {event_id} not found")))?;
            events.remove(position);
            Ok(())
        })
    }
}
