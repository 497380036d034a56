//! Google Calendar API v3 client.

use std::time::Duration;

use calend_core::EventRequest;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};
use crate::provider::{CreatedEvent, EventPage, ListedEvent};

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Events requested per listing page.
const PAGE_SIZE: u32 = 250;

/// Thin HTTP client for the events endpoints.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
}

impl GoogleCalendarClient {
    /// Creates a client using the given access token.
    pub fn new(
        access_token: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                ProviderError::internal("failed to create HTTP client").with_source(e)
            })?;

        Ok(Self {
            http_client,
            access_token: access_token.into(),
        })
    }

    /// Replaces the access token after a refresh.
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
    }

    fn events_url(calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        )
    }

    /// Creates an event (`events.insert`).
    pub async fn insert_event(
        &self,
        calendar_id: &str,
        event: &EventRequest,
    ) -> ProviderResult<CreatedEvent> {
        let response = self
            .http_client
            .post(Self::events_url(calendar_id))
            .bearer_auth(&self.access_token)
            .json(event)
            .send()
            .await
            .map_err(map_send_error)?;

        let body = check_status(response).await?.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read response: {}", e))
        })?;

        let created: CreatedEvent = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse created event: {}", e))
        })?;
        debug!("created event {} in {}", created.id, calendar_id);
        Ok(created)
    }

    /// Fetches one page of events (`events.list`).
    pub async fn list_events_page(
        &self,
        calendar_id: &str,
        page_token: Option<&str>,
    ) -> ProviderResult<EventPage> {
        let mut request = self
            .http_client
            .get(Self::events_url(calendar_id))
            .bearer_auth(&self.access_token)
            .query(&[("maxResults", PAGE_SIZE.to_string())]);

        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await.map_err(map_send_error)?;
        let body = check_status(response).await?.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read response: {}", e))
        })?;

        let list: EventListResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
        })?;

        let page = list.into_page();
        debug!(
            "listed {} events from {} (more: {})",
            page.items.len(),
            calendar_id,
            page.next_page_token.is_some()
        );
        Ok(page)
    }

    /// Deletes an event (`events.delete`).
    pub async fn delete_event(&self, calendar_id: &str, event_id: &str) -> ProviderResult<()> {
        let url = format!(
            "{}/{}",
            Self::events_url(calendar_id),
            urlencoding::encode(event_id)
        );

        let response = self
            .http_client
            .delete(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(map_send_error)?;

        check_status(response).await?;
        debug!("deleted event {} from {}", event_id, calendar_id);
        Ok(())
    }
}

fn map_send_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::network("request timeout")
    } else if e.is_connect() {
        ProviderError::network(format!("connection failed: {}", e))
    } else {
        ProviderError::network(format!("request failed: {}", e))
    }
}

/// Maps non-success statuses to provider errors.
async fn check_status(response: reqwest::Response) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();
    let message = api_error_message(&body).unwrap_or(body);

    Err(status_error(status, retry_after, message))
}

fn status_error(
    status: reqwest::StatusCode,
    retry_after: Option<u64>,
    message: String,
) -> ProviderError {
    use reqwest::StatusCode;

    let err = match status {
        // Quota errors come back as 403 with a rate limit reason.
        StatusCode::FORBIDDEN if message.contains("Rate Limit") => {
            ProviderError::rate_limited(message)
        }
        StatusCode::UNAUTHORIZED => ProviderError::authentication(format!(
            "access token expired or invalid: {}",
            message
        )),
        s if s.is_server_error() => {
            ProviderError::server(format!("API error ({}): {}", s, message))
        }
        s => ProviderError::from_status(s.as_u16(), message),
    };

    if err.code() == ProviderErrorCode::RateLimited {
        warn!("rate limited by Google Calendar API");
    }
    match retry_after {
        Some(secs) => err.with_retry_after(Duration::from_secs(secs)),
        None => err,
    }
}

/// Extracts `error.message` from a Google API error body.
fn api_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.error.message)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

impl EventListResponse {
    fn into_page(self) -> EventPage {
        let items = self
            .items
            .into_iter()
            .filter(|e| e.status.as_deref() != Some("cancelled"))
            .map(|e| {
                let start = e.start.and_then(|s| s.date_time.or(s.date));
                ListedEvent {
                    id: e.id,
                    summary: e.summary.unwrap_or_default(),
                    start,
                }
            })
            .collect();

        EventPage {
            items,
            next_page_token: self.next_page_token,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: String,
    summary: Option<String>,
    status: Option<String>,
    start: Option<ApiEventTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}
