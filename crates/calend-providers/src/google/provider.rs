//! [`CalendarProvider`] implementation for Google Calendar.

use calend_core::EventRequest;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarProvider, CreatedEvent, EventPage};

use super::client::GoogleCalendarClient;
use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::tokens::TokenStorage;

const PROVIDER_NAME: &str = "google";

/// An authenticated Google Calendar session.
///
/// Loads stored tokens on creation and refreshes the access token when it
/// expires.
pub struct GoogleProvider {
    config: GoogleConfig,
    token_storage: TokenStorage,
    oauth_client: OAuthClient,
    api_client: RwLock<Option<GoogleCalendarClient>>,
}

impl GoogleProvider {
    /// Creates a provider and loads any stored tokens.
    ///
    /// This does not start authentication; call [`authenticate`](Self::authenticate)
    /// for that.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;

        let token_storage = TokenStorage::new(&config.token_path);
        token_storage.load()?;

        let oauth_client = OAuthClient::new(config.credentials.clone(), config.timeout)?;

        Ok(Self {
            config,
            token_storage,
            oauth_client,
            api_client: RwLock::new(None),
        })
    }

    /// Runs the browser consent flow and stores the resulting tokens.
    pub async fn authenticate(&self) -> ProviderResult<()> {
        info!("starting Google authentication flow");

        let tokens = self
            .oauth_client
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await?;
        let client = self.new_client(&tokens.access_token)?;
        self.token_storage.set(tokens)?;
        *self.api_client.write().await = Some(client);

        info!("authentication successful");
        Ok(())
    }

    /// Returns true if the stored tokens lack a configured scope.
    pub fn needs_reauth(&self) -> bool {
        self.token_storage.needs_reauth(&self.config.scopes)
    }

    fn new_client(&self, access_token: &str) -> ProviderResult<GoogleCalendarClient> {
        GoogleCalendarClient::new(access_token, self.config.timeout, &self.config.user_agent)
    }

    /// Makes sure the API client holds a valid access token, refreshing it if
    /// it has expired.
    async fn ensure_client(&self) -> ProviderResult<()> {
        let tokens = self.token_storage.get().ok_or_else(|| {
            ProviderError::authentication("not authenticated, run 'calend init'")
                .with_provider(PROVIDER_NAME)
        })?;

        if tokens.is_expired() {
            let refresh_token = tokens.refresh_token.as_deref().ok_or_else(|| {
                ProviderError::authentication("no refresh token, run 'calend init' again")
                    .with_provider(PROVIDER_NAME)
            })?;

            debug!("refreshing expired access token");
            let (access_token, expires_in) = self.oauth_client.refresh_token(refresh_token).await?;
            self.token_storage
                .update_access_token(&access_token, expires_in)?;

            let mut client = self.api_client.write().await;
            match client.as_mut() {
                Some(c) => c.set_access_token(access_token),
                None => *client = Some(self.new_client(&access_token)?),
            }
            return Ok(());
        }

        let mut client = self.api_client.write().await;
        if client.is_none() {
            *client = Some(self.new_client(&tokens.access_token)?);
        }
        Ok(())
    }

    async fn client(&self) -> ProviderResult<RwLockReadGuard<'_, GoogleCalendarClient>> {
        self.ensure_client().await?;
        RwLockReadGuard::try_map(self.api_client.read().await, Option::as_ref)
            .map_err(|_| ProviderError::internal("API client not available"))
    }
}

impl CalendarProvider for GoogleProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn is_authenticated(&self) -> bool {
        self.token_storage
            .get()
            .is_some_and(|tokens| !tokens.is_expired() || tokens.refresh_token.is_some())
    }

    fn insert_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event: &'a EventRequest,
    ) -> BoxFuture<'a, ProviderResult<CreatedEvent>> {
        Box::pin(async move {
            let client = self.client().await?;
            client
                .insert_event(calendar_id, event)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }

    fn list_events<'a>(
        &'a self,
        calendar_id: &'a str,
        page_token: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<EventPage>> {
        Box::pin(async move {
            let client = self.client().await?;
            client
                .list_events_page(calendar_id, page_token)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }

    fn delete_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let client = self.client().await?;
            client
                .delete_event(calendar_id, event_id)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }
}
