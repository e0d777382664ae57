//! Google Calendar provider implementation.

use calbook_core::{Event, NewEvent};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarProvider, EventQuery};

use super::client::{GoogleCalendarClient, reauth_hint};
use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::tokens::TokenStore;

/// Google Calendar provider.
///
/// Holds the OAuth token for one account and refreshes it before each
/// request when it is about to expire.
pub struct GoogleProvider {
    config: GoogleConfig,
    tokens: Mutex<TokenStore>,
    oauth_client: OAuthClient,
    api_client: GoogleCalendarClient,
}

impl GoogleProvider {
    /// Creates the provider and loads the persisted token, if any.
    ///
    /// Does not contact Google. An unreadable token file is logged and
    /// treated as absent so `auth google --force` can replace it.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;

        let mut store = TokenStore::new(&config.token_path);
        if let Err(e) = store.load() {
            warn!("ignoring token file: {}", e);
        }

        let oauth_client = OAuthClient::new(config.credentials.clone(), config.timeout);
        let api_client = GoogleCalendarClient::new(
            &config.api_base,
            config.timeout,
            &config.user_agent,
            &config.token_path,
        );

        Ok(Self {
            config,
            tokens: Mutex::new(store),
            oauth_client,
            api_client,
        })
    }

    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    /// Runs the browser authorization flow and persists the new token.
    ///
    /// With `force`, the existing token file is removed first.
    pub async fn authenticate(&self, force: bool) -> ProviderResult<()> {
        let mut store = self.tokens.lock().await;
        if force {
            store.clear()?;
        }

        info!("starting Google authorization flow");
        let tokens = self
            .oauth_client
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await?;
        store.set(tokens)?;

        info!(path = %store.path().display(), "saved Google token");
        Ok(())
    }

    /// Makes sure a usable token is available.
    ///
    /// Without a stored token the interactive flow runs. A stored token
    /// that lacks the configured scopes is an error naming the token file
    /// to delete. An expiring token is refreshed.
    pub async fn ensure_authenticated(&self) -> ProviderResult<()> {
        let has_tokens = self.tokens.lock().await.tokens().is_some();
        if !has_tokens {
            self.authenticate(false).await?;
        }
        self.access_token().await.map(|_| ())
    }

    /// Returns true if the stored token is missing or lacks a configured scope.
    pub async fn needs_reauth(&self) -> bool {
        self.tokens.lock().await.needs_reauth(&self.config.scopes)
    }

    /// Returns a valid access token, refreshing it first if needed.
    async fn access_token(&self) -> ProviderResult<String> {
        let mut store = self.tokens.lock().await;

        let tokens = store.tokens().ok_or_else(|| {
            ProviderError::authentication("not authenticated, run `calbook auth google`")
                .with_provider("google")
        })?;

        if !tokens.has_scopes(&self.config.scopes) {
            return Err(ProviderError::authorization(format!(
                "stored token does not grant {}; {}",
                self.config.scopes.join(" "),
                reauth_hint(store.path())
            ))
            .with_provider("google"));
        }

        if !tokens.needs_refresh() {
            return Ok(tokens.access_token.clone());
        }

        let refresh_token = tokens.refresh_token.clone().ok_or_else(|| {
            ProviderError::authentication(
                "access token expired and no refresh token is stored, run `calbook auth google`",
            )
            .with_provider("google")
        })?;

        debug!("refreshing expired access token");
        let refreshed = self.oauth_client.refresh(&refresh_token).await?;
        let access_token = refreshed.access_token.clone();
        store.apply_refresh(
            refreshed.access_token,
            refreshed.expires_in,
            refreshed.refresh_token,
        )?;
        Ok(access_token)
    }
}

impl CalendarProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn list_events<'a>(
        &'a self,
        calendar_id: &'a str,
        query: EventQuery,
    ) -> BoxFuture<'a, ProviderResult<Vec<Event>>> {
        Box::pin(async move {
            let token = self.access_token().await?;
            self.api_client
                .list_events(&token, calendar_id, &query)
                .await
        })
    }

    fn insert_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event: &'a NewEvent,
    ) -> BoxFuture<'a, ProviderResult<Event>> {
        Box::pin(async move {
            let token = self.access_token().await?;
            self.api_client
                .insert_event(&token, calendar_id, event)
                .await
        })
    }

    fn delete_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let token = self.access_token().await?;
            self.api_client
                .delete_event(&token, calendar_id, event_id)
                .await
        })
    }
}
