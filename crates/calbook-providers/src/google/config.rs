//! Google Calendar provider configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProviderError, ProviderResult};

/// OAuth 2.0 client credentials from the Google Cloud Console.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Layout of the credentials JSON downloaded from the Google Cloud Console.
///
/// Either an `installed`/`web` section, or `client_id`/`client_secret` at the
/// root (the layout gcloud writes).
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads credentials from a Google Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read credentials file {}: {}",
                path.display(),
                e
            ))
            .with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses credentials from the JSON layouts Google tools produce.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: CredentialsFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("failed to parse credentials JSON: {}", e))
        })?;

        if let Some(section) = file.installed.or(file.web) {
            return Ok(Self::new(section.client_id, section.client_secret));
        }

        match (file.client_id, file.client_secret) {
            (Some(id), Some(secret)) => Ok(Self::new(id, secret)),
            _ => Err(ProviderError::configuration(
                "credentials file must contain an 'installed' or 'web' section, or 'client_id' and 'client_secret' at the root",
            )),
        }
    }

    /// Checks that the credentials look like a Google OAuth client.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Configuration for the Google Calendar provider.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub credentials: OAuthCredentials,

    /// Where the OAuth token is persisted.
    ///
    /// Defaults to `~/.local/share/calbook/google-token.json`.
    pub token_path: PathBuf,

    /// Request timeout for API and token calls.
    pub timeout: Duration,

    pub user_agent: String,

    /// Ports tried, in order, for the OAuth loopback redirect.
    pub loopback_port_range: (u16, u16),

    /// OAuth scopes to request. Defaults to full calendar access.
    pub scopes: Vec<String>,

    /// Base URL of the Calendar v3 API.
    pub api_base: String,
}

impl GoogleConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Read/write access to calendars; booking and releasing need it.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar";

    pub const DEFAULT_API_BASE: &'static str = "https://www.googleapis.com/calendar/v3";

    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            token_path: Self::default_token_path(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("calbook/{}", env!("CARGO_PKG_VERSION")),
            loopback_port_range: (8080, 8090),
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
            api_base: Self::DEFAULT_API_BASE.to_string(),
        }
    }

    /// Returns `~/.local/share/calbook/google-token.json`, home-expanded.
    pub fn default_token_path() -> PathBuf {
        expand_home("~/.local/share/calbook/google-token.json")
    }

    /// Sets the token path. A leading `~` is expanded.
    pub fn with_token_path(mut self, path: impl AsRef<Path>) -> Self {
        self.token_path = expand_home(path);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        self.credentials
            .validate()
            .map_err(|e| format!("invalid credentials: {}", e))?;

        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }

        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err("invalid loopback port range".to_string());
        }

        Ok(())
    }
}

/// Expands a leading `~` using the process environment.
///
/// See [`expand_home_with`] for the lookup order.
pub fn expand_home(path: impl AsRef<Path>) -> PathBuf {
    expand_home_with(path, |key| std::env::var(key).ok())
}

/// Expands a leading `~` with `HOME`, falling back to `HOMEDRIVE` + `HOMEPATH`.
///
/// Empty variables count as unset. The path is returned unchanged when it
/// does not start with `~` or no home directory can be resolved.
pub fn expand_home_with<F>(path: impl AsRef<Path>, env: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let path = path.as_ref();
    let Some(text) = path.to_str() else {
        return path.to_path_buf();
    };
    let rest = match text.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with(['/', '\\']) => rest,
        _ => return path.to_path_buf(),
    };

    let non_empty = |key: &str| env(key).filter(|v| !v.is_empty());
    let home = non_empty("HOME").or_else(|| {
        let drive = non_empty("HOMEDRIVE")?;
        let home_path = non_empty("HOMEPATH")?;
        Some(format!("{drive}{home_path}"))
    });

    match home {
        Some(home) => PathBuf::from(format!("{home}{rest}")),
        None => path.to_path_buf(),
    }
}
