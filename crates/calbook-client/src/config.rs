//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `<config dir>/calbook/config.toml` by default:
//!
//! ```toml
//! [calendar]
//! id = "team@group.calendar.google.com"
//! timezone = "Europe/Berlin"
//!
//! [google]
//! credentials_file = "~/.credentials/client_secret.json"
//! token_path = "~/.local/share/calbook/google-token.json"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use calbook_core::parse_timezone;
use calbook_providers::google::{GoogleConfig, OAuthCredentials, expand_home};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Configuration for the calbook client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Which calendar to operate on and how to read local times.
    pub calendar: CalendarSettings,

    /// Google Calendar settings.
    pub google: GoogleSettings,
}

/// The calendar all commands target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// Calendar identifier, e.g. `primary` or `...@group.calendar.google.com`.
    pub id: String,

    /// IANA timezone used for local date input and for booked events.
    pub timezone: String,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            id: "primary".to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

impl CalendarSettings {
    /// Resolves the configured timezone.
    pub fn tz(&self) -> ClientResult<Tz> {
        Ok(parse_timezone(&self.timezone)?)
    }
}

/// Google Calendar provider settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client ID.
    pub client_id: Option<String>,

    /// OAuth client secret.
    pub client_secret: Option<String>,

    /// Google Cloud Console credentials JSON, used when the inline pair is absent.
    pub credentials_file: Option<PathBuf>,

    /// Where the OAuth token is stored.
    pub token_path: Option<PathBuf>,

    /// OAuth scopes. Empty means full calendar access.
    pub scopes: Vec<String>,

    /// HTTP request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Credentials given on the command line (or their environment fallbacks).
#[derive(Debug, Clone, Default)]
pub struct CredentialOverrides {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub credentials_file: Option<PathBuf>,
}

impl CredentialOverrides {
    /// Reads the same environment variables the `auth google` flags fall back to.
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    pub fn from_env_with<F>(env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).filter(|v| !v.is_empty());
        Self {
            client_id: var("GOOGLE_CLIENT_ID"),
            client_secret: var("GOOGLE_CLIENT_SECRET"),
            credentials_file: var("GOOGLE_CREDENTIALS_FILE").map(PathBuf::from),
        }
    }
}

impl GoogleSettings {
    /// Resolves OAuth credentials.
    ///
    /// Priority (highest to lowest):
    /// 1. `--client-id` + `--client-secret`
    /// 2. `--credentials-file`
    /// 3. `client_id` + `client_secret` in `[google]`
    /// 4. `credentials_file` in `[google]`
    pub fn resolve_credentials(
        &self,
        overrides: &CredentialOverrides,
    ) -> ClientResult<OAuthCredentials> {
        match (&overrides.client_id, &overrides.client_secret) {
            (Some(id), Some(secret)) => return Ok(OAuthCredentials::new(id, secret)),
            (None, None) => {}
            _ => {
                return Err(ClientError::Config(
                    "both --client-id and --client-secret are required when providing credentials directly"
                        .to_string(),
                ));
            }
        }

        if let Some(ref path) = overrides.credentials_file {
            return Ok(OAuthCredentials::from_file(expand_home(path))?);
        }

        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => return Ok(OAuthCredentials::new(id, secret)),
            (Some(_), None) => {
                return Err(ClientError::Config(
                    "client_secret is missing from the [google] section".to_string(),
                ));
            }
            (None, Some(_)) => {
                return Err(ClientError::Config(
                    "client_id is missing from the [google] section".to_string(),
                ));
            }
            (None, None) => {}
        }

        if let Some(ref path) = self.credentials_file {
            return Ok(OAuthCredentials::from_file(expand_home(path))?);
        }

        Err(ClientError::Config(format!(
            "Google credentials are required. Provide them via:\n  \
             - client_id + client_secret, or credentials_file, under [google] in {}\n  \
             - --client-id and --client-secret flags\n  \
             - --credentials-file flag (path to Google Cloud Console JSON)\n  \
             - GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET env vars",
            ClientConfig::default_path().display()
        )))
    }

    /// Builds the provider configuration.
    pub fn to_provider_config(&self, overrides: &CredentialOverrides) -> ClientResult<GoogleConfig> {
        let credentials = self.resolve_credentials(overrides)?;
        credentials
            .validate()
            .map_err(|e| ClientError::Config(format!("invalid Google credentials: {}", e)))?;

        let mut config = GoogleConfig::new(credentials);
        if let Some(ref path) = self.token_path {
            config = config.with_token_path(path);
        }
        if !self.scopes.is_empty() {
            config = config.with_scopes(self.scopes.clone());
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    /// Token file location after defaults and `~` expansion.
    pub fn effective_token_path(&self) -> PathBuf {
        self.token_path
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(GoogleConfig::default_token_path)
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path. The file must exist.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parses a `config.toml` document.
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Applies `--calendar` and `--timezone`.
    pub fn with_overrides(mut self, calendar: Option<String>, timezone: Option<String>) -> Self {
        if let Some(id) = calendar {
            self.calendar.id = id;
        }
        if let Some(tz) = timezone {
            self.calendar.timezone = tz;
        }
        self
    }

    /// Checks the settings that can be checked offline.
    pub fn validate(&self) -> ClientResult<()> {
        if self.calendar.id.trim().is_empty() {
            return Err(ClientError::Config("calendar id must not be empty".to_string()));
        }
        self.calendar.tz()?;
        if self.google.timeout_secs == Some(0) {
            return Err(ClientError::Config(
                "google timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calbook")
            .join("config.toml")
    }
}
