//! OAuth token persistence.
//!
//! The token file is JSON, written atomically (temp file + rename) and
//! readable only by the owner on Unix.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

/// Access tokens this close to expiry are treated as expired.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// A persisted OAuth token set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// When the access token expires, as reported by the token endpoint.
    pub expires_at: Option<DateTime<Utc>>,
    /// Scopes granted with this token.
    pub scopes: Vec<String>,
    pub last_refresh: DateTime<Utc>,
}

impl TokenInfo {
    /// Builds a token set from a token endpoint response received at `now`.
    pub fn issued_at(
        now: DateTime<Utc>,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in_secs.map(|secs| now + Duration::seconds(secs)),
            scopes,
            last_refresh: now,
        }
    }

    /// Returns true if the access token should be refreshed at `now`.
    ///
    /// Tokens without an expiry never need refreshing.
    pub fn needs_refresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|expires_at| now + Duration::seconds(EXPIRY_MARGIN_SECS) >= expires_at)
    }

    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh_at(Utc::now())
    }

    /// Returns true if every scope in `required` was granted.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Records a refreshed access token received at `now`.
    ///
    /// Google may rotate the refresh token; a new one replaces the old.
    pub fn apply_refresh(
        &mut self,
        now: DateTime<Utc>,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
        refresh_token: Option<String>,
    ) {
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs.map(|secs| now + Duration::seconds(secs));
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        self.last_refresh = now;
    }
}

/// File-backed token store.
///
/// Not synchronized; [`GoogleProvider`](super::GoogleProvider) keeps it
/// behind an async mutex.
#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
    tokens: Option<TokenInfo>,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokens: None,
        }
    }

    /// Loads the token file into memory.
    ///
    /// Returns `Ok(false)` when no token file exists.
    pub fn load(&mut self) -> ProviderResult<bool> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no token file");
            return Ok(false);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read token file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let tokens: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to parse token file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!(path = %self.path.display(), "loaded tokens");
        self.tokens = Some(tokens);
        Ok(true)
    }

    /// Replaces the tokens and persists them.
    pub fn set(&mut self, tokens: TokenInfo) -> ProviderResult<()> {
        self.tokens = Some(tokens);
        self.save()
    }

    /// Applies a refresh result and persists it.
    pub fn apply_refresh(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
        refresh_token: Option<String>,
    ) -> ProviderResult<()> {
        let tokens = self
            .tokens
            .as_mut()
            .ok_or_else(|| ProviderError::internal("no tokens to update"))?;
        tokens.apply_refresh(Utc::now(), access_token, expires_in_secs, refresh_token);
        self.save()
    }

    /// Writes the current tokens to disk.
    pub fn save(&self) -> ProviderResult<()> {
        let tokens = self
            .tokens
            .as_ref()
            .ok_or_else(|| ProviderError::internal("no tokens to save"))?;

        if let Some(parent) = self.path.parent() {
            create_private_dir(parent)?;
        }

        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| ProviderError::internal(format!("failed to serialize tokens: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| {
            ProviderError::configuration(format!("failed to write token file: {}", e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                ProviderError::configuration(format!("failed to restrict token file: {}", e))
            })?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to replace token file: {}", e))
        })?;

        debug!(path = %self.path.display(), "saved tokens");
        Ok(())
    }

    /// Forgets the tokens and removes the token file.
    pub fn clear(&mut self) -> ProviderResult<()> {
        self.tokens = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                ProviderError::configuration(format!(
                    "failed to remove token file {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
            info!(path = %self.path.display(), "removed token file");
        }
        Ok(())
    }

    pub fn tokens(&self) -> Option<&TokenInfo> {
        self.tokens.as_ref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if there are no tokens or they lack a required scope.
    pub fn needs_reauth(&self, required_scopes: &[String]) -> bool {
        self.tokens
            .as_ref()
            .is_none_or(|t| !t.has_scopes(required_scopes))
    }
}

fn create_private_dir(dir: &Path) -> ProviderResult<()> {
    if dir.as_os_str().is_empty() || dir.exists() {
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir).map_err(|e| {
        ProviderError::configuration(format!(
            "failed to create token directory {}: {}",
            dir.display(),
            e
        ))
    })
}
