//! Google Calendar provider.
//!
//! # Authentication Flow
//!
//! 1. The user supplies their own OAuth client (Google requires one per application)
//! 2. A listener is bound on the first free loopback port in the configured range
//! 3. The consent page is opened with a PKCE challenge
//! 4. Google redirects to the listener with an authorization code
//! 5. The code and verifier are exchanged for access and refresh tokens
//! 6. Tokens are persisted and refreshed transparently afterwards
//!
//! # Example
//!
//! ```ignore
//! use calbook_providers::google::{GoogleConfig, GoogleProvider, OAuthCredentials};
//!
//! let credentials = OAuthCredentials::from_file("client_secret.json")?;
//! let provider = GoogleProvider::new(GoogleConfig::new(credentials))?;
//! provider.ensure_authenticated().await?;
//! let events = provider.list_events("primary", EventQuery::upcoming(now, 10)).await?;
//! ```

mod client;
mod config;
mod oauth;
mod provider;
mod tokens;

pub use client::{GoogleCalendarClient, reauth_hint};
pub use config::{GoogleConfig, OAuthCredentials, expand_home, expand_home_with};
pub use oauth::{OAuthClient, PkceFlow, RefreshedToken};
pub use provider::GoogleProvider;
pub use tokens::{EXPIRY_MARGIN_SECS, TokenInfo, TokenStore};
