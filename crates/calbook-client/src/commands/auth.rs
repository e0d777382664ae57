//! Authentication commands.

use std::io::Write;

use calbook_providers::google::GoogleProvider;
use tracing::info;

use crate::config::{ClientConfig, CredentialOverrides};
use crate::error::ClientResult;

/// Run the Google authorization flow and store the token.
///
/// Credentials come from the `auth google` flags (or their environment
/// fallbacks), then from `config.toml`.
pub async fn google<W: Write>(
    overrides: CredentialOverrides,
    force: bool,
    config: &ClientConfig,
    out: &mut W,
) -> ClientResult<()> {
    let provider_config = config.google.to_provider_config(&overrides)?;
    let token_path = provider_config.token_path.clone();
    let provider = GoogleProvider::new(provider_config)?;

    if !force && !provider.needs_reauth().await {
        writeln!(out, "Already authenticated with Google Calendar.")?;
        writeln!(out, "Use --force to re-authenticate.")?;
        return Ok(());
    }

    writeln!(out, "Starting Google Calendar authorization...")?;
    writeln!(out, "A browser window will open for you to grant access.")?;
    out.flush()?;

    provider.authenticate(force).await?;

    info!("Google authentication successful");
    writeln!(out, "Authentication successful!")?;
    writeln!(out, "Token saved to {}", token_path.display())?;
    Ok(())
}

/// Opens the configured Google calendar for a calendar command.
///
/// Runs the authorization flow if no token is stored yet and refreshes an
/// expiring one.
pub async fn connect_google(config: &ClientConfig) -> ClientResult<GoogleProvider> {
    let provider_config = config
        .google
        .to_provider_config(&CredentialOverrides::from_env())?;
    let provider = GoogleProvider::new(provider_config)?;
    provider.ensure_authenticated().await?;
    Ok(provider)
}
