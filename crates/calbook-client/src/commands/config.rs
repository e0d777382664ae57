//! Configuration commands.

use std::io::Write;
use std::path::Path;

use crate::config::{ClientConfig, CredentialOverrides};
use crate::error::{ClientError, ClientResult};

/// Print the effective configuration as TOML.
pub fn dump<W: Write>(config: &ClientConfig, path: &Path, out: &mut W) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    writeln!(out, "# config.toml ({})", path.display())?;
    write!(out, "{}", toml_str)?;
    Ok(())
}

/// Validate the configuration.
///
/// Credentials are only checked when some are configured, since `auth
/// google` can supply them on the command line.
pub fn validate<W: Write>(config: &ClientConfig, out: &mut W) -> ClientResult<()> {
    config.validate()?;

    let google = &config.google;
    if google.client_id.is_some() || google.client_secret.is_some() || google.credentials_file.is_some() {
        google.to_provider_config(&CredentialOverrides::default())?;
        writeln!(out, "Google credentials are valid.")?;
    }

    writeln!(out, "Configuration is valid.")?;
    Ok(())
}

/// Show the configuration and token file paths.
pub fn path<W: Write>(config: &ClientConfig, path: &Path, out: &mut W) -> ClientResult<()> {
    writeln!(out, "config: {}", path.display())?;
    writeln!(out, "token: {}", config.google.effective_token_path().display())?;
    Ok(())
}
