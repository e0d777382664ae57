//! OAuth 2.0 authorization code flow with PKCE for installed applications.
//!
//! The consent page redirects to a short-lived HTTP listener on 127.0.0.1.
//! The authorization code is then exchanged, with the PKCE verifier, for an
//! access token and a refresh token.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::config::OAuthCredentials;
use super::tokens::TokenInfo;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Verifier entropy in bytes, before base64url encoding.
const CODE_VERIFIER_LENGTH: usize = 32;

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

const CALLBACK_PATH: &str = "/callback";

/// Access token returned by a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in: Option<i64>,
    /// Set when Google rotates the refresh token.
    pub refresh_token: Option<String>,
}

/// Performs authorization and token refresh against Google's endpoints.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
}

impl OAuthClient {
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            credentials,
            http_client,
        }
    }

    /// Runs the interactive flow and returns fresh tokens for `scopes`.
    ///
    /// The authorization URL is always printed to stderr so it can be
    /// opened by hand when no browser is available.
    ///
    /// # Errors
    ///
    /// Fails when no loopback port is free, the user denies access, the
    /// callback does not arrive within five minutes, the `state` echoed by
    /// the callback does not match, or the code exchange is rejected.
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
    ) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();
        let (listener, port) = bind_loopback(port_range)?;
        let redirect_uri = format!("http://127.0.0.1:{}{}", port, CALLBACK_PATH);
        let auth_url = pkce.build_auth_url(&self.credentials.client_id, &redirect_uri, scopes);

        eprintln!("Open the following link in your browser:\n\n{}\n", auth_url);
        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
        }

        let callback = tokio::task::spawn_blocking(move || wait_for_callback(listener))
            .await
            .map_err(|e| ProviderError::internal(format!("callback listener failed: {}", e)))??;

        if callback.state != pkce.state {
            return Err(ProviderError::authentication(
                "OAuth state mismatch, the callback did not come from this request",
            ));
        }

        info!("received authorization code, exchanging for tokens");
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", callback.code.as_str()),
            ("code_verifier", pkce.verifier.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri.as_str()),
        ];
        let response = self.post_token_form(&params, "token exchange").await?;

        Ok(TokenInfo::issued_at(
            Utc::now(),
            response.access_token,
            response.refresh_token,
            response.expires_in,
            granted_scopes(response.scope.as_deref(), scopes),
        ))
    }

    /// Exchanges a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> ProviderResult<RefreshedToken> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let response = self.post_token_form(&params, "token refresh").await?;

        info!("refreshed access token");
        Ok(RefreshedToken {
            access_token: response.access_token,
            expires_in: response.expires_in,
            refresh_token: response.refresh_token,
        })
    }

    async fn post_token_form(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("{} request failed: {}", what, e)).with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read {} response: {}", what, e))
        })?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "{} failed ({}): {}",
                what, status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid {} response: {}", what, e))
        })
    }
}

/// Scopes actually granted, falling back to the requested ones when the
/// token endpoint does not echo them.
fn granted_scopes(granted: Option<&str>, requested: &[String]) -> Vec<String> {
    match granted {
        Some(list) if !list.trim().is_empty() => {
            list.split_whitespace().map(str::to_string).collect()
        }
        _ => requested.to_vec(),
    }
}

fn bind_loopback(port_range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
    for port in port_range.0..=port_range.1 {
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
            debug!(port, "bound OAuth loopback listener");
            return Ok((listener, port));
        }
    }
    Err(ProviderError::configuration(format!(
        "no available port in range {}-{}",
        port_range.0, port_range.1
    )))
}

/// Blocks until the browser hits the callback path or the timeout elapses.
fn wait_for_callback(listener: TcpListener) -> ProviderResult<Callback> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Some(result) = answer_callback(stream) {
                        let _ = tx.send(result);
                        return;
                    }
                }
                Err(e) => warn!("failed to accept OAuth callback: {}", e),
            }
        }
    });

    match rx.recv_timeout(CALLBACK_TIMEOUT) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(ProviderError::authentication(
            "timed out waiting for the OAuth callback",
        )),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(ProviderError::internal("OAuth callback listener stopped"))
        }
    }
}

/// Reads one request, replies with a small page, and returns the outcome
/// when the request targeted the callback path.
fn answer_callback(mut stream: TcpStream) -> Option<ProviderResult<Callback>> {
    let mut request_line = String::new();
    BufReader::new(&stream).read_line(&mut request_line).ok()?;

    let mut parts = request_line.split_whitespace();
    let (Some("GET"), Some(target)) = (parts.next(), parts.next()) else {
        return None;
    };
    let result = parse_callback(target)?;

    let page = if result.is_ok() {
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
        <html><body><h1>calbook is authorized</h1>\
        <p>You can close this window and return to the terminal.</p></body></html>"
    } else {
        "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
        <html><body><h1>Authorization failed</h1>\
        <p>See the terminal for details. You can close this window.</p></body></html>"
    };
    let _ = stream.write_all(page.as_bytes());
    let _ = stream.flush();

    Some(result)
}

/// Authorization code and state carried by the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Callback {
    code: String,
    state: String,
}

/// Parses a request target such as `/callback?code=...&state=...`.
///
/// Returns `None` for paths other than the callback (favicon requests and
/// the like).
fn parse_callback(target: &str) -> Option<ProviderResult<Callback>> {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    if path != CALLBACK_PATH {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());
        match key {
            "code" => code = Some(value),
            "state" => state = Some(value),
            "error" => error = Some(value),
            _ => {}
        }
    }

    Some(match (error, code) {
        (Some(error), _) => Err(ProviderError::authentication(format!(
            "authorization denied: {}",
            error
        ))),
        (None, Some(code)) => Ok(Callback {
            code,
            state: state.unwrap_or_default(),
        }),
        (None, None) => Err(ProviderError::authentication(
            "missing authorization code in callback",
        )),
    })
}

/// PKCE parameters for one authorization request (RFC 7636).
#[derive(Debug)]
pub struct PkceFlow {
    pub verifier: String,
    /// Base64url SHA-256 of the verifier.
    pub challenge: String,
    /// Random value echoed back by the redirect.
    pub state: String,
}

impl PkceFlow {
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    /// Builds the consent page URL.
    ///
    /// `access_type=offline` with `prompt=consent` makes Google return a
    /// refresh token every time.
    pub fn build_auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            GOOGLE_AUTH_URL,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}

fn compute_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Space-separated granted scopes.
    #[serde(default)]
    scope: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifier_is_43_chars() {
        assert_eq!(PkceFlow::new().verifier.len(), 43);
    }

    #[test]
    fn challenge_matches_rfc7636_example() {
        assert_eq!(
            compute_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn flows_are_random() {
        let a = PkceFlow::new();
        let b = PkceFlow::new();
        assert_ne!(a.verifier, b.verifier);
        assert_ne!(a.state, b.state);
    }

    #[test]
    fn auth_url_shape() {
        let flow = PkceFlow {
            verifier: "v".to_string(),
            challenge: "challenge".to_string(),
            state: "xyz".to_string(),
        };
        let url = flow.build_auth_url(
            "id.apps.googleusercontent.com",
            "http://127.0.0.1:8080/callback",
            &["https://www.googleapis.com/auth/calendar".to_string()],
        );

        insta::assert_snapshot!(url, @"https://accounts.google.com/o/oauth2/v2/auth?client_id=id.apps.googleusercontent.com&redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2Fcallback&response_type=code&scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fcalendar&code_challenge=challenge&code_challenge_method=S256&state=xyz&access_type=offline&prompt=consent");
    }

    #[test]
    fn callback_with_code_and_state() {
        let callback = parse_callback("/callback?state=abc&code=4%2F0Ad&scope=x")
            .unwrap()
            .unwrap();
        assert_eq!(callback.code, "4/0Ad");
        assert_eq!(callback.state, "abc");
    }

    #[test]
    fn callback_with_error() {
        let err = parse_callback("/callback?error=access_denied")
            .unwrap()
            .unwrap_err();
        assert!(err.message().contains("access_denied"));
    }

    #[test]
    fn callback_without_code() {
        assert!(parse_callback("/callback").unwrap().is_err());
    }

    #[test]
    fn other_paths_are_ignored() {
        assert!(parse_callback("/favicon.ico").is_none());
        assert!(parse_callback("/callbacks?code=x").is_none());
    }

    #[test]
    fn granted_scopes_prefer_response() {
        let requested = vec!["https://www.googleapis.com/auth/calendar".to_string()];
        assert_eq!(granted_scopes(None, &requested), requested);
        assert_eq!(granted_scopes(Some("  "), &requested), requested);
        assert_eq!(
            granted_scopes(Some("openid https://www.googleapis.com/auth/calendar.readonly"), &requested),
            vec![
                "openid".to_string(),
                "https://www.googleapis.com/auth/calendar.readonly".to_string()
            ]
        );
    }
}
