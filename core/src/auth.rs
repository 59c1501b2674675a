//! Credential providers: where the authenticated transport comes from.
//!
//! # Design
//! `CredentialProvider` has a single job, handing out a ready-to-use
//! `Transport`. `OAuthProvider` does it the way a desktop OAuth client does:
//! cached token first, refresh second, and an interactive
//! authorization-code flow with a loopback redirect as the last resort.
//! `StaticTokenProvider` skips all of that for callers that already hold a
//! bearer token (CI, the mock service, tests).

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{OAuthSettings, RemindersConfig};
use crate::error::ApiError;
use crate::http::{plain_agent, Transport, UreqTransport};

/// Tokens this close to expiry are treated as expired.
const EXPIRY_LEEWAY_SECS: i64 = 60;

const CONSENT_DONE_PAGE: &str = "<html><body>Authentication complete. \
    You can close this window and return to the terminal.</body></html>";

/// Source of an authenticated transport.
pub trait CredentialProvider: Send + Sync {
    fn obtain_transport(&self) -> Result<Box<dyn Transport + Send>, ApiError>;
}

/// Hands out transports carrying a fixed bearer token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    access_token: String,
}

impl StaticTokenProvider {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }
}

impl CredentialProvider for StaticTokenProvider {
    fn obtain_transport(&self) -> Result<Box<dyn Transport + Send>, ApiError> {
        Ok(Box::new(UreqTransport::new(self.access_token.clone())))
    }
}

/// Application credentials registered with the OAuth server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppKeys {
    #[serde(rename = "APP_CLIENT_ID")]
    pub client_id: String,
    #[serde(rename = "APP_CLIENT_SECRET")]
    pub client_secret: String,
}

impl AppKeys {
    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ApiError::AuthenticationRequired(format!(
                "cannot read app keys file {}: {e}",
                path.display()
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ApiError::AuthenticationRequired(format!(
                "app keys file {} is invalid: {e}",
                path.display()
            ))
        })
    }
}

/// The user's OAuth state as cached on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds; `None` when the server gave no expiry.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl StoredToken {
    /// `Ok(None)` when nothing has been stored yet. An unreadable file is
    /// treated the same way so a corrupt cache just triggers a new consent.
    pub fn load(path: &Path) -> Result<Option<Self>, ApiError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ApiError::Auth(format!("cannot read {}: {e}", path.display())))?;
        match serde_json::from_str(&content) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                tracing::warn!("ignoring unreadable token file {}: {e}", path.display());
                Ok(None)
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ApiError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ApiError::Serialization(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ApiError::Auth(e.to_string()))?;
        }
        std::fs::write(path, content)
            .map_err(|e| ApiError::Auth(format!("cannot write {}: {e}", path.display())))
    }

    pub fn is_valid_at(&self, now_secs: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at.saturating_sub(EXPIRY_LEEWAY_SECS) > now_secs,
            None => true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl TokenResponse {
    fn into_stored(self, now_secs: i64, previous_refresh: Option<String>) -> StoredToken {
        StoredToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: self.expires_in.map(|secs| now_secs.saturating_add(secs)),
        }
    }
}

/// File-backed OAuth provider with interactive fallback.
pub struct OAuthProvider {
    config: Arc<RemindersConfig>,
}

impl OAuthProvider {
    pub fn new(config: Arc<RemindersConfig>) -> Self {
        Self { config }
    }

    /// A valid access token, refreshing or asking the user as needed. Any new
    /// token is written back to the token file.
    pub fn access_token(&self) -> Result<String, ApiError> {
        let keys = AppKeys::load(&self.config.app_keys_path)?;
        let path = &self.config.token_path;
        let now = chrono::Utc::now().timestamp();

        let stored = StoredToken::load(path)?;
        if let Some(token) = &stored {
            if token.is_valid_at(now) {
                return Ok(token.access_token.clone());
            }
        }

        let refreshed = match stored.and_then(|t| t.refresh_token) {
            Some(refresh_token) => match self.refresh(&keys, &refresh_token, now) {
                Ok(token) => Some(token),
                Err(err) => {
                    tracing::warn!("token refresh failed, asking for consent again: {err}");
                    None
                }
            },
            None => None,
        };
        let token = match refreshed {
            Some(token) => token,
            None => self.run_consent_flow(&keys, now)?,
        };

        token.save(path)?;
        tracing::info!("stored OAuth credentials in {}", path.display());
        Ok(token.access_token)
    }

    fn refresh(&self, keys: &AppKeys, refresh_token: &str, now: i64) -> Result<StoredToken, ApiError> {
        let response = post_token_form(
            &self.config.oauth.token_uri,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", keys.client_id.as_str()),
                ("client_secret", keys.client_secret.as_str()),
            ],
        )?;
        Ok(response.into_stored(now, Some(refresh_token.to_string())))
    }

    /// Authorization-code flow with a loopback redirect. Blocks until the
    /// browser comes back with a code (or an error).
    fn run_consent_flow(&self, keys: &AppKeys, now: i64) -> Result<StoredToken, ApiError> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .map_err(|e| ApiError::Auth(format!("cannot bind redirect listener: {e}")))?;
        let port = listener
            .local_addr()
            .map_err(|e| ApiError::Auth(e.to_string()))?
            .port();
        let redirect_uri = format!("http://127.0.0.1:{port}/");
        let consent = consent_url(&self.config.oauth, &keys.client_id, &redirect_uri)?;

        eprintln!("Your browser needs to grant access to your reminders. Open:\n\n    {consent}\n");
        tracing::info!("waiting for OAuth redirect on {redirect_uri}");
        let code = wait_for_code(&listener)?;

        let response = post_token_form(
            &self.config.oauth.token_uri,
            &[
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("client_id", keys.client_id.as_str()),
                ("client_secret", keys.client_secret.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
            ],
        )?;
        Ok(response.into_stored(now, None))
    }
}

impl CredentialProvider for OAuthProvider {
    fn obtain_transport(&self) -> Result<Box<dyn Transport + Send>, ApiError> {
        Ok(Box::new(UreqTransport::new(self.access_token()?)))
    }
}

/// The URI the user opens to grant access.
pub fn consent_url(
    settings: &OAuthSettings,
    client_id: &str,
    redirect_uri: &str,
) -> Result<Url, ApiError> {
    Url::parse_with_params(
        &settings.auth_uri,
        &[
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("scope", settings.scope.as_str()),
            ("response_type", "code"),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| ApiError::Auth(format!("invalid auth uri {}: {e}", settings.auth_uri)))
}

/// Pull the authorization code out of the redirect's request line
/// (`GET /?code=...&scope=... HTTP/1.1`).
///
/// `None` for requests that are not the redirect (e.g. `/favicon.ico`).
pub fn code_from_request_line(line: &str) -> Option<Result<String, ApiError>> {
    let target = line.split_whitespace().nth(1)?;
    let url = Url::parse("http://127.0.0.1").ok()?.join(target).ok()?;
    let mut code = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }
    match (code, error) {
        (Some(code), _) => Some(Ok(code)),
        (None, Some(error)) => Some(Err(ApiError::Auth(format!("consent denied: {error}")))),
        (None, None) => None,
    }
}

fn wait_for_code(listener: &TcpListener) -> Result<String, ApiError> {
    for stream in listener.incoming() {
        let stream = stream.map_err(|e| ApiError::Auth(e.to_string()))?;
        if let Some(result) = answer_redirect(stream)? {
            return result;
        }
    }
    Err(ApiError::Auth("redirect listener closed".into()))
}

fn answer_redirect(mut stream: TcpStream) -> Result<Option<Result<String, ApiError>>, ApiError> {
    let mut line = String::new();
    BufReader::new(&stream)
        .read_line(&mut line)
        .map_err(|e| ApiError::Auth(e.to_string()))?;

    let result = code_from_request_line(&line);
    let (status, page) = match result {
        Some(_) => ("200 OK", CONSENT_DONE_PAGE),
        None => ("404 Not Found", ""),
    };
    let reply = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{page}",
        page.len()
    );
    // The browser going away early does not invalidate the code.
    let _ = stream.write_all(reply.as_bytes());
    Ok(result)
}

fn post_token_form(token_uri: &str, form: &[(&str, &str)]) -> Result<TokenResponse, ApiError> {
    let mut response = plain_agent()
        .post(token_uri)
        .send_form(form.iter().copied())
        .map_err(|e| ApiError::Transport(e.to_string()))?;

    if response.status().as_u16() != 200 {
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string().unwrap_or_default();
        return Err(ApiError::Auth(format!("token endpoint returned {status}: {body}")));
    }
    response
        .body_mut()
        .read_json::<TokenResponse>()
        .map_err(|e| ApiError::Auth(format!("unexpected token response: {e}")))
}
