//! Process-wide client configuration.
//!
//! Built once at startup (from defaults or a TOML file) and handed to the
//! client and the auth layer behind an `Arc`. Nothing in the crate reads
//! endpoints or file locations from globals.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Host of the reminders service.
pub const DEFAULT_BASE_URL: &str = "https://reminders-pa.clients6.google.com";

/// The service wants this content type even though bodies are plain JSON.
pub const PROTOBUF_JSON_CONTENT_TYPE: &str = "application/json+protobuf";

const ENDPOINT_PREFIX: &str = "/v1internalOP/reminders";
const APP_KEYS_FILE: &str = "app_keys.json";
const TOKEN_FILE: &str = ".google-reminders-cli-oauth";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// The four remote operations. Each maps to one fixed POST endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Get,
    Delete,
    List,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Get => "get",
            Operation::Delete => "delete",
            Operation::List => "list",
        }
    }
}

/// Endpoint URIs, one per operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub create: String,
    pub get: String,
    pub delete: String,
    pub list: String,
}

impl Endpoints {
    /// Endpoints rooted at `base_url` (trailing slash ignored).
    pub fn for_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let uri = |op: Operation| format!("{base}{ENDPOINT_PREFIX}/{}", op.as_str());
        Self {
            create: uri(Operation::Create),
            get: uri(Operation::Get),
            delete: uri(Operation::Delete),
            list: uri(Operation::List),
        }
    }

    pub fn uri(&self, op: Operation) -> &str {
        match op {
            Operation::Create => &self.create,
            Operation::Get => &self.get,
            Operation::Delete => &self.delete,
            Operation::List => &self.list,
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::for_base_url(DEFAULT_BASE_URL)
    }
}

/// OAuth client settings for the consent flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthSettings {
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,

    #[serde(default = "default_token_uri")]
    pub token_uri: String,

    #[serde(default = "default_scope")]
    pub scope: String,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_scope() -> String {
    "https://www.googleapis.com/auth/reminders".to_string()
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            auth_uri: default_auth_uri(),
            token_uri: default_token_uri(),
            scope: default_scope(),
        }
    }
}

/// Everything the client and the credential provider need to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemindersConfig {
    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// Application keys file (`APP_CLIENT_ID` / `APP_CLIENT_SECRET`).
    #[serde(default = "default_app_keys_path")]
    pub app_keys_path: PathBuf,

    /// Where the user's OAuth token state is cached between runs.
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,

    #[serde(default)]
    pub endpoints: Endpoints,

    #[serde(default)]
    pub oauth: OAuthSettings,
}

fn default_content_type() -> String {
    PROTOBUF_JSON_CONTENT_TYPE.to_string()
}

/// Next to the running executable, like a bundled resource.
fn default_app_keys_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(APP_KEYS_FILE)))
        .unwrap_or_else(|| PathBuf::from(APP_KEYS_FILE))
}

fn default_token_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(TOKEN_FILE)
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            content_type: default_content_type(),
            app_keys_path: default_app_keys_path(),
            token_path: default_token_path(),
            endpoints: Endpoints::default(),
            oauth: OAuthSettings::default(),
        }
    }
}

impl RemindersConfig {
    /// Default config location: `<config dir>/reminders-cli/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reminders-cli")
            .join("config.toml")
    }

    /// Load configuration from `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Point every endpoint at another host, e.g. a local mock service.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.endpoints = Endpoints::for_base_url(base_url);
        self
    }
}
