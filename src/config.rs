use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::push::bridge::DEFAULT_HIGHLIGHT;
use crate::push::worker::{DEFAULT_BODY, DEFAULT_TITLE, WorkerConfig};

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_APP_URL: &str = "http://localhost:3000";
pub const DEFAULT_STORE_PATH: &str = "taskpush-store.json";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid {field} '{value}': {source}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        source: url::ParseError,
    },
    #[error("invalid {field} '{value}'; expected <number>[ms|s|m]")]
    InvalidDuration { field: &'static str, value: String },
    #[error("{0} cannot be empty")]
    Empty(&'static str),
}

/// Push settings handed to the subscription manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConfig {
    /// URL-safe base64 VAPID public key, as the backend publishes it.
    pub server_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_base_url: Url,
    pub app_url: Url,
    pub vapid_public_key: Option<String>,
    pub store_path: PathBuf,
    pub http_timeout: Duration,
    pub highlight_duration: Duration,
    pub notification_title: String,
    pub notification_body: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: Url::parse(DEFAULT_API_URL).expect("default api url"),
            app_url: Url::parse(DEFAULT_APP_URL).expect("default app url"),
            vapid_public_key: None,
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            highlight_duration: DEFAULT_HIGHLIGHT,
            notification_title: DEFAULT_TITLE.to_string(),
            notification_body: DEFAULT_BODY.to_string(),
        }
    }
}

impl AppConfig {
    /// `None` when no VAPID public key is configured, which disables subscribing.
    pub fn push_config(&self) -> Option<PushConfig> {
        self.vapid_public_key.as_ref().map(|key| PushConfig {
            server_key: key.clone(),
        })
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            target_url: self.app_url.clone(),
            default_title: self.notification_title.clone(),
            default_body: self.notification_body.clone(),
        }
    }

    /// Resolves layered settings; every value left unset falls back to its default.
    pub fn resolve(settings: Settings) -> Result<Self, ConfigError> {
        let mut config = AppConfig::default();
        if let Some(raw) = settings.api_url {
            config.api_base_url = parse_url("api url", &raw)?;
        }
        if let Some(raw) = settings.app_url {
            config.app_url = parse_url("app url", &raw)?;
        }
        if let Some(key) = settings.vapid_public_key {
            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::Empty("vapid public key"));
            }
            config.vapid_public_key = Some(key.to_string());
        }
        if let Some(path) = settings.store {
            config.store_path = path;
        }
        if let Some(raw) = settings.http_timeout {
            config.http_timeout = parse_duration("http timeout", &raw)?;
        }
        if let Some(raw) = settings.highlight {
            config.highlight_duration = parse_duration("highlight duration", &raw)?;
        }
        if let Some(title) = settings.notification_title {
            config.notification_title = title;
        }
        if let Some(body) = settings.notification_body {
            config.notification_body = body;
        }
        Ok(config)
    }
}

/// One layer of optional settings: the TOML file or the command line.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Settings {
    pub api_url: Option<String>,
    pub app_url: Option<String>,
    pub vapid_public_key: Option<String>,
    pub store: Option<PathBuf>,
    pub http_timeout: Option<String>,
    pub highlight: Option<String>,
    pub notification_title: Option<String>,
    pub notification_body: Option<String>,
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Values set in `overrides` win.
    pub fn overlay(self, overrides: Settings) -> Settings {
        Settings {
            api_url: overrides.api_url.or(self.api_url),
            app_url: overrides.app_url.or(self.app_url),
            vapid_public_key: overrides.vapid_public_key.or(self.vapid_public_key),
            store: overrides.store.or(self.store),
            http_timeout: overrides.http_timeout.or(self.http_timeout),
            highlight: overrides.highlight.or(self.highlight),
            notification_title: overrides.notification_title.or(self.notification_title),
            notification_body: overrides.notification_body.or(self.notification_body),
        }
    }
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ConfigError::Empty(field));
    }
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
        source,
    })
}

pub(crate) fn parse_duration(field: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let value = raw.trim();
    let invalid = || ConfigError::InvalidDuration {
        field,
        value: value.to_string(),
    };
    if value.is_empty() {
        return Err(ConfigError::Empty(field));
    }

    let split = value
        .find(|ch: char| ch.is_ascii_alphabetic())
        .unwrap_or(value.len());
    let (amount, unit) = value.split_at(split);
    let amount: u64 = amount.parse().map_err(|_| invalid())?;
    if amount == 0 {
        return Err(invalid());
    }

    match unit.to_ascii_lowercase().as_str() {
        "ms" => Ok(Duration::from_millis(amount)),
        "" | "s" => Ok(Duration::from_secs(amount)),
        "m" => amount
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}
