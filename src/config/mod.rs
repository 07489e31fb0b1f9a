//! Configuration loading for the Slack app endpoint.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `SLACKHOOK_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::tokens::WorkspaceToken;

const ENV_PREFIX: &str = "SLACKHOOK_";

/// Application configuration derived from `SLACKHOOK_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Display name interpolated into the install success page.
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// First path segment(s) of every Slack route, e.g. `slack` → `/slack/commands`.
    #[serde(default)]
    pub route_prefix: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub signing_secret: String,
    /// Workspace tokens known before any install happens.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<WorkspaceToken>,
    #[serde(default = "default_oauth_access_url")]
    pub oauth_access_url: String,
    #[serde(default = "default_install_timeout_seconds")]
    pub install_timeout_seconds: u64,
    /// Maximum accepted age of `X-Slack-Request-Timestamp`. `None` disables the check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_tolerance_seconds: Option<u64>,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            app_name: default_app_name(),
            route_prefix: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            signing_secret: String::new(),
            tokens: Vec::new(),
            oauth_access_url: default_oauth_access_url(),
            install_timeout_seconds: default_install_timeout_seconds(),
            signature_tolerance_seconds: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Route prefix without surrounding slashes.
    pub fn route_prefix(&self) -> &str {
        self.route_prefix.trim_matches('/')
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if !config.client_secret.is_empty() {
            config.client_secret = "[REDACTED]".to_string();
        }
        if !config.signing_secret.is_empty() {
            config.signing_secret = "[REDACTED]".to_string();
        }
        for token in &mut config.tokens {
            token.token = "[REDACTED]".to_string();
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if required settings are missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = self.route_prefix();
        if prefix.is_empty() {
            return Err(ConfigError::MissingRoutePrefix);
        }
        if !is_valid_route_prefix(prefix) {
            return Err(ConfigError::InvalidRoutePrefix {
                value: self.route_prefix.clone(),
            });
        }

        if self.signing_secret.is_empty() {
            return Err(ConfigError::MissingSigningSecret);
        }

        // The install flow only has to work outside local/test
        if !matches!(self.profile.as_str(), "local" | "test") {
            if self.client_id.is_empty() {
                return Err(ConfigError::MissingClientId);
            }
            if self.client_secret.is_empty() {
                return Err(ConfigError::MissingClientSecret);
            }
        }

        match Url::parse(&self.oauth_access_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(ConfigError::InvalidOAuthAccessUrl {
                    value: self.oauth_access_url.clone(),
                });
            }
        }

        if self.install_timeout_seconds == 0 {
            return Err(ConfigError::InvalidInstallTimeout {
                value: self.install_timeout_seconds,
            });
        }

        if self.signature_tolerance_seconds == Some(0) {
            return Err(ConfigError::InvalidSignatureTolerance { value: 0 });
        }

        if self.max_body_bytes == 0 {
            return Err(ConfigError::InvalidMaxBodyBytes {
                value: self.max_body_bytes,
            });
        }

        for token in &self.tokens {
            if token.workspace_id.is_empty() || token.token.is_empty() {
                return Err(ConfigError::InvalidTokenEntry {
                    entry: token.workspace_id.clone(),
                });
            }
        }

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_app_name() -> String {
    "Slack App".to_string()
}

fn default_oauth_access_url() -> String {
    "https://slack.com/api/oauth.v2.access".to_string()
}

fn default_install_timeout_seconds() -> u64 {
    10
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("route prefix cannot be empty; set SLACKHOOK_ROUTE_PREFIX")]
    MissingRoutePrefix,
    #[error("route prefix '{value}' may only contain letters, digits, '-', '_' and '/'")]
    InvalidRoutePrefix { value: String },
    #[error("signing secret is missing; set SLACKHOOK_SIGNING_SECRET")]
    MissingSigningSecret,
    #[error("client id is missing; set SLACKHOOK_CLIENT_ID")]
    MissingClientId,
    #[error("client secret is missing; set SLACKHOOK_CLIENT_SECRET")]
    MissingClientSecret,
    #[error("oauth access url '{value}' must be an absolute http(s) url")]
    InvalidOAuthAccessUrl { value: String },
    #[error("install timeout must be positive, got {value}")]
    InvalidInstallTimeout { value: u64 },
    #[error("signature tolerance must be positive when set, got {value}")]
    InvalidSignatureTolerance { value: u64 },
    #[error("max body size must be positive, got {value}")]
    InvalidMaxBodyBytes { value: usize },
    #[error("invalid workspace token entry '{entry}'; expected WORKSPACE_ID:TOKEN")]
    InvalidTokenEntry { entry: String },
}

fn is_valid_route_prefix(prefix: &str) -> bool {
    prefix.split('/').all(|segment| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}

/// Parses `T1:xoxb-1,T2:xoxb-2` into workspace tokens.
fn parse_token_list(raw: &str) -> Result<Vec<WorkspaceToken>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((workspace, token)) if !workspace.trim().is_empty() && !token.trim().is_empty() => {
                Ok(WorkspaceToken::new(workspace.trim(), token.trim()))
            }
            _ => Err(ConfigError::InvalidTokenEntry {
                entry: entry.split(':').next().unwrap_or_default().to_string(),
            }),
        })
        .collect()
}

/// Loads configuration using layered `.env` files and `SLACKHOOK_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let api_bind_addr = layered
            .remove("API_BIND_ADDR")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_api_bind_addr);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let app_name = layered
            .remove("APP_NAME")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(default_app_name);
        let route_prefix = layered
            .remove("ROUTE_PREFIX")
            .map(|v| v.trim().trim_matches('/').to_string())
            .unwrap_or_default();

        let client_id = layered
            .remove("CLIENT_ID")
            .map(|v| v.trim().to_string())
            .unwrap_or_default();
        let client_secret = layered
            .remove("CLIENT_SECRET")
            .map(|v| v.trim().to_string())
            .unwrap_or_default();
        let signing_secret = layered
            .remove("SIGNING_SECRET")
            .map(|v| v.trim().to_string())
            .unwrap_or_default();

        let tokens = match layered.remove("TOKENS") {
            Some(raw) => parse_token_list(&raw)?,
            None => Vec::new(),
        };

        let oauth_access_url = layered
            .remove("OAUTH_ACCESS_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_oauth_access_url);
        let install_timeout_seconds = layered
            .remove("INSTALL_TIMEOUT_SECONDS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_install_timeout_seconds);
        let signature_tolerance_seconds = layered
            .remove("SIGNATURE_TOLERANCE_SECONDS")
            .and_then(|v| v.parse().ok());
        let max_body_bytes = layered
            .remove("MAX_BODY_BYTES")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_max_body_bytes);

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            app_name,
            route_prefix,
            client_id,
            client_secret,
            signing_secret,
            tokens,
            oauth_access_url,
            install_timeout_seconds,
            signature_tolerance_seconds,
            max_body_bytes,
        };

        config.validate()?;

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var(format!("{ENV_PREFIX}PROFILE"))
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
