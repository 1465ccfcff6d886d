use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::error::{ChatStreamError, CoreResult};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HttpCfg {
    /// TCP connect timeout in milliseconds (default 5000ms)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Total request timeout in milliseconds (default 300000ms). Covers the
    /// whole streamed body, so it is much longer than a plain JSON call.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Optional per-host idle connection pool cap (None = reqwest default)
    #[serde(default)]
    pub pool_max_idle_per_host: Option<usize>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            pool_max_idle_per_host: None,
            user_agent: default_user_agent(),
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}
fn default_request_timeout_ms() -> u64 {
    300_000
}
fn default_user_agent() -> String {
    "chatstream/0.1".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DecoderCfg {
    /// Accept the legacy-typed, legacy-status and provider-native dialects.
    /// Turning this off drops every frame that is not in the current dialect.
    #[serde(default = "default_legacy_dialects")]
    pub legacy_dialects: bool,
    /// HTTP status that means the session expired.
    #[serde(default = "default_auth_expiry_status")]
    pub auth_expiry_status: u16,
    /// Where the navigator is sent after an auth expiry.
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Message used for in-band errors that carry none.
    #[serde(default = "default_error_message")]
    pub default_error_message: String,
}

impl Default for DecoderCfg {
    fn default() -> Self {
        Self {
            legacy_dialects: default_legacy_dialects(),
            auth_expiry_status: default_auth_expiry_status(),
            login_path: default_login_path(),
            default_error_message: default_error_message(),
        }
    }
}

fn default_legacy_dialects() -> bool {
    true
}
fn default_auth_expiry_status() -> u16 {
    401
}
fn default_login_path() -> String {
    "/login".to_string()
}
fn default_error_message() -> String {
    "Something went wrong, please try again.".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Config {
    /// HTTP client configuration (timeouts, pooling). Missing → defaults.
    #[serde(default)]
    pub http: HttpCfg,
    #[serde(default)]
    pub decoder: DecoderCfg,
}

impl Config {
    /// Load a Config from a file path (JSON or TOML by extension). If the
    /// extension is missing or unrecognized, try JSON first, then TOML.
    pub fn from_path<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(ChatStreamError::from)?;
        let s = std::str::from_utf8(&bytes).map_err(|e| ChatStreamError::Other(e.into()))?;
        let cfg: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                serde_json::from_str::<Self>(s).map_err(|e| ChatStreamError::Config(e.to_string()))?
            }
            Some("toml") => {
                toml::from_str::<Self>(s).map_err(|e| ChatStreamError::Config(e.to_string()))?
            }
            _ => serde_json::from_str::<Self>(s)
                .map_err(|e| ChatStreamError::Config(e.to_string()))
                .or_else(|_| {
                    toml::from_str::<Self>(s).map_err(|e| ChatStreamError::Config(e.to_string()))
                })?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if !(400..=599).contains(&self.decoder.auth_expiry_status) {
            return Err(ChatStreamError::Validation(format!(
                "auth_expiry_status must be an HTTP error status, got {}",
                self.decoder.auth_expiry_status
            )));
        }
        if self.decoder.login_path.trim().is_empty() {
            return Err(ChatStreamError::Validation(
                "login_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
