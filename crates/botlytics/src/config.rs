//! 🔧 Dispatcher knobs, their defaults, and the things we refuse to start with.
//!
//! 🧠 Knowledge graph:
//! - [`DispatcherConfig`] is plain serde. Figment fills it (see `app_config`), tests build it
//!   by hand with [`DispatcherConfig::new`].
//! - [`DispatcherConfig::validate`] runs once, at construction. Nothing is re-checked later.
//! - [`ConfigError`] is the one typed error in the crate. Everything else is `anyhow`.

use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use crate::schema::is_known_field;

/// 💀 Configuration the dispatcher (or normalizer) will not run with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("💀 include and exclude are mutually exclusive; pick an allow-list or a deny-list")]
    IncludeAndExclude,

    #[error("💀 unknown field '{0}' in include/exclude")]
    UnknownField(String),

    #[error("💀 interval_ms must be greater than zero")]
    ZeroInterval,

    #[error("💀 request_timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("💀 endpoint '{endpoint}' is not a usable URL: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("💀 bot id must be non-zero")]
    ZeroBotId,
}

fn default_threshold() -> usize {
    10_000
}

fn default_interval_ms() -> u64 {
    10_000
}

fn default_log() -> bool {
    true
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

/// 📦 How, where and how often to ship records.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DispatcherConfig {
    /// 📡 Collector URL. Every batch is POSTed here.
    pub endpoint: String,
    /// Buffered-record count that triggers a flush.
    #[serde(default = "default_threshold")]
    pub threshold: usize,
    /// ⏱️ Timer flush period, in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Emit per-attempt and per-failure log lines.
    #[serde(default = "default_log")]
    pub log: bool,
    /// Allow-list of wire field names. Mutually exclusive with `exclude`.
    #[serde(default)]
    pub include: Option<Vec<String>>,
    /// Deny-list of wire field names. Mutually exclusive with `include`.
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// 🪣 Optional cap on buffered records. Past it, new records are dropped (and counted).
    #[serde(default)]
    pub max_buffered_records: Option<usize>,
}

impl DispatcherConfig {
    /// 🏗️ Defaults for everything but the endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            threshold: default_threshold(),
            interval_ms: default_interval_ms(),
            log: default_log(),
            include: None,
            exclude: None,
            request_timeout_ms: default_request_timeout_ms(),
            max_buffered_records: None,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// ✅ All-or-nothing check. The first problem found is the one reported.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint_url()?;
        if self.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        match (&self.include, &self.exclude) {
            (Some(_), Some(_)) => Err(ConfigError::IncludeAndExclude),
            (Some(names), None) | (None, Some(names)) => check_field_names(names),
            (None, None) => Ok(()),
        }
    }

    /// 📡 The endpoint, parsed. Only http(s) is accepted.
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason,
        };
        let url = Url::parse(&self.endpoint).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid(format!("scheme '{other}' is not http or https"))),
        }
    }
}

fn check_field_names(names: &[String]) -> Result<(), ConfigError> {
    match names.iter().find(|name| !is_known_field(name)) {
        Some(unknown) => Err(ConfigError::UnknownField(unknown.clone())),
        None => Ok(()),
    }
}
