// src/error.rs
//! Error taxonomy of the worker.
//!
//! Only `ConfigError` is fatal, and only at startup. Everything else is
//! recovered where it happens: a failed source is skipped for one cycle, a
//! malformed feed yields zero articles, a failed delivery is logged.

use std::path::PathBuf;

/// Why a single source could not be fetched this cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchCause {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("reading body failed: {0}")]
    Body(String),

    #[error("feed exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("fetching {source_name} ({url}) failed: {cause}")]
pub struct FetchError {
    pub source_name: String,
    pub url: String,
    #[source]
    pub cause: FetchCause,
}

impl FetchError {
    pub fn new(source_name: impl Into<String>, url: impl Into<String>, cause: FetchCause) -> Self {
        Self {
            source_name: source_name.into(),
            url: url.into(),
            cause,
        }
    }

    /// Classify a transport error from reqwest.
    pub fn from_reqwest(source_name: &str, url: &str, e: &reqwest::Error) -> Self {
        let cause = if e.is_timeout() {
            FetchCause::Timeout
        } else if let Some(status) = e.status() {
            FetchCause::Status(status.as_u16())
        } else if e.is_body() || e.is_decode() {
            FetchCause::Body(e.to_string())
        } else {
            FetchCause::Connect(e.to_string())
        };
        Self::new(source_name, url, cause)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("feed body is empty")]
    Empty,

    #[error("content is neither RSS nor Atom")]
    UnknownFormat,

    #[error("malformed feed XML: {0}")]
    Xml(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("webhook answered HTTP {0}")]
    Status(u16),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config from {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
