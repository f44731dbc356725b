// src/config/worker.rs
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use crate::error::{ConfigError, ConfigResult};
use crate::ingest::fetcher::FetchConfig;
use crate::ingest::registry::{default_sources, SourceRegistry};
use crate::ingest::types::FeedSource;
use crate::ingest::watchlist::{clean_keywords, load_keywords_from};

pub const ENV_CONFIG_PATH: &str = "WORKER_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/worker.toml";

fn default_keywords() -> Vec<String> {
    ["AI", "breaking", "update", "announcement"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Startup configuration. Built once, validated, then passed by value into
/// the components; nothing reads it again at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub api_base_url: String,
    pub poll_interval_secs: u64,
    /// Absolute URL, or a path resolved against `api_base_url`. `None` or
    /// empty disables outbound delivery.
    pub notify_endpoint: Option<String>,
    pub data_dir: PathBuf,
    /// Empty disables the status server.
    pub status_addr: String,
    pub fetch_timeout_secs: u64,
    pub notify_timeout_secs: u64,
    pub notify_attempts: u8,
    pub max_feed_bytes: usize,
    pub user_agent: String,
    pub keywords: Vec<String>,
    /// Replaces `keywords` when set.
    pub keywords_path: Option<PathBuf>,
    pub sources: Vec<FeedSource>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let fetch = FetchConfig::default();
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            poll_interval_secs: 15 * 60,
            notify_endpoint: Some("/api/notify".to_string()),
            data_dir: PathBuf::from("./data"),
            status_addr: "0.0.0.0:9090".to_string(),
            fetch_timeout_secs: fetch.timeout.as_secs(),
            notify_timeout_secs: 5,
            notify_attempts: 2,
            max_feed_bytes: fetch.max_feed_bytes,
            user_agent: fetch.user_agent,
            keywords: default_keywords(),
            keywords_path: None,
            sources: default_sources(),
        }
    }
}

impl WorkerConfig {
    pub fn from_toml_str(s: &str, origin: &Path) -> ConfigResult<Self> {
        toml::from_str(s).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Defaults, then the config file (with its `keywords_path`), then
    /// environment overrides. The file is:
    /// 1) `explicit` path (from `--config`)
    /// 2) `$WORKER_CONFIG_PATH` (must exist)
    /// 3) `config/worker.toml` when present
    ///
    /// Not validated yet; call [`validate`](Self::validate) after CLI overrides.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<Self> {
        let mut cfg = match explicit {
            Some(p) => Self::load_from(p)?,
            None => match env::var(ENV_CONFIG_PATH) {
                Ok(p) => Self::load_from(Path::new(&p))?,
                Err(_) => {
                    let fallback = Path::new(DEFAULT_CONFIG_PATH);
                    if fallback.exists() {
                        Self::load_from(fallback)?
                    } else {
                        Self::default()
                    }
                }
            },
        };
        // keywords_path belongs to the file layer; WATCH_KEYWORDS still wins
        if let Some(path) = &cfg.keywords_path {
            cfg.keywords = load_keywords_from(path)?;
        }
        cfg.apply_env_from(|k| env::var(k).ok())?;
        Ok(cfg)
    }

    /// Apply environment overrides through `lookup`, so tests need not touch
    /// the process environment.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("NEWS_API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = lookup("POLL_INTERVAL_SECS") {
            self.poll_interval_secs = v.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("POLL_INTERVAL_SECS is not a number: {v:?}"))
            })?;
        }
        if let Some(v) = lookup("NOTIFY_ENDPOINT") {
            self.notify_endpoint = Some(v);
        }
        if let Some(v) = lookup("DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("STATUS_ADDR") {
            self.status_addr = v;
        }
        if let Some(v) = lookup("WATCH_KEYWORDS") {
            self.keywords = v.split(',').map(str::to_string).collect();
        }
        Ok(())
    }

    /// Check every field and normalize the keyword list.
    pub fn validate(&mut self) -> ConfigResult<()> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.poll_interval_secs == 0 {
            return invalid("poll_interval_secs must be > 0".into());
        }
        if self.fetch_timeout_secs == 0 || self.notify_timeout_secs == 0 {
            return invalid("timeouts must be > 0".into());
        }
        if self.notify_attempts == 0 {
            return invalid("notify_attempts must be >= 1".into());
        }
        if self.max_feed_bytes == 0 {
            return invalid("max_feed_bytes must be > 0".into());
        }
        Url::parse(&self.api_base_url)
            .map_err(|e| ConfigError::Invalid(format!("api_base_url {:?}: {e}", self.api_base_url)))?;
        self.resolved_notify_endpoint()?;

        if !self.status_addr.trim().is_empty() {
            self.status_addr.trim().parse::<SocketAddr>().map_err(|e| {
                ConfigError::Invalid(format!("status_addr {:?}: {e}", self.status_addr))
            })?;
        }

        let mut names = HashSet::new();
        for s in &self.sources {
            if s.name.trim().is_empty() {
                return invalid(format!("source with url {:?} has no name", s.url));
            }
            if !names.insert(s.name.as_str()) {
                return invalid(format!("duplicate source name {:?}", s.name));
            }
            Url::parse(&s.url)
                .map_err(|e| ConfigError::Invalid(format!("source {:?} url {:?}: {e}", s.name, s.url)))?;
        }

        self.keywords = clean_keywords(std::mem::take(&mut self.keywords));
        if self.keywords.is_empty() {
            tracing::warn!("no watch keywords configured; keyword alerts are off");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            timeout: Duration::from_secs(self.fetch_timeout_secs),
            user_agent: self.user_agent.clone(),
            max_feed_bytes: self.max_feed_bytes,
        }
    }

    pub fn registry(&self) -> SourceRegistry {
        SourceRegistry::new(self.sources.clone())
    }

    pub fn status_socket(&self) -> Option<SocketAddr> {
        self.status_addr.trim().parse().ok()
    }

    /// The absolute webhook URL, or `None` when delivery is disabled.
    pub fn resolved_notify_endpoint(&self) -> ConfigResult<Option<String>> {
        let Some(raw) = self.notify_endpoint.as_deref().map(str::trim) else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }
        let url = match Url::parse(raw) {
            Ok(u) => u,
            Err(_) => {
                let base = Url::parse(&self.api_base_url).map_err(|e| {
                    ConfigError::Invalid(format!("api_base_url {:?}: {e}", self.api_base_url))
                })?;
                base.join(raw)
                    .map_err(|e| ConfigError::Invalid(format!("notify_endpoint {raw:?}: {e}")))?
            }
        };
        Ok(Some(url.to_string()))
    }
}
