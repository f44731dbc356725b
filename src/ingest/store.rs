// src/ingest/store.rs
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::ingest::types::Article;

pub const NEWS_FILE: &str = "news.json";

#[async_trait]
pub trait ArticleSink: Send + Sync {
    /// Receives the full aggregate of one cycle, exactly once per cycle.
    async fn write_articles(&self, articles: &[Article]) -> Result<(), StoreError>;
}

/// Writes each cycle's aggregate to `<data_dir>/news.json`, replacing the
/// previous snapshot. Write goes to a temp file first, then renamed over.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(NEWS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ArticleSink for JsonFileSink {
    async fn write_articles(&self, articles: &[Article]) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(io_err(dir))?;
        }

        let data = serde_json::to_vec_pretty(articles)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &data).await.map_err(io_err(&tmp))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(io_err(&self.path))?;

        tracing::debug!(
            target: "ingest",
            path = %self.path.display(),
            articles = articles.len(),
            "snapshot written"
        );
        Ok(())
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError {
    let path = path.to_path_buf();
    move |source| StoreError::Io { path, source }
}

// --- Test helper ---
/// Records every call; can be told to fail.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub calls: std::sync::Mutex<Vec<Vec<Article>>>,
    pub fail: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Vec<Article>> {
        self.calls.lock().expect("sink mutex poisoned").clone()
    }
}

#[async_trait]
impl ArticleSink for MemorySink {
    async fn write_articles(&self, articles: &[Article]) -> Result<(), StoreError> {
        self.calls
            .lock()
            .expect("sink mutex poisoned")
            .push(articles.to_vec());
        if self.fail {
            return Err(StoreError::Io {
                path: PathBuf::from("<memory>"),
                source: std::io::Error::new(std::io::ErrorKind::Other, "sink configured to fail"),
            });
        }
        Ok(())
    }
}
