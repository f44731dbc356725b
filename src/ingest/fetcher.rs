// src/ingest/fetcher.rs
use async_trait::async_trait;
use metrics::histogram;
use reqwest::Client;
use std::time::{Duration, Instant};

use crate::error::{FetchCause, FetchError};
use crate::ingest::types::FeedSource;

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// One GET per call, no retries. A failure only skips this source for the
    /// current cycle; the next tick is the retry.
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<u8>, FetchError>;
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub max_feed_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("news-worker/", env!("CARGO_PKG_VERSION")).to_string(),
            max_feed_bytes: 10 * 1024 * 1024,
        }
    }
}

/// reqwest-backed fetcher with a client-level timeout covering connect,
/// headers and body.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    max_feed_bytes: usize,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self {
            client,
            max_feed_bytes: config.max_feed_bytes,
        })
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<u8>, FetchError> {
        let t0 = Instant::now();
        let fail = |cause: FetchCause| FetchError::new(&source.name, &source.url, cause);

        let mut resp = self
            .client
            .get(&source.url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&source.name, &source.url, &e))?;

        // Non-2xx: the response is dropped here, which releases the connection.
        let status = resp.status();
        if !status.is_success() {
            return Err(fail(FetchCause::Status(status.as_u16())));
        }

        let too_large = || {
            fail(FetchCause::TooLarge {
                limit: self.max_feed_bytes,
            })
        };
        let declared = resp.content_length().map(|len| len as usize);
        if declared.is_some_and(|len| len > self.max_feed_bytes) {
            return Err(too_large());
        }

        // Chunked bodies carry no length; stop as soon as the cap is crossed.
        let mut body = Vec::with_capacity(declared.unwrap_or(0));
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| FetchError::from_reqwest(&source.name, &source.url, &e))?
        {
            if body.len() + chunk.len() > self.max_feed_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        histogram!("worker_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        tracing::debug!(
            target: "ingest",
            source = %source.name,
            bytes = body.len(),
            status = status.as_u16(),
            "fetched feed"
        );
        Ok(body)
    }
}
