//! news-worker binary entrypoint.
//! Loads configuration, wires the pipeline and runs the scheduler until
//! SIGINT/SIGTERM (or a single cycle with `--once`).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_worker::api::{self, AppState};
use news_worker::config::WorkerConfig;
use news_worker::ingest::clock::{Clock, IntervalTicker, SystemClock};
use news_worker::ingest::extract::FeedExtractor;
use news_worker::ingest::fetcher::HttpFetcher;
use news_worker::ingest::scheduler::{shutdown_channel, Scheduler, StatusHandle};
use news_worker::ingest::store::JsonFileSink;
use news_worker::ingest::Collector;
use news_worker::metrics::Metrics;
use news_worker::monitor::KeywordMonitor;
use news_worker::notify::{Notifier, NotifyHandle, WebhookTransport};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Parser)]
#[command(name = "news-worker", version, about = "Periodic news collection worker")]
struct Args {
    /// TOML config file (overrides $WORKER_CONFIG_PATH and config/worker.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Poll interval in seconds
    #[arg(long)]
    interval: Option<u64>,

    /// Run one collection cycle and exit
    #[arg(long)]
    once: bool,

    /// Do not start the status server
    #[arg(long)]
    no_status: bool,
}

/// `LOG_FORMAT=json` switches to JSON lines; filter from `RUST_LOG`.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("news_worker=info,warn"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

fn load_config(args: &Args) -> anyhow::Result<WorkerConfig> {
    let mut cfg = WorkerConfig::load(args.config.as_deref())?;
    if let Some(secs) = args.interval {
        cfg.poll_interval_secs = secs;
    }
    cfg.validate()?;
    Ok(cfg)
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "installing Ctrl-C handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "installing SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = Args::parse();
    let cfg = match load_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "refusing to start with invalid configuration");
            return Err(e);
        }
    };

    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = %e, "prometheus recorder not installed");
            None
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let fetcher = Arc::new(HttpFetcher::new(&cfg.fetch_config()).context("building HTTP client")?);
    let extractor = Arc::new(FeedExtractor::new(Arc::clone(&clock)));
    let sink = Arc::new(JsonFileSink::in_dir(&cfg.data_dir));

    let mut notifier = Notifier::new(Arc::clone(&clock));
    match cfg.resolved_notify_endpoint()? {
        Some(url) => {
            tracing::info!(endpoint = %url, "notification webhook enabled");
            let transport = WebhookTransport::new(url)
                .with_timeout(cfg.notify_timeout())
                .with_attempts(cfg.notify_attempts);
            notifier = notifier.with_transport(Arc::new(transport));
        }
        None => tracing::info!("notification webhook disabled, log only"),
    }
    let notify = NotifyHandle::spawn(notifier);

    let collector = Arc::new(Collector::new(
        fetcher,
        extractor,
        sink,
        KeywordMonitor::new(&cfg.keywords),
        notify.clone(),
        Arc::clone(&clock),
    ));
    let registry = cfg.registry();

    tracing::info!(
        api_base_url = %cfg.api_base_url,
        interval_secs = cfg.poll_interval_secs,
        data_dir = %cfg.data_dir.display(),
        sources = registry.enabled_count(),
        keywords = cfg.keywords.len(),
        "news worker configured"
    );

    if args.once {
        let result = collector.run_cycle(&registry).await;
        if !notify.flush(DRAIN_TIMEOUT).await {
            tracing::warn!("notification queue not drained before exit");
        }
        tracing::info!(
            articles = result.articles.len(),
            failed_sources = result.per_source_errors.len(),
            matches = result.matches.len(),
            "single cycle done"
        );
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let status = StatusHandle::new(clock.now());

    let status_server = match cfg.status_socket() {
        Some(addr) if !args.no_status => {
            let mut state = AppState::new(status.clone(), cfg.api_base_url.clone());
            if let Some(m) = &metrics {
                state = state.with_metrics(m.handle.clone());
            }
            let rx = shutdown_rx.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = api::serve(addr, state, rx).await {
                    tracing::error!(target: "status", error = %e, "status server failed");
                }
            }))
        }
        _ => None,
    };

    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("termination signal received");
        let _ = shutdown_tx.send(true);
    });

    let scheduler = Scheduler::new(
        collector,
        registry,
        IntervalTicker::new(cfg.poll_interval()),
        shutdown_rx,
    )
    .with_status(status)
    .with_drain_timeout(DRAIN_TIMEOUT);

    let final_status = scheduler.run().await;

    if let Some(handle) = status_server {
        let _ = handle.await;
    }
    tracing::info!(
        cycles = final_status.cycles_completed,
        "news worker exited"
    );
    Ok(())
}
