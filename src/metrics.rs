// src/metrics.rs
use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if one is already installed.
    pub fn init() -> Result<Self, BuildError> {
        // Default buckets; histograms render as summaries.
        let handle = PrometheusBuilder::new().install_recorder()?;
        describe_metrics();
        Ok(Self { handle })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Register descriptions once per process.
pub fn describe_metrics() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("worker_cycles_total", "Collection cycles completed");
        describe_counter!("worker_articles_total", "Articles extracted across all cycles");
        describe_counter!("worker_fetch_errors_total", "Sources skipped because the fetch failed");
        describe_counter!("worker_matches_total", "Keyword matches found");
        describe_counter!("worker_notifications_total", "Notifications emitted");
        describe_counter!(
            "worker_delivery_failures_total",
            "Notifications the webhook did not accept or the full queue dropped"
        );
        describe_histogram!("worker_cycle_ms", Unit::Milliseconds, "Wall time of one cycle");
        describe_histogram!("worker_fetch_ms", Unit::Milliseconds, "Wall time of one feed fetch");
        describe_histogram!("worker_parse_ms", Unit::Milliseconds, "Wall time of one feed extraction");
        describe_gauge!(
            "worker_last_collected_ts",
            Unit::Seconds,
            "Unix time of the last aggregated cycle start"
        );
    });
}
