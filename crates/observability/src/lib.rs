use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Pipeline counters. Each update is also forwarded to the `metrics` facade so
/// an installed recorder can export it.
#[derive(Debug, Default)]
pub struct AppMetrics {
    messages_total: AtomicU64,
    commands_total: AtomicU64,
    priced_total: AtomicU64,
    extraction_failures_total: AtomicU64,
    validation_failures_total: AtomicU64,
    prediction_failures_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub messages_total: u64,
    pub commands_total: u64,
    pub priced_total: u64,
    pub extraction_failures_total: u64,
    pub validation_failures_total: u64,
    pub prediction_failures_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_message(&self) {
        self.messages_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("skyprice_messages_total").increment(1);
    }

    pub fn inc_command(&self, locale: &'static str) {
        self.commands_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("skyprice_commands_total", "locale" => locale).increment(1);
    }

    pub fn inc_priced(&self) {
        self.priced_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("skyprice_priced_total").increment(1);
    }

    pub fn inc_extraction_failure(&self) {
        self.extraction_failures_total
            .fetch_add(1, Ordering::Relaxed);
        metrics::counter!("skyprice_extraction_failures_total").increment(1);
    }

    pub fn inc_validation_failure(&self, check: &'static str) {
        self.validation_failures_total
            .fetch_add(1, Ordering::Relaxed);
        metrics::counter!("skyprice_validation_failures_total", "check" => check).increment(1);
    }

    pub fn inc_prediction_failure(&self) {
        self.prediction_failures_total
            .fetch_add(1, Ordering::Relaxed);
        metrics::counter!("skyprice_prediction_failures_total").increment(1);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        metrics::histogram!("skyprice_pipeline_latency_seconds").record(duration.as_secs_f64());
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let messages = self.messages_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            messages_total: messages,
            commands_total: self.commands_total.load(Ordering::Relaxed),
            priced_total: self.priced_total.load(Ordering::Relaxed),
            extraction_failures_total: self.extraction_failures_total.load(Ordering::Relaxed),
            validation_failures_total: self.validation_failures_total.load(Ordering::Relaxed),
            prediction_failures_total: self.prediction_failures_total.load(Ordering::Relaxed),
            avg_latency_millis: if messages == 0 {
                0.0
            } else {
                latency as f64 / messages as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,skyprice_api=info,skyprice_agents=info,skyprice_extraction=info,skyprice_pricing=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}
