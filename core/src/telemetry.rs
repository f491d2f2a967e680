use serde::Serialize;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blobsink=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Observability hook injected into the sink's write path, so the core stays
/// free of global logging side effects.
pub trait SinkEvents: Send + Sync {
    fn writer_opened(&self, destination: &str);
    fn record_written(&self, destination: &str);
    fn writer_closed(&self, destination: &str, bytes: u64, records: u64);
}

/// Default hook: structured logs via `tracing`.
pub struct TracingEvents;

impl SinkEvents for TracingEvents {
    fn writer_opened(&self, destination: &str) {
        tracing::info!("Opening record writer for: {}", destination);
    }

    fn record_written(&self, destination: &str) {
        tracing::trace!("Appended record to: {}", destination);
    }

    fn writer_closed(&self, destination: &str, bytes: u64, records: u64) {
        tracing::info!(
            "Closed record writer for: {} ({} records, {} bytes)",
            destination,
            records,
            bytes
        );
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct SinkMetrics {
    pub records_written: usize,
    pub files_written: usize,
    pub bytes_written: u64,
}

/// Hook that accumulates counters, for runners and tests that want numbers
/// instead of log lines.
#[derive(Default)]
pub struct MetricsEvents {
    metrics: Mutex<SinkMetrics>,
}

impl MetricsEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> SinkMetrics {
        self.metrics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl SinkEvents for MetricsEvents {
    fn writer_opened(&self, _destination: &str) {}

    fn record_written(&self, _destination: &str) {
        let mut metrics = self.metrics.lock().unwrap_or_else(|e| e.into_inner());
        metrics.records_written += 1;
    }

    fn writer_closed(&self, _destination: &str, bytes: u64, _records: u64) {
        let mut metrics = self.metrics.lock().unwrap_or_else(|e| e.into_inner());
        metrics.files_written += 1;
        metrics.bytes_written += bytes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_events_accumulate() {
        let events = MetricsEvents::new();

        events.writer_opened("out/part-001");
        events.record_written("out/part-001");
        events.record_written("out/part-001");
        events.writer_closed("out/part-001", 128, 2);

        let metrics = events.snapshot();
        assert_eq!(metrics.records_written, 2);
        assert_eq!(metrics.files_written, 1);
        assert_eq!(metrics.bytes_written, 128);
    }
}
