use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use blobsink_core::config::SinkConfig;
use blobsink_core::format::{ParquetFormat, SinkFormat};
use blobsink_core::record::{RecordSchema, SchemaField, StructuredRecord};
use blobsink_core::storage;
use blobsink_core::telemetry::{MetricsEvents, init_tracing};

/// One job: where the records come from, what they look like, and where the
/// file goes. The record schema is fixed per job, the way the surrounding
/// delivery framework would fix it per output file.
#[derive(Debug, Deserialize)]
struct JobConfig {
    sink: SinkConfig,
    schema: Vec<SchemaField>,
    input: String,
    destination: String,
}

impl JobConfig {
    fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job config from {}", path))?;
        let config: JobConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse job config from {}", path))?;
        Ok(config)
    }
}

/// Entry point for running one file-write job locally: reads JSON-lines
/// records and streams them through a Parquet sink bound to one destination.
#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config_path = std::env::args()
        .nth(1)
        .context("Usage: runner-local <job-config.yaml>")?;

    let job = JobConfig::from_file(&config_path)?;
    job.sink.validate().context("Invalid sink configuration")?;

    let storage = storage::from_config(&job.sink.storage).await?;
    let events = Arc::new(MetricsEvents::new());
    let format = ParquetFormat::new(&job.sink, storage).with_events(events.clone());

    let destination = format!("{}{}", job.destination, format.extension());
    let mut sink = format.record_writer(&destination)?;

    let schema = Arc::new(RecordSchema::new(job.schema.clone()));
    let file = tokio::fs::File::open(&job.input)
        .await
        .with_context(|| format!("Failed to open input file {}", job.input))?;
    let mut lines = BufReader::new(file).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value =
            serde_json::from_str(&line).context("Input line is not valid JSON")?;
        sink.write(StructuredRecord::new(schema.clone(), value))
            .await?;
    }

    sink.close().await?;
    sink.commit().await?;

    let metrics = events.snapshot();
    info!(
        "Wrote {} records ({} bytes) to '{}'",
        metrics.records_written, metrics.bytes_written, destination
    );

    Ok(())
}
