use std::sync::Arc;

use crate::config::{ParquetConfig, SinkConfig};
use crate::convert::ArrowConverter;
use crate::errors::{Result, SinkError};
use crate::record::RecordSchema;
use crate::sink::RecordSink;
use crate::sink::encoder::ParquetEncoderFactory;
use crate::sink::parquet::ParquetRecordSink;
use crate::storage::Storage;
use crate::telemetry::{SinkEvents, TracingEvents};

/// A storage format plugin: hands out record writers for destinations and
/// names the file extension the framework uses for output files. Capabilities
/// a format variant does not implement must surface as
/// [`SinkError::Unsupported`], never as silent no-ops.
pub trait SinkFormat: Send + Sync {
    fn extension(&self) -> &'static str;

    fn record_writer(&self, destination: &str) -> Result<Box<dyn RecordSink>>;

    /// Read the schema back from a previously written file.
    fn schema_reader(&self, destination: &str) -> Result<RecordSchema>;

    /// Register the destination with an external metastore/catalog.
    fn register_in_catalog(&self, destination: &str) -> Result<()>;
}

/// Parquet format plugin. One shared converter (and thus one bounded schema
/// cache) serves every writer this format hands out.
pub struct ParquetFormat {
    converter: Arc<ArrowConverter>,
    storage: Arc<dyn Storage>,
    config: ParquetConfig,
    events: Arc<dyn SinkEvents>,
}

impl ParquetFormat {
    pub fn new(config: &SinkConfig, storage: Arc<dyn Storage>) -> Self {
        Self {
            converter: Arc::new(ArrowConverter::new(config.schema_cache_size)),
            storage,
            config: config.parquet.clone(),
            events: Arc::new(TracingEvents),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn SinkEvents>) -> Self {
        self.events = events;
        self
    }
}

impl SinkFormat for ParquetFormat {
    fn extension(&self) -> &'static str {
        ".parquet"
    }

    fn record_writer(&self, destination: &str) -> Result<Box<dyn RecordSink>> {
        Ok(Box::new(ParquetRecordSink::new(
            destination,
            self.config.clone(),
            self.converter.clone(),
            self.storage.clone(),
            Arc::new(ParquetEncoderFactory),
            self.events.clone(),
        )))
    }

    fn schema_reader(&self, _destination: &str) -> Result<RecordSchema> {
        Err(SinkError::Unsupported {
            operation: "reading schemas back from blob storage".to_string(),
        })
    }

    fn register_in_catalog(&self, _destination: &str) -> Result<()> {
        Err(SinkError::Unsupported {
            operation: "catalog integration".to_string(),
        })
    }
}
