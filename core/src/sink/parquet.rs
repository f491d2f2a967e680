use arrow::datatypes::SchemaRef;
use async_trait::async_trait;
use std::mem;
use std::sync::Arc;

use crate::config::ParquetConfig;
use crate::convert::SchemaConverter;
use crate::errors::{Result, SinkError};
use crate::record::StructuredRecord;
use crate::sink::encoder::EncoderFactory;
use crate::sink::{RecordSink, WriterState};
use crate::storage::Storage;
use crate::telemetry::SinkEvents;

/// Buffered Parquet sink for one destination.
///
/// The writer handle is opened lazily on the first record, because the
/// destination alone carries no schema. Once open, the sink is bound to that
/// schema for its whole life; close releases the handle at most once and
/// uploads the finished file to storage.
pub struct ParquetRecordSink {
    destination: String,
    config: ParquetConfig,
    converter: Arc<dyn SchemaConverter>,
    storage: Arc<dyn Storage>,
    encoders: Arc<dyn EncoderFactory>,
    events: Arc<dyn SinkEvents>,
    state: WriterState,
    records_written: u64,
}

impl ParquetRecordSink {
    pub fn new(
        destination: impl Into<String>,
        config: ParquetConfig,
        converter: Arc<dyn SchemaConverter>,
        storage: Arc<dyn Storage>,
        encoders: Arc<dyn EncoderFactory>,
        events: Arc<dyn SinkEvents>,
    ) -> Self {
        Self {
            destination: destination.into(),
            config,
            converter,
            storage,
            encoders,
            events,
            state: WriterState::Unopened,
            records_written: 0,
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Schema the writer handle is bound to, once open.
    pub fn bound_schema(&self) -> Option<&SchemaRef> {
        match &self.state {
            WriterState::Open { schema, .. } => Some(schema),
            _ => None,
        }
    }

    async fn open_writer(&mut self, record: &StructuredRecord) -> Result<()> {
        let init_err = |reason: String| SinkError::Initialization {
            destination: self.destination.clone(),
            reason,
        };

        let schema = self
            .converter
            .to_target_schema(&record.schema)
            .map_err(|e| init_err(e.to_string()))?;

        self.storage
            .prepare(&self.destination)
            .await
            .map_err(|e| init_err(e.to_string()))?;

        let encoder = self
            .encoders
            .open(schema.clone(), &self.config)
            .map_err(|e| init_err(e.to_string()))?;

        self.events.writer_opened(&self.destination);
        self.state = WriterState::Open { encoder, schema };
        Ok(())
    }
}

#[async_trait]
impl RecordSink for ParquetRecordSink {
    async fn write(&mut self, record: StructuredRecord) -> Result<()> {
        if self.state.is_closed() {
            return Err(SinkError::Write {
                reason: format!("sink for '{}' is closed", self.destination),
            });
        }

        if !self.state.is_open() {
            self.open_writer(&record).await?;
        }

        let row = self
            .converter
            .to_target_value(&record.schema, &record.value)
            .map_err(|e| SinkError::Write {
                reason: e.to_string(),
            })?;

        let WriterState::Open { encoder, .. } = &mut self.state else {
            return Err(SinkError::Write {
                reason: format!("writer for '{}' is not open", self.destination),
            });
        };
        encoder.append(row).map_err(|e| SinkError::Write {
            reason: e.to_string(),
        })?;

        self.records_written += 1;
        self.events.record_written(&self.destination);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        match mem::replace(&mut self.state, WriterState::Closed) {
            // never created a writer, never create an empty file
            WriterState::Unopened | WriterState::Closed => Ok(()),
            WriterState::Open { encoder, .. } => {
                let close_err = |reason: String| SinkError::Close {
                    destination: self.destination.clone(),
                    reason,
                };

                let bytes = encoder.finish().map_err(|e| close_err(e.to_string()))?;
                let size = bytes.len() as u64;

                self.storage
                    .put(&self.destination, bytes)
                    .await
                    .map_err(|e| close_err(e.to_string()))?;

                self.events
                    .writer_closed(&self.destination, size, self.records_written);
                Ok(())
            }
        }
    }

    async fn commit(&mut self) -> Result<()> {
        // storage writes are durable once close() returns; nothing to finalize
        Ok(())
    }
}
