pub mod encoder;
pub mod parquet;

use async_trait::async_trait;

use crate::errors::Result;
use crate::record::StructuredRecord;
use crate::sink::encoder::RecordEncoder;

/// The contract a record sink exposes to the surrounding delivery framework.
/// One instance owns one destination; the framework serializes calls per
/// instance.
#[async_trait]
pub trait RecordSink: Send {
    /// Append one record. The first call derives the target schema from the
    /// record and opens the underlying writer.
    async fn write(&mut self, record: StructuredRecord) -> Result<()>;

    /// Flush and release the writer. A no-op when no record was ever written,
    /// and idempotent after a successful close.
    async fn close(&mut self) -> Result<()>;

    /// Finalize visibility of the written file. The storage backends here are
    /// durable once `close` returns, so this is a no-op.
    async fn commit(&mut self) -> Result<()>;
}

/// Lifecycle of the writer handle owned by a sink.
pub enum WriterState {
    Unopened,
    Open {
        encoder: Box<dyn RecordEncoder>,
        schema: arrow::datatypes::SchemaRef,
    },
    Closed,
}

impl WriterState {
    pub fn is_open(&self) -> bool {
        matches!(self, WriterState::Open { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, WriterState::Closed)
    }
}
