pub mod config;
pub mod convert;
pub mod errors;
pub mod format;
pub mod record;
pub mod sink;
pub mod storage;
pub mod telemetry;

pub use config::SinkConfig;
pub use errors::{Result, SinkError};
pub use format::{ParquetFormat, SinkFormat};
pub use record::{RecordSchema, SchemaField, StructuredRecord};
pub use sink::RecordSink;
pub use storage::Storage;
