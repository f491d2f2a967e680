use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Structural type of a single record field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Utf8,
    Binary,
    Date32,
    TimestampMillisecond,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct SchemaField {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// Structural description of a batch of records: field names, types and
/// nullability. Immutable once observed for a destination; a sink instance
/// never rebinds to a different schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct RecordSchema {
    pub fields: Vec<SchemaField>,
}

impl RecordSchema {
    pub fn new(fields: Vec<SchemaField>) -> Self {
        Self { fields }
    }

    /// Stable identity of this schema, used to key the converter's
    /// schema cache.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// One logical unit of data with a value conforming to a [`RecordSchema`].
/// Consumed by exactly one write call.
#[derive(Debug, Clone)]
pub struct StructuredRecord {
    pub schema: Arc<RecordSchema>,
    pub value: Value,
}

impl StructuredRecord {
    pub fn new(schema: Arc<RecordSchema>, value: Value) -> Self {
        Self { schema, value }
    }
}
