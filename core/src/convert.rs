use arrow::array::{
    ArrayRef, BinaryArray, BooleanArray, Date32Array, Float32Array, Float64Array, Int8Array,
    Int16Array, Int32Array, Int64Array, StringArray, TimestampMillisecondArray, UInt8Array,
    UInt16Array, UInt32Array, UInt64Array,
};
use arrow::datatypes::{DataType as ArrowDataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::errors::ConversionError;
use crate::record::{DataType, RecordSchema};

/// One record converted into the target-schema representation: values aligned
/// to the schema's field order.
#[derive(Debug, Clone)]
pub struct EncodedRow {
    pub values: Vec<Option<Value>>,
}

/// Conversion from the abstract record schema/value into the columnar target
/// representation. Deterministic and side-effect-free, so implementations can
/// be substituted with trivial fakes in tests.
pub trait SchemaConverter: Send + Sync {
    fn to_target_schema(&self, schema: &RecordSchema) -> Result<SchemaRef, ConversionError>;

    fn to_target_value(
        &self,
        schema: &RecordSchema,
        value: &Value,
    ) -> Result<EncodedRow, ConversionError>;
}

/// Converter targeting Arrow, with a bounded schema cache keyed by schema
/// fingerprint so repeated records sharing a schema convert it once.
pub struct ArrowConverter {
    cache: Mutex<HashMap<u64, SchemaRef>>,
    capacity: usize,
}

impl ArrowConverter {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    pub fn cached_schemas(&self) -> usize {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.len()
    }

    fn build_schema(schema: &RecordSchema) -> Schema {
        let mut fields = Vec::with_capacity(schema.fields.len());
        for field in &schema.fields {
            let arrow_type = convert_data_type(&field.data_type);
            fields.push(Field::new(&field.name, arrow_type, field.nullable));
        }
        Schema::new(fields)
    }
}

impl SchemaConverter for ArrowConverter {
    fn to_target_schema(&self, schema: &RecordSchema) -> Result<SchemaRef, ConversionError> {
        let fingerprint = schema.fingerprint();

        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = cache.get(&fingerprint) {
            return Ok(cached.clone());
        }

        let converted: SchemaRef = Arc::new(Self::build_schema(schema));
        if cache.len() >= self.capacity {
            cache.clear();
        }
        cache.insert(fingerprint, converted.clone());
        Ok(converted)
    }

    fn to_target_value(
        &self,
        schema: &RecordSchema,
        value: &Value,
    ) -> Result<EncodedRow, ConversionError> {
        let mut values = Vec::with_capacity(schema.fields.len());
        for field in &schema.fields {
            let raw = value.get(&field.name);
            let coerced = coerce_value(&field.name, &field.data_type, raw)?;
            if coerced.is_none() && !field.nullable {
                return Err(ConversionError::MissingField {
                    field: field.name.clone(),
                });
            }
            values.push(coerced);
        }
        Ok(EncodedRow { values })
    }
}

fn convert_data_type(data_type: &DataType) -> ArrowDataType {
    match data_type {
        DataType::Boolean => ArrowDataType::Boolean,
        DataType::Int8 => ArrowDataType::Int8,
        DataType::Int16 => ArrowDataType::Int16,
        DataType::Int32 => ArrowDataType::Int32,
        DataType::Int64 => ArrowDataType::Int64,
        DataType::UInt8 => ArrowDataType::UInt8,
        DataType::UInt16 => ArrowDataType::UInt16,
        DataType::UInt32 => ArrowDataType::UInt32,
        DataType::UInt64 => ArrowDataType::UInt64,
        DataType::Float32 => ArrowDataType::Float32,
        DataType::Float64 => ArrowDataType::Float64,
        DataType::Utf8 => ArrowDataType::Utf8,
        DataType::Binary => ArrowDataType::Binary,
        DataType::Date32 => ArrowDataType::Date32,
        DataType::TimestampMillisecond => {
            ArrowDataType::Timestamp(TimeUnit::Millisecond, None)
        }
    }
}

fn coerce_value(
    field: &str,
    data_type: &DataType,
    raw: Option<&Value>,
) -> Result<Option<Value>, ConversionError> {
    let raw = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(v) => v,
    };

    let mismatch = |expected: &str| ConversionError::TypeMismatch {
        field: field.to_string(),
        expected: expected.to_string(),
    };

    let coerced = match data_type {
        DataType::Boolean => {
            raw.as_bool().ok_or_else(|| mismatch("boolean"))?;
            raw.clone()
        }
        DataType::Int8 => {
            let i = raw.as_i64().ok_or_else(|| mismatch("8-bit integer"))?;
            i8::try_from(i).map_err(|_| mismatch("8-bit integer"))?;
            raw.clone()
        }
        DataType::Int16 => {
            let i = raw.as_i64().ok_or_else(|| mismatch("16-bit integer"))?;
            i16::try_from(i).map_err(|_| mismatch("16-bit integer"))?;
            raw.clone()
        }
        DataType::Int32 => {
            let i = raw.as_i64().ok_or_else(|| mismatch("32-bit integer"))?;
            i32::try_from(i).map_err(|_| mismatch("32-bit integer"))?;
            raw.clone()
        }
        DataType::Int64 => {
            raw.as_i64().ok_or_else(|| mismatch("integer"))?;
            raw.clone()
        }
        DataType::UInt8 => {
            let u = raw.as_u64().ok_or_else(|| mismatch("8-bit unsigned integer"))?;
            u8::try_from(u).map_err(|_| mismatch("8-bit unsigned integer"))?;
            raw.clone()
        }
        DataType::UInt16 => {
            let u = raw
                .as_u64()
                .ok_or_else(|| mismatch("16-bit unsigned integer"))?;
            u16::try_from(u).map_err(|_| mismatch("16-bit unsigned integer"))?;
            raw.clone()
        }
        DataType::UInt32 => {
            let u = raw
                .as_u64()
                .ok_or_else(|| mismatch("32-bit unsigned integer"))?;
            u32::try_from(u).map_err(|_| mismatch("32-bit unsigned integer"))?;
            raw.clone()
        }
        DataType::UInt64 => {
            raw.as_u64().ok_or_else(|| mismatch("unsigned integer"))?;
            raw.clone()
        }
        DataType::Float32 | DataType::Float64 => {
            raw.as_f64().ok_or_else(|| mismatch("float"))?;
            raw.clone()
        }
        DataType::Utf8 | DataType::Binary => {
            raw.as_str().ok_or_else(|| mismatch("string"))?;
            raw.clone()
        }
        DataType::Date32 => {
            let i = raw.as_i64().ok_or_else(|| mismatch("32-bit date"))?;
            i32::try_from(i).map_err(|_| mismatch("32-bit date"))?;
            raw.clone()
        }
        DataType::TimestampMillisecond => {
            raw.as_i64().ok_or_else(|| mismatch("integer timestamp"))?;
            raw.clone()
        }
    };

    Ok(Some(coerced))
}

/// Assemble buffered rows into a RecordBatch for the columnar writer.
pub fn rows_to_batch(schema: &SchemaRef, rows: &[EncodedRow]) -> Result<RecordBatch, ConversionError> {
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

    for (index, field) in schema.fields().iter().enumerate() {
        let values: Vec<Option<&Value>> = rows
            .iter()
            .map(|row| row.values.get(index).and_then(|v| v.as_ref()))
            .collect();
        columns.push(build_array(field, &values)?);
    }

    RecordBatch::try_new(schema.clone(), columns).map_err(|e| ConversionError::Batch {
        reason: e.to_string(),
    })
}

fn build_array(field: &Field, values: &[Option<&Value>]) -> Result<ArrayRef, ConversionError> {
    match field.data_type() {
        ArrowDataType::Boolean => {
            let array: BooleanArray = values.iter().map(|v| v.and_then(|v| v.as_bool())).collect();
            Ok(Arc::new(array))
        }
        ArrowDataType::Int8 => {
            let array: Int8Array = values
                .iter()
                .map(|v| v.and_then(|v| v.as_i64()).map(|i| i as i8))
                .collect();
            Ok(Arc::new(array))
        }
        ArrowDataType::Int16 => {
            let array: Int16Array = values
                .iter()
                .map(|v| v.and_then(|v| v.as_i64()).map(|i| i as i16))
                .collect();
            Ok(Arc::new(array))
        }
        ArrowDataType::Int32 => {
            let array: Int32Array = values
                .iter()
                .map(|v| v.and_then(|v| v.as_i64()).map(|i| i as i32))
                .collect();
            Ok(Arc::new(array))
        }
        ArrowDataType::Int64 => {
            let array: Int64Array = values.iter().map(|v| v.and_then(|v| v.as_i64())).collect();
            Ok(Arc::new(array))
        }
        ArrowDataType::UInt8 => {
            let array: UInt8Array = values
                .iter()
                .map(|v| v.and_then(|v| v.as_u64()).map(|u| u as u8))
                .collect();
            Ok(Arc::new(array))
        }
        ArrowDataType::UInt16 => {
            let array: UInt16Array = values
                .iter()
                .map(|v| v.and_then(|v| v.as_u64()).map(|u| u as u16))
                .collect();
            Ok(Arc::new(array))
        }
        ArrowDataType::UInt32 => {
            let array: UInt32Array = values
                .iter()
                .map(|v| v.and_then(|v| v.as_u64()).map(|u| u as u32))
                .collect();
            Ok(Arc::new(array))
        }
        ArrowDataType::UInt64 => {
            let array: UInt64Array = values.iter().map(|v| v.and_then(|v| v.as_u64())).collect();
            Ok(Arc::new(array))
        }
        ArrowDataType::Float32 => {
            let array: Float32Array = values
                .iter()
                .map(|v| v.and_then(|v| v.as_f64()).map(|f| f as f32))
                .collect();
            Ok(Arc::new(array))
        }
        ArrowDataType::Float64 => {
            let array: Float64Array = values.iter().map(|v| v.and_then(|v| v.as_f64())).collect();
            Ok(Arc::new(array))
        }
        ArrowDataType::Utf8 => {
            let array: StringArray = values
                .iter()
                .map(|v| v.and_then(|v| v.as_str().map(|s| s.to_string())))
                .collect();
            Ok(Arc::new(array))
        }
        ArrowDataType::Binary => {
            let array: BinaryArray = values
                .iter()
                .map(|v| v.and_then(|v| v.as_str().map(|s| s.as_bytes().to_vec())))
                .collect();
            Ok(Arc::new(array))
        }
        ArrowDataType::Date32 => {
            let array: Date32Array = values
                .iter()
                .map(|v| v.and_then(|v| v.as_i64()).map(|i| i as i32))
                .collect();
            Ok(Arc::new(array))
        }
        ArrowDataType::Timestamp(TimeUnit::Millisecond, _) => {
            let array: TimestampMillisecondArray =
                values.iter().map(|v| v.and_then(|v| v.as_i64())).collect();
            Ok(Arc::new(array))
        }
        other => Err(ConversionError::UnsupportedType {
            name: format!("{:?}", other),
        }),
    }
}
