use arrow::datatypes::SchemaRef;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;

use crate::config::{CompressionType, ParquetConfig};
use crate::convert::{EncodedRow, rows_to_batch};
use crate::errors::EncodeError;

/// Rows buffered before being assembled into a RecordBatch.
const BATCH_ROWS: usize = 1024;

/// The open writer handle: appends converted rows and produces the finished
/// file bytes exactly once.
pub trait RecordEncoder: Send {
    fn append(&mut self, row: EncodedRow) -> Result<(), EncodeError>;

    fn finish(self: Box<Self>) -> Result<Vec<u8>, EncodeError>;
}

/// Opens an encoder bound to a converted schema. The open step is where an
/// unencodable schema is rejected.
pub trait EncoderFactory: Send + Sync {
    fn open(
        &self,
        schema: SchemaRef,
        config: &ParquetConfig,
    ) -> Result<Box<dyn RecordEncoder>, EncodeError>;
}

fn compression(config: &ParquetConfig) -> Compression {
    match config.compression {
        CompressionType::Uncompressed => Compression::UNCOMPRESSED,
        CompressionType::Snappy => Compression::SNAPPY,
        CompressionType::Gzip => Compression::GZIP(GzipLevel::default()),
        CompressionType::Lz4 => Compression::LZ4,
        CompressionType::Zstd => Compression::ZSTD(ZstdLevel::default()),
    }
}

/// Parquet encoder over an in-memory buffer. The whole file is assembled in
/// memory and handed to storage as one object on finish.
pub struct ParquetEncoder {
    schema: SchemaRef,
    writer: ArrowWriter<Vec<u8>>,
    pending: Vec<EncodedRow>,
    row_group_bytes: usize,
}

impl ParquetEncoder {
    pub fn new(schema: SchemaRef, config: &ParquetConfig) -> Result<Self, EncodeError> {
        let properties = WriterProperties::builder()
            .set_compression(compression(config))
            .set_data_page_size_limit(config.page_size)
            .build();

        let writer = ArrowWriter::try_new(Vec::new(), schema.clone(), Some(properties))
            .map_err(|e| EncodeError::Open {
                reason: e.to_string(),
            })?;

        Ok(Self {
            schema,
            writer,
            pending: Vec::with_capacity(BATCH_ROWS),
            row_group_bytes: config.block_size,
        })
    }

    fn flush_pending(&mut self) -> Result<(), EncodeError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let batch = rows_to_batch(&self.schema, &self.pending).map_err(|e| EncodeError::Append {
            reason: e.to_string(),
        })?;
        self.pending.clear();

        self.writer.write(&batch).map_err(|e| EncodeError::Append {
            reason: e.to_string(),
        })?;

        // end the current row group once it reaches the configured block size
        if self.writer.in_progress_size() >= self.row_group_bytes {
            self.writer.flush().map_err(|e| EncodeError::Append {
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }
}

impl RecordEncoder for ParquetEncoder {
    fn append(&mut self, row: EncodedRow) -> Result<(), EncodeError> {
        self.pending.push(row);
        if self.pending.len() >= BATCH_ROWS {
            self.flush_pending()?;
        }
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<Vec<u8>, EncodeError> {
        self.flush_pending().map_err(|e| EncodeError::Finish {
            reason: e.to_string(),
        })?;
        self.writer.into_inner().map_err(|e| EncodeError::Finish {
            reason: e.to_string(),
        })
    }
}

pub struct ParquetEncoderFactory;

impl EncoderFactory for ParquetEncoderFactory {
    fn open(
        &self,
        schema: SchemaRef,
        config: &ParquetConfig,
    ) -> Result<Box<dyn RecordEncoder>, EncodeError> {
        Ok(Box::new(ParquetEncoder::new(schema, config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{ArrowConverter, SchemaConverter};
    use crate::record::{DataType, RecordSchema, SchemaField};
    use arrow::array::{Int64Array, StringArray};
    use bytes::Bytes;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use serde_json::json;

    fn sample_schema() -> RecordSchema {
        RecordSchema::new(vec![
            SchemaField::new("id", DataType::Int64, false),
            SchemaField::new("name", DataType::Utf8, true),
        ])
    }

    #[test]
    fn test_encoder_round_trip() {
        let converter = ArrowConverter::new(10);
        let schema = sample_schema();
        let arrow_schema = converter.to_target_schema(&schema).unwrap();

        let factory = ParquetEncoderFactory;
        let mut encoder = factory
            .open(arrow_schema.clone(), &ParquetConfig::default())
            .unwrap();

        for value in [json!({"id": 1, "name": "a"}), json!({"id": 2, "name": "b"})] {
            let row = converter.to_target_value(&schema, &value).unwrap();
            encoder.append(row).unwrap();
        }

        let bytes = encoder.finish().unwrap();
        assert!(!bytes.is_empty());

        let reader = ParquetRecordBatchReaderBuilder::try_new(Bytes::from(bytes))
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<_> = reader.map(|b| b.unwrap()).collect();

        let total_rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(total_rows, 2);

        let first = &batches[0];
        let ids = first
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(ids.value(0), 1);
        let names = first
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(names.value(0), "a");
    }

    #[test]
    fn test_encoder_buffers_past_batch_boundary() {
        let converter = ArrowConverter::new(10);
        let schema = sample_schema();
        let arrow_schema = converter.to_target_schema(&schema).unwrap();

        let mut encoder = ParquetEncoder::new(arrow_schema, &ParquetConfig::default()).unwrap();
        let rows = BATCH_ROWS + 7;

        for i in 0..rows {
            let row = converter
                .to_target_value(&schema, &json!({"id": i as i64, "name": "x"}))
                .unwrap();
            encoder.append(row).unwrap();
        }

        let bytes = Box::new(encoder).finish().unwrap();

        let reader = ParquetRecordBatchReaderBuilder::try_new(Bytes::from(bytes))
            .unwrap()
            .build()
            .unwrap();
        let total_rows: usize = reader.map(|b| b.unwrap().num_rows()).sum();
        assert_eq!(total_rows, rows);
    }

    #[test]
    fn test_empty_encoder_produces_valid_file() {
        let converter = ArrowConverter::new(10);
        let arrow_schema = converter.to_target_schema(&sample_schema()).unwrap();

        let encoder = ParquetEncoder::new(arrow_schema, &ParquetConfig::default()).unwrap();
        let bytes = Box::new(encoder).finish().unwrap();

        let reader = ParquetRecordBatchReaderBuilder::try_new(Bytes::from(bytes))
            .unwrap()
            .build()
            .unwrap();
        let total_rows: usize = reader.map(|b| b.unwrap().num_rows()).sum();
        assert_eq!(total_rows, 0);
    }
}
