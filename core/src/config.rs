use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

const DEFAULT_SCHEMA_CACHE_SIZE: usize = 1000;
const DEFAULT_BLOCK_SIZE: usize = 256 * 1024 * 1024;
const DEFAULT_PAGE_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SinkConfig {
    /// Capacity of the converter's schema cache.
    #[serde(default = "default_schema_cache_size")]
    pub schema_cache_size: usize,
    #[serde(default)]
    pub parquet: ParquetConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParquetConfig {
    #[serde(default = "default_compression")]
    pub compression: CompressionType,
    /// Target row-group size in bytes.
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    /// Data page size limit in bytes.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionType {
    Uncompressed,
    Snappy,
    Gzip,
    Lz4,
    Zstd,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub fs: Option<FsConfig>,
    pub s3: Option<S3Config>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Fs,
    S3,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FsConfig {
    pub root: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    #[serde(default)]
    pub prefix: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub endpoint_url: Option<String>,
}

fn default_schema_cache_size() -> usize {
    DEFAULT_SCHEMA_CACHE_SIZE
}

fn default_compression() -> CompressionType {
    CompressionType::Snappy
}

fn default_block_size() -> usize {
    DEFAULT_BLOCK_SIZE
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for ParquetConfig {
    fn default() -> Self {
        Self {
            compression: default_compression(),
            block_size: default_block_size(),
            page_size: default_page_size(),
        }
    }
}

impl SinkConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            source: path.to_string(),
            error: Box::new(e),
        })?;
        let config: SinkConfig =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                source: path.to_string(),
                error: Box::new(e),
            })?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let content = std::env::var("BLOBSINK_CONFIG").map_err(|_| ConfigError::MissingField {
            field: "BLOBSINK_CONFIG".to_string(),
        })?;
        let config: SinkConfig =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                source: "BLOBSINK_CONFIG".to_string(),
                error: Box::new(e),
            })?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schema_cache_size == 0 {
            return Err(ConfigError::Invalid {
                message: "schema_cache_size must be positive".to_string(),
            });
        }
        if self.parquet.block_size == 0 || self.parquet.page_size == 0 {
            return Err(ConfigError::Invalid {
                message: "parquet block_size and page_size must be positive".to_string(),
            });
        }

        match self.storage.backend {
            StorageBackend::Fs => {
                let fs = self.storage.fs.as_ref().ok_or(ConfigError::MissingField {
                    field: "storage.fs".to_string(),
                })?;
                if fs.root.is_empty() {
                    return Err(ConfigError::Invalid {
                        message: "storage.fs.root cannot be empty".to_string(),
                    });
                }
            }
            StorageBackend::S3 => {
                let s3 = self.storage.s3.as_ref().ok_or(ConfigError::MissingField {
                    field: "storage.s3".to_string(),
                })?;
                if s3.bucket.is_empty() {
                    return Err(ConfigError::Invalid {
                        message: "storage.s3.bucket cannot be empty".to_string(),
                    });
                }
                if s3.region.is_empty() {
                    return Err(ConfigError::Invalid {
                        message: "storage.s3.region cannot be empty".to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_config() -> SinkConfig {
        SinkConfig {
            schema_cache_size: 100,
            parquet: ParquetConfig::default(),
            storage: StorageConfig {
                backend: StorageBackend::S3,
                fs: None,
                s3: Some(S3Config {
                    bucket: "test-bucket".to_string(),
                    region: "us-east-1".to_string(),
                    prefix: "topics".to_string(),
                    access_key_id: None,
                    secret_access_key: None,
                    session_token: None,
                    endpoint_url: None,
                }),
            },
        }
    }

    #[test]
    fn test_config_validation_success() {
        let config = create_test_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parquet_defaults() {
        let parquet = ParquetConfig::default();
        assert_eq!(parquet.compression, CompressionType::Snappy);
        assert_eq!(parquet.block_size, 256 * 1024 * 1024);
        assert_eq!(parquet.page_size, 64 * 1024);
    }

    #[test]
    fn test_config_validation_zero_cache_size() {
        let mut config = create_test_config();
        config.schema_cache_size = 0;

        let result = config.validate();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("schema_cache_size must be positive")
        );
    }

    #[test]
    fn test_config_validation_empty_bucket() {
        let mut config = create_test_config();
        config.storage.s3.as_mut().unwrap().bucket = "".to_string();

        let result = config.validate();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("bucket cannot be empty")
        );
    }

    #[test]
    fn test_config_validation_missing_backend_section() {
        let mut config = create_test_config();
        config.storage.backend = StorageBackend::Fs;
        config.storage.fs = None;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("storage.fs"));
    }

    #[test]
    fn test_config_from_yaml_file() {
        let yaml_content = r#"
schema_cache_size: 50

parquet:
  compression: "gzip"
  page_size: 32768

storage:
  backend: "s3"
  s3:
    bucket: "test-bucket"
    region: "us-east-1"
    prefix: "topics"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml_content.as_bytes()).unwrap();

        let config = SinkConfig::from_file(temp_file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.schema_cache_size, 50);
        assert_eq!(config.parquet.compression, CompressionType::Gzip);
        assert_eq!(config.parquet.page_size, 32768);
        // omitted keys fall back to defaults
        assert_eq!(config.parquet.block_size, 256 * 1024 * 1024);
        assert_eq!(config.storage.s3.as_ref().unwrap().bucket, "test-bucket");
    }

    #[test]
    fn test_config_from_env() {
        let yaml_content = r#"
storage:
  backend: "fs"
  fs:
    root: "/tmp/blobsink"
"#;

        unsafe {
            std::env::set_var("BLOBSINK_CONFIG", yaml_content);
        }

        let config = SinkConfig::from_env().unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Fs);
        assert_eq!(config.schema_cache_size, 1000);

        unsafe {
            std::env::remove_var("BLOBSINK_CONFIG");
        }
    }

    #[test]
    fn test_compression_type_serde() {
        let types = vec![
            CompressionType::Uncompressed,
            CompressionType::Snappy,
            CompressionType::Gzip,
            CompressionType::Lz4,
            CompressionType::Zstd,
        ];

        for compression in types {
            let serialized = serde_yaml::to_string(&compression).unwrap();
            let deserialized: CompressionType = serde_yaml::from_str(&serialized).unwrap();
            assert_eq!(compression, deserialized);
        }
    }
}
