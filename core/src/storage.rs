use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{FsConfig, S3Config, StorageBackend, StorageConfig};
use crate::errors::{ConfigError, StorageError};

/// Blob storage seam. `prepare` verifies a destination can be written before
/// a writer is opened for it; `put` uploads one finished object. Both may
/// block on network I/O.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn prepare(&self, destination: &str) -> Result<(), StorageError>;

    async fn put(&self, destination: &str, bytes: Vec<u8>) -> Result<(), StorageError>;
}

/// Build the storage backend selected by configuration.
pub async fn from_config(config: &StorageConfig) -> Result<Arc<dyn Storage>, ConfigError> {
    match config.backend {
        StorageBackend::Fs => {
            let fs = config.fs.as_ref().ok_or(ConfigError::MissingField {
                field: "storage.fs".to_string(),
            })?;
            Ok(Arc::new(FsStorage::new(fs)))
        }
        StorageBackend::S3 => {
            let s3 = config.s3.as_ref().ok_or(ConfigError::MissingField {
                field: "storage.s3".to_string(),
            })?;
            Ok(Arc::new(S3Storage::new(s3.clone()).await))
        }
    }
}

pub struct S3Storage {
    client: Client,
    config: S3Config,
}

impl S3Storage {
    pub async fn new(config: S3Config) -> Self {
        let region = aws_config::Region::new(config.region.clone());

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);

        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                access_key,
                secret_key,
                config.session_token.clone(),
                None,
                "blobsink",
            ));
        }

        if let Some(endpoint_url) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }

        let sdk_config = loader.load().await;
        let client = Client::new(&sdk_config);

        Self { client, config }
    }

    fn object_key(&self, destination: &str) -> String {
        let destination = destination.trim_start_matches('/');
        if self.config.prefix.is_empty() {
            destination.to_string()
        } else {
            format!(
                "{}/{}",
                self.config.prefix.trim_end_matches('/'),
                destination
            )
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn prepare(&self, destination: &str) -> Result<(), StorageError> {
        if destination.is_empty() {
            return Err(StorageError::Prepare {
                destination: destination.to_string(),
                reason: "destination cannot be empty".to_string(),
            });
        }

        self.client
            .head_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
            .map_err(|e| StorageError::Prepare {
                destination: destination.to_string(),
                reason: format!("bucket '{}' is not accessible: {}", self.config.bucket, e),
            })?;

        debug!(
            "S3 bucket '{}' is accessible for '{}'",
            self.config.bucket, destination
        );
        Ok(())
    }

    async fn put(&self, destination: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let key = self.object_key(destination);
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                destination: destination.to_string(),
                reason: e.to_string(),
            })?;

        info!(
            "Uploaded {} bytes to s3://{}/{}",
            size, self.config.bucket, key
        );
        Ok(())
    }
}

/// Local filesystem backend, used by the local runner and integration tests.
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(config: &FsConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root),
        }
    }

    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, destination: &str) -> PathBuf {
        self.root.join(destination.trim_start_matches('/'))
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn prepare(&self, destination: &str) -> Result<(), StorageError> {
        if destination.is_empty() {
            return Err(StorageError::Prepare {
                destination: destination.to_string(),
                reason: "destination cannot be empty".to_string(),
            });
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::Prepare {
                destination: destination.to_string(),
                reason: format!("root '{}' is not writable: {}", self.root.display(), e),
            })
    }

    async fn put(&self, destination: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let path = self.object_path(destination);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Upload {
                    destination: destination.to_string(),
                    reason: e.to_string(),
                })?;
        }

        let size = bytes.len();
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::Upload {
                destination: destination.to_string(),
                reason: e.to_string(),
            })?;

        info!("Wrote {} bytes to {}", size, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fs_storage_put_creates_nested_dirs() {
        let dir = TempDir::new().unwrap();
        let storage = FsStorage::from_root(dir.path());

        storage.prepare("out/part-001").await.unwrap();
        storage
            .put("out/part-001", b"hello".to_vec())
            .await
            .unwrap();

        let written = std::fs::read(dir.path().join("out/part-001")).unwrap();
        assert_eq!(written, b"hello");
    }

    #[tokio::test]
    async fn test_fs_storage_prepare_rejects_empty_destination() {
        let dir = TempDir::new().unwrap();
        let storage = FsStorage::from_root(dir.path());

        let result = storage.prepare("").await;
        assert!(matches!(result, Err(StorageError::Prepare { .. })));
    }

    #[tokio::test]
    async fn test_fs_storage_prepare_touches_nothing_at_destination() {
        let dir = TempDir::new().unwrap();
        let storage = FsStorage::from_root(dir.path());

        storage.prepare("out/part-001").await.unwrap();
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_s3_object_key_joins_prefix() {
        let config = S3Config {
            bucket: "bucket".to_string(),
            region: "us-east-1".to_string(),
            prefix: "topics/".to_string(),
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            endpoint_url: None,
        };

        // key joining is pure, no client needed
        let storage = S3Storage {
            client: Client::from_conf(
                aws_sdk_s3::Config::builder()
                    .behavior_version(BehaviorVersion::latest())
                    .region(aws_config::Region::new("us-east-1"))
                    .build(),
            ),
            config,
        };

        assert_eq!(storage.object_key("/out/part-001"), "topics/out/part-001");
    }
}
