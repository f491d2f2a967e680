use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Writer initialization failed for '{destination}': {reason}")]
    Initialization { destination: String, reason: String },

    #[error("Record append failed: {reason}")]
    Write { reason: String },

    #[error("Writer close failed for '{destination}': {reason}")]
    Close { destination: String, reason: String },

    #[error("Operation not supported by this format: {operation}")]
    Unsupported { operation: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Failed to load configuration from {source}: {error}")]
    LoadFailed {
        source: String,
        #[source]
        error: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Destination '{destination}' cannot be prepared: {reason}")]
    Prepare { destination: String, reason: String },

    #[error("Failed to upload object to '{destination}': {reason}")]
    Upload { destination: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Unsupported data type: {name}")]
    UnsupportedType { name: String },

    #[error("Missing value for non-nullable field '{field}'")]
    MissingField { field: String },

    #[error("Value for field '{field}' is not a {expected}")]
    TypeMismatch { field: String, expected: String },

    #[error("Failed to assemble record batch: {reason}")]
    Batch { reason: String },
}

/// Errors raised by the columnar encoder behind the writer handle.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Failed to open columnar writer: {reason}")]
    Open { reason: String },

    #[error("Failed to append record: {reason}")]
    Append { reason: String },

    #[error("Failed to finalize columnar file: {reason}")]
    Finish { reason: String },
}

pub type Result<T> = std::result::Result<T, SinkError>;

impl SinkError {
    /// Whether the enclosing framework may reasonably redeliver and retry the
    /// failed unit of work. The sink itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            SinkError::Write { .. } => true,
            SinkError::Close { .. } => true,
            SinkError::Storage(StorageError::Upload { .. }) => true,
            SinkError::Initialization { .. } => false,
            SinkError::Unsupported { .. } => false,
            SinkError::Config(_) => false,
            SinkError::Conversion(_) => false,
            SinkError::Storage(StorageError::Prepare { .. }) => false,
        }
    }
}
