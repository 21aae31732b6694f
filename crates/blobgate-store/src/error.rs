//! Error types for the blobgate-store crate

use thiserror::Error;

/// Result type alias using `StoreError`
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while talking to the object store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Object not found
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// Fetching an object failed for a reason other than absence
    #[error("fetch failed for {key}: {message}")]
    Fetch { key: String, message: String },

    /// The object was fetched but its body could not be read to the end
    #[error("read failed for {key}: {message}")]
    Read { key: String, message: String },

    /// Storing an object failed
    #[error("put failed for {key}: {message}")]
    Put { key: String, message: String },

    /// Endpoint could not be parsed into a usable URL
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// A single connection attempt failed
    #[error("connection error: {0}")]
    Connection(String),

    /// Every connection attempt failed
    #[error("cannot connect to S3 after {attempts} attempts: {last_error}")]
    ConnectExhausted { attempts: u32, last_error: String },

    /// Bucket existence check succeeded and the bucket is absent
    #[error("bucket does not exist: {0} (create bucket first)")]
    BucketMissing(String),

    /// Bucket existence check itself failed
    #[error("bucket check failed for {bucket}: {message}")]
    BucketCheck { bucket: String, message: String },
}
