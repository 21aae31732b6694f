//! # Blobgate Store
//!
//! Object storage layer for the Blobgate HTTP gateway.
//!
//! This crate provides:
//! - **ObjectStore trait**: Fetch and store raw bytes by key in a single bucket
//! - **S3 backend**: Any S3-compatible service through `aws-sdk-s3`
//! - **Memory backend**: Process-local store for development and tests
//! - **Connector**: Bounded-retry connection establishment plus bucket check
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            HTTP Handlers                │
//! ├─────────────────────────────────────────┤
//! │           ObjectStore Trait             │
//! ├────────────────────┬────────────────────┤
//! │   S3ObjectStore    │ MemoryObjectStore  │
//! ├────────────────────┴────────────────────┤
//! │        S3-compatible backend            │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use blobgate_store::{connect, RetryPolicy, S3Connector, S3Settings};
//!
//! let connector = S3Connector::new(S3Settings::new("minio:9000", "photos", access, secret));
//! let store = connect(&connector, &RetryPolicy::default()).await?;
//! let body = store.get_object("cat.jpg").await?.read_all().await?;
//! ```

pub mod connector;
pub mod error;
pub mod memory;
pub mod s3;

pub use connector::{connect, Connect, RetryPolicy};
pub use error::{Result, StoreError};
pub use memory::{MemoryConnector, MemoryObjectStore, StoredObject};
pub use s3::{S3Connector, S3ObjectStore, S3Settings};

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::{Bytes, BytesMut};
use futures::stream::{BoxStream, Stream, StreamExt};

/// Content type recorded for objects written through the text endpoints
pub const CONTENT_TYPE_TEXT: &str = "application/text";

/// Content type recorded for objects written through the blob endpoints
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

/// Trait for object storage backends bound to one bucket
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the bucket this store reads and writes
    fn bucket(&self) -> &str;

    /// Check whether the bucket exists.
    ///
    /// `Ok(false)` means the check ran and the bucket is absent; `Err` means
    /// the check itself could not be completed.
    async fn bucket_exists(&self) -> Result<bool>;

    /// Start fetching an object. The returned body still has to be read.
    async fn get_object(&self, key: &str) -> Result<ObjectBody>;

    /// Store `data` under `key` with the given content type, returning the
    /// number of bytes written
    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> Result<u64>;
}

/// Body of a fetched object.
///
/// Fetching and reading are separate steps so callers can tell a failed
/// lookup apart from a stream that broke halfway through.
pub struct ObjectBody {
    key: String,
    inner: BodyInner,
}

enum BodyInner {
    Buffered(Bytes),
    S3(ByteStream),
    Stream(BoxStream<'static, std::io::Result<Bytes>>),
}

impl ObjectBody {
    /// Create a body from bytes that are already in memory
    pub fn from_bytes(key: impl Into<String>, data: Bytes) -> Self {
        Self {
            key: key.into(),
            inner: BodyInner::Buffered(data),
        }
    }

    /// Create a body from a stream of chunks
    pub fn from_stream<S>(key: impl Into<String>, stream: S) -> Self
    where
        S: Stream<Item = std::io::Result<Bytes>> + Send + 'static,
    {
        Self {
            key: key.into(),
            inner: BodyInner::Stream(stream.boxed()),
        }
    }

    pub(crate) fn from_s3(key: impl Into<String>, stream: ByteStream) -> Self {
        Self {
            key: key.into(),
            inner: BodyInner::S3(stream),
        }
    }

    /// Key the body was fetched for
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the whole body into memory
    pub async fn read_all(self) -> Result<Bytes> {
        match self.inner {
            BodyInner::Buffered(data) => Ok(data),
            BodyInner::S3(stream) => stream
                .collect()
                .await
                .map(|aggregated| aggregated.into_bytes())
                .map_err(|e| StoreError::Read {
                    key: self.key,
                    message: e.to_string(),
                }),
            BodyInner::Stream(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk.map_err(|e| StoreError::Read {
                        key: self.key.clone(),
                        message: e.to_string(),
                    })?;
                    buf.extend_from_slice(&chunk);
                }
                Ok(buf.freeze())
            }
        }
    }
}

impl std::fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.inner {
            BodyInner::Buffered(_) => "buffered",
            BodyInner::S3(_) => "s3",
            BodyInner::Stream(_) => "stream",
        };
        f.debug_struct("ObjectBody")
            .field("key", &self.key)
            .field("kind", &kind)
            .finish()
    }
}
