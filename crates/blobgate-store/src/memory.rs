//! In-memory object store for development and testing

use crate::{Connect, ObjectBody, ObjectStore, Result, StoreError};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;

/// An object held by [`MemoryObjectStore`]
#[derive(Clone, Debug)]
pub struct StoredObject {
    /// Raw payload
    pub data: Bytes,
    /// Content type recorded at put time
    pub content_type: String,
}

/// An in-memory object store
#[derive(Clone, Debug)]
pub struct MemoryObjectStore {
    bucket: String,
    bucket_present: bool,
    objects: Arc<DashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    /// Create a new empty store whose bucket exists
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            bucket_present: true,
            objects: Arc::new(DashMap::new()),
        }
    }

    /// Create a store that reports its bucket as absent
    pub fn without_bucket(bucket: impl Into<String>) -> Self {
        Self {
            bucket_present: false,
            ..Self::new(bucket)
        }
    }

    /// Get the number of objects stored
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Look up an object together with its content type
    pub fn stored(&self, key: &str) -> Option<StoredObject> {
        self.objects.get(key).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn bucket_exists(&self) -> Result<bool> {
        Ok(self.bucket_present)
    }

    async fn get_object(&self, key: &str) -> Result<ObjectBody> {
        self.objects
            .get(key)
            .map(|entry| ObjectBody::from_bytes(key, entry.value().data.clone()))
            .ok_or_else(|| StoreError::NotFound {
                bucket: self.bucket.clone(),
                key: key.to_string(),
            })
    }

    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> Result<u64> {
        let written = data.len() as u64;
        self.objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(written)
    }
}

/// Connector that always succeeds with a shared [`MemoryObjectStore`]
#[derive(Clone)]
pub struct MemoryConnector {
    store: MemoryObjectStore,
}

impl MemoryConnector {
    pub fn new(store: MemoryObjectStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Connect for MemoryConnector {
    type Store = MemoryObjectStore;

    async fn attempt(&self) -> Result<MemoryObjectStore> {
        Ok(self.store.clone())
    }
}
