//! Startup connection to the object store
//!
//! A connection is established once per process: a bounded number of attempts
//! spaced by a fixed delay, followed by a single bucket existence check. A
//! missing bucket is reported, never created, and never retried.

use crate::{ObjectStore, Result, StoreError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info, warn};

/// Default number of connection attempts
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

/// Default delay between failed attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Produces a store handle, one attempt at a time
#[async_trait]
pub trait Connect: Send + Sync {
    type Store: ObjectStore + 'static;

    /// Make a single connection attempt
    async fn attempt(&self) -> Result<Self::Store>;
}

/// Retry bounds for [`connect`]
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Maximum attempts before giving up (at least one attempt is always made)
    pub max_attempts: u32,
    /// Sleep between a failed attempt and the next one
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }
}

/// Connect with retries, then verify the bucket exists.
///
/// Errors are returned rather than terminating the process; the binary decides
/// what to do with them.
pub async fn connect<C: Connect>(connector: &C, policy: &RetryPolicy) -> Result<C::Store> {
    let store = establish(connector, policy).await?;

    match store.bucket_exists().await {
        Ok(true) => {
            info!(bucket = %store.bucket(), "Bucket found");
            Ok(store)
        }
        Ok(false) => {
            error!(bucket = %store.bucket(), "Bucket does not exist, create bucket first");
            Err(StoreError::BucketMissing(store.bucket().to_string()))
        }
        Err(e) => {
            error!(bucket = %store.bucket(), error = %e, "Bucket existence check failed");
            Err(match e {
                StoreError::BucketCheck { .. } => e,
                other => StoreError::BucketCheck {
                    bucket: store.bucket().to_string(),
                    message: other.to_string(),
                },
            })
        }
    }
}

async fn establish<C: Connect>(connector: &C, policy: &RetryPolicy) -> Result<C::Store> {
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        info!("Connecting: {}/{}", attempt, max_attempts);
        match connector.attempt().await {
            Ok(store) => return Ok(store),
            Err(e) => {
                warn!(attempt, max_attempts, error = %e, "Connection attempt failed");
                last_error = e.to_string();
                if attempt < max_attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }

    error!(attempts = max_attempts, "Cannot connect to S3");
    Err(StoreError::ConnectExhausted {
        attempts: max_attempts,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryObjectStore, ObjectBody};
    use bytes::Bytes;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` attempts, then hands out the store
    struct FlakyConnector {
        failures: u32,
        attempts: AtomicU32,
        store: MemoryObjectStore,
    }

    impl FlakyConnector {
        fn new(failures: u32, store: MemoryObjectStore) -> Self {
            Self {
                failures,
                attempts: AtomicU32::new(0),
                store,
            }
        }

        fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Connect for FlakyConnector {
        type Store = MemoryObjectStore;

        async fn attempt(&self) -> Result<MemoryObjectStore> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                Err(StoreError::Connection(format!("refused #{n}")))
            } else {
                Ok(self.store.clone())
            }
        }
    }

    /// Store whose existence check cannot complete
    #[derive(Debug)]
    struct BrokenCheckStore;

    #[async_trait]
    impl ObjectStore for BrokenCheckStore {
        fn bucket(&self) -> &str {
            "broken"
        }

        async fn bucket_exists(&self) -> Result<bool> {
            Err(StoreError::Connection("reset by peer".to_string()))
        }

        async fn get_object(&self, key: &str) -> Result<ObjectBody> {
            Ok(ObjectBody::from_bytes(key, Bytes::new()))
        }

        async fn put_object(&self, _key: &str, data: Bytes, _content_type: &str) -> Result<u64> {
            Ok(data.len() as u64)
        }
    }

    struct BrokenCheckConnector;

    #[async_trait]
    impl Connect for BrokenCheckConnector {
        type Store = BrokenCheckStore;

        async fn attempt(&self) -> Result<BrokenCheckStore> {
            Ok(BrokenCheckStore)
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 30);
        assert_eq!(policy.delay, Duration::from_secs(1));
    }

    #[test_log::test(tokio::test)]
    async fn test_connects_first_try() {
        let connector = FlakyConnector::new(0, MemoryObjectStore::new("bucket"));

        let store = connect(&connector, &fast_policy(30)).await.unwrap();
        assert_eq!(store.bucket(), "bucket");
        assert_eq!(connector.attempts(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_recovers_after_failures() {
        let connector = FlakyConnector::new(4, MemoryObjectStore::new("bucket"));

        connect(&connector, &fast_policy(30)).await.unwrap();
        assert_eq!(connector.attempts(), 5);
    }

    #[test_log::test(tokio::test)]
    async fn test_gives_up_after_max_attempts() {
        let connector = FlakyConnector::new(u32::MAX, MemoryObjectStore::new("bucket"));

        let err = connect(&connector, &fast_policy(7)).await.unwrap_err();
        assert_eq!(connector.attempts(), 7);
        match err {
            StoreError::ConnectExhausted { attempts, last_error } => {
                assert_eq!(attempts, 7);
                assert!(last_error.contains("refused #7"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let connector = FlakyConnector::new(u32::MAX, MemoryObjectStore::new("bucket"));

        let err = connect(&connector, &fast_policy(0)).await.unwrap_err();
        assert!(matches!(err, StoreError::ConnectExhausted { attempts: 1, .. }));
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn test_missing_bucket_is_not_retried() {
        let connector = FlakyConnector::new(0, MemoryObjectStore::without_bucket("absent"));

        let err = connect(&connector, &fast_policy(30)).await.unwrap_err();
        assert!(matches!(err, StoreError::BucketMissing(ref b) if b == "absent"));
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn test_failed_bucket_check_is_fatal() {
        let err = connect(&BrokenCheckConnector, &fast_policy(3)).await.unwrap_err();
        match err {
            StoreError::BucketCheck { bucket, message } => {
                assert_eq!(bucket, "broken");
                assert!(message.contains("reset by peer"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
