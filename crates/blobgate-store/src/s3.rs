//! S3-compatible backend built on `aws-sdk-s3`

use crate::{Connect, ObjectBody, ObjectStore, Result, StoreError};
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, instrument};
use url::Url;

/// Default signing region for S3-compatible services that ignore it
pub const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for an S3-compatible backend
#[derive(Clone)]
pub struct S3Settings {
    /// Backend endpoint as `host[:port]`, without scheme
    pub host: String,
    /// Target bucket
    pub bucket: String,
    /// Access key ID
    pub access_key: String,
    /// Secret access key
    pub secret_key: String,
    /// Use `https` instead of `http`
    pub tls: bool,
    /// Signing region
    pub region: String,
    /// Upper bound on the reachability probe made by each connection attempt
    pub probe_timeout: Duration,
}

impl S3Settings {
    /// Create settings with TLS disabled and the default region
    pub fn new(
        host: impl Into<String>,
        bucket: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            bucket: bucket.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            tls: false,
            region: DEFAULT_REGION.to_string(),
            probe_timeout: Duration::from_secs(1),
        }
    }

    /// Enable or disable TLS
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Set the signing region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set the reachability probe timeout
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Build the endpoint URL from `host` and the TLS flag.
    ///
    /// The host must be a bare authority; schemes and paths are rejected.
    pub fn endpoint_url(&self) -> Result<Url> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(StoreError::InvalidEndpoint("host is empty".to_string()));
        }
        if host.contains("://") {
            return Err(StoreError::InvalidEndpoint(format!(
                "{host}: endpoint must not include a scheme"
            )));
        }

        let scheme = if self.tls { "https" } else { "http" };
        let url = Url::parse(&format!("{scheme}://{host}"))
            .map_err(|e| StoreError::InvalidEndpoint(format!("{host}: {e}")))?;

        if url.path() != "/" || url.query().is_some() || url.host_str().is_none() {
            return Err(StoreError::InvalidEndpoint(format!(
                "{host}: endpoint must be host[:port]"
            )));
        }
        Ok(url)
    }
}

impl std::fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Settings")
            .field("host", &self.host)
            .field("bucket", &self.bucket)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("tls", &self.tls)
            .field("region", &self.region)
            .field("probe_timeout", &self.probe_timeout)
            .finish()
    }
}

/// Object store backed by one bucket of an S3-compatible service
#[derive(Clone, Debug)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Wrap an existing client
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client for `settings` without touching the network
    pub fn from_settings(settings: &S3Settings) -> Result<Self> {
        let endpoint = settings.endpoint_url()?;
        let credentials = Credentials::new(
            settings.access_key.clone(),
            settings.secret_key.clone(),
            None,
            None,
            "blobgate",
        );

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .endpoint_url(endpoint.as_str().trim_end_matches('/'))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Ok(Self::new(Client::from_conf(config), settings.bucket.clone()))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn bucket_exists(&self) -> Result<bool> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(e))
                if e.err().is_not_found() || e.raw().status().as_u16() == 404 =>
            {
                Ok(false)
            }
            Err(e) => Err(StoreError::BucketCheck {
                bucket: self.bucket.clone(),
                message: DisplayErrorContext(&e).to_string(),
            }),
        }
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn get_object(&self, key: &str) -> Result<ObjectBody> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e {
                SdkError::ServiceError(ref service)
                    if service.err().is_no_such_key() || service.raw().status().as_u16() == 404 =>
                {
                    StoreError::NotFound {
                        bucket: self.bucket.clone(),
                        key: key.to_string(),
                    }
                }
                other => StoreError::Fetch {
                    key: key.to_string(),
                    message: DisplayErrorContext(&other).to_string(),
                },
            })?;

        debug!(content_length = ?output.content_length(), "Object fetched");
        Ok(ObjectBody::from_s3(key, output.body))
    }

    #[instrument(skip(self, data), fields(bucket = %self.bucket, len = data.len()))]
    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> Result<u64> {
        let len = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .content_length(len as i64)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StoreError::Put {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(len as u64)
    }
}

/// Connector for an S3-compatible backend.
///
/// Each attempt validates the endpoint, checks that the backend accepts TCP
/// connections, and builds a client.
#[derive(Clone, Debug)]
pub struct S3Connector {
    settings: S3Settings,
}

impl S3Connector {
    pub fn new(settings: S3Settings) -> Self {
        Self { settings }
    }

    async fn probe(&self, endpoint: &Url) -> Result<()> {
        let host = endpoint
            .host_str()
            .ok_or_else(|| StoreError::InvalidEndpoint(endpoint.to_string()))?;
        let port = endpoint.port_or_known_default().unwrap_or(80);
        let addr = format!("{host}:{port}");

        match tokio::time::timeout(self.settings.probe_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(StoreError::Connection(format!("{addr}: {e}"))),
            Err(_) => Err(StoreError::Connection(format!(
                "{addr}: timed out after {:?}",
                self.settings.probe_timeout
            ))),
        }
    }
}

#[async_trait]
impl Connect for S3Connector {
    type Store = S3ObjectStore;

    async fn attempt(&self) -> Result<S3ObjectStore> {
        let endpoint = self.settings.endpoint_url()?;
        self.probe(&endpoint).await?;
        S3ObjectStore::from_settings(&self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect, RetryPolicy};
    use rstest::rstest;
    use tokio::net::TcpListener;

    fn settings(host: &str) -> S3Settings {
        S3Settings::new(host, "bucket", "access", "secret")
    }

    #[rstest]
    #[case("minio:9000", false, "http://minio:9000/")]
    #[case("localhost", false, "http://localhost/")]
    #[case("s3.example.com", true, "https://s3.example.com/")]
    #[case("127.0.0.1:9000", true, "https://127.0.0.1:9000/")]
    fn test_endpoint_url(#[case] host: &str, #[case] tls: bool, #[case] expected: &str) {
        let url = settings(host).with_tls(tls).endpoint_url().unwrap();
        assert_eq!(url.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("http://minio:9000")]
    #[case("minio:9000/path")]
    #[case("minio:notaport")]
    fn test_endpoint_url_rejects(#[case] host: &str) {
        let result = settings(host).endpoint_url();
        assert!(matches!(result, Err(StoreError::InvalidEndpoint(_))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", S3Settings::new("h", "b", "AKIDEXAMPLE", "topsecret"));
        assert!(rendered.contains("AKIDEXAMPLE"));
        assert!(!rendered.contains("topsecret"));
    }

    #[tokio::test]
    async fn test_from_settings_keeps_bucket() {
        let store = S3ObjectStore::from_settings(&settings("localhost:9000")).unwrap();
        assert_eq!(store.bucket(), "bucket");
    }

    #[tokio::test]
    async fn test_attempt_reaches_listening_backend() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let connector = S3Connector::new(settings(&addr.to_string()));
        let store = connector.attempt().await.unwrap();
        assert_eq!(store.bucket(), "bucket");
    }

    #[test_log::test(tokio::test)]
    async fn test_unreachable_backend_exhausts_retries() {
        // Bind then drop to get a local port with nothing listening
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let connector = S3Connector::new(
            settings(&addr.to_string()).with_probe_timeout(Duration::from_millis(200)),
        );
        let policy = RetryPolicy::new(3, Duration::from_millis(5));

        let err = connect(&connector, &policy).await.unwrap_err();
        assert!(matches!(err, StoreError::ConnectExhausted { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_invalid_endpoint_fails_every_attempt() {
        let connector = S3Connector::new(settings("http://scheme:9000"));
        let policy = RetryPolicy::new(2, Duration::from_millis(1));

        let err = connect(&connector, &policy).await.unwrap_err();
        match err {
            StoreError::ConnectExhausted { attempts, last_error } => {
                assert_eq!(attempts, 2);
                assert!(last_error.contains("scheme"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
