//! Gateway configuration

use blobgate_store::{RetryPolicy, S3Settings};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backend connection settings
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend endpoint (`host[:port]`)
    pub host: String,
    /// Target bucket
    pub bucket: String,
    /// Access key
    pub access: String,
    /// Secret key
    #[serde(skip_serializing)]
    pub secret: String,
    /// Talk to the backend over https
    pub tls: bool,
    /// Signing region
    pub region: String,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("host", &self.host)
            .field("bucket", &self.bucket)
            .field("access", &self.access)
            .field("secret", &redact(&self.secret))
            .field("tls", &self.tls)
            .field("region", &self.region)
            .finish()
    }
}

impl BackendConfig {
    /// Settings for the S3 connector
    pub fn s3_settings(&self) -> S3Settings {
        S3Settings::new(&self.host, &self.bucket, &self.access, &self.secret)
            .with_tls(self.tls)
            .with_region(&self.region)
    }
}

/// Gateway server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Time allowed for a client to send request headers
    pub read_timeout: Duration,
    /// Time allowed from request receipt to finished response
    pub write_timeout: Duration,
    /// Maximum size of request headers (bytes)
    pub max_header_bytes: usize,
    /// Startup connection attempts
    pub connect_attempts: u32,
    /// Delay between startup connection attempts
    pub connect_delay: Duration,
    /// Use in-memory storage (for testing/development)
    pub use_memory_store: bool,
    /// Object store backend
    pub backend: BackendConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            read_timeout: Duration::from_secs(1),
            write_timeout: Duration::from_secs(1),
            max_header_bytes: 1 << 20, // 1 MiB
            connect_attempts: 30,
            connect_delay: Duration::from_secs(1),
            use_memory_store: false,
            backend: BackendConfig {
                region: blobgate_store::s3::DEFAULT_REGION.to_string(),
                ..Default::default()
            },
        }
    }
}

impl GatewayConfig {
    /// Get the bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Retry policy for the startup connection
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.connect_attempts, self.connect_delay)
    }
}

/// Mask all but the first two characters of a credential for logging
pub fn redact(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let prefix: String = value.chars().take(2).collect();
    format!("{prefix}***")
}
