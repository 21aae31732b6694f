//! Blobgate - HTTP gateway over a single S3-compatible bucket

use anyhow::Context;
use blobgate_cli::{config::redact, secrets, AppState, BackendConfig, ConfigError, GatewayConfig};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "blobgate")]
#[command(about = "HTTP gateway for reading and writing objects in an S3-compatible bucket")]
#[command(version)]
struct Args {
    /// Object store endpoint (host[:port])
    #[arg(long = "host", env = "host")]
    backend_host: Option<String>,

    /// Bucket to read and write
    #[arg(long, env = "bucket")]
    bucket: Option<String>,

    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0", env = "BLOBGATE_LISTEN")]
    listen: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "BLOBGATE_PORT")]
    port: u16,

    /// Signing region sent to the object store
    #[arg(long, default_value = "us-east-1", env = "BLOBGATE_REGION")]
    region: String,

    /// Connect to the object store over https
    #[arg(long, env = "BLOBGATE_TLS")]
    tls: bool,

    /// Startup connection attempts before giving up
    #[arg(long, default_value = "30", env = "BLOBGATE_CONNECT_ATTEMPTS")]
    connect_attempts: u32,

    /// Use in-memory storage (for testing, data will not persist)
    #[arg(long, env = "BLOBGATE_MEMORY_STORE")]
    memory_store: bool,

    /// Enable debug logging
    #[arg(short, long, env = "BLOBGATE_DEBUG")]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!(
                "blobgate_cli={log_level},blobgate_store={log_level},tower_http={log_level}"
            )
            .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match build_config(args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    tracing::info!(
        access = %config.backend.access,
        secret = %redact(&config.backend.secret),
        host = %config.backend.host,
        bucket = %config.backend.bucket,
        "Resolved backend settings"
    );

    let state = match AppState::new(config.clone()).await {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!(error = %e, "Cannot start without object store");
            return Err(e).context("connecting to object store");
        }
    };

    blobgate_cli::run_server(config, state).await
}

fn build_config(args: Args) -> Result<GatewayConfig, ConfigError> {
    let mut config = GatewayConfig {
        host: args.listen,
        port: args.port,
        connect_attempts: args.connect_attempts,
        connect_delay: Duration::from_secs(1),
        use_memory_store: args.memory_store,
        ..Default::default()
    };

    if args.memory_store {
        tracing::warn!("Using in-memory storage - data will NOT persist!");
        config.backend = BackendConfig {
            bucket: args.bucket.unwrap_or_default(),
            region: args.region,
            ..Default::default()
        };
        return Ok(config);
    }

    config.backend = BackendConfig {
        host: args.backend_host.ok_or(ConfigError::Missing("host"))?,
        bucket: args.bucket.ok_or(ConfigError::Missing("bucket"))?,
        access: secrets::resolve("access")?,
        secret: secrets::resolve("secret")?,
        tls: args.tls,
        region: args.region,
    };

    Ok(config)
}
