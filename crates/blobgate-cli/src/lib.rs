//! # Blobgate Gateway
//!
//! HTTP gateway that reads and writes objects in a single S3-compatible
//! bucket.
//!
//! This crate provides:
//! - **Object endpoints**: `/get`, `/put`, `/get-blob` and `/put-blob`
//! - **Credential resolution**: Environment variables or mounted secret files
//! - **Server lifecycle**: Header read timeout, request timeout, graceful shutdown
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   HTTP Clients                      │
//! └─────────────────────────┬───────────────────────────┘
//!                           │
//! ┌─────────────────────────▼───────────────────────────┐
//! │                  Blobgate Gateway                   │
//! ├─────────────────────────────────────────────────────┤
//! │   Request ID │ Access Log │ Timeout │ Key Extractor │
//! ├─────────────────────────────────────────────────────┤
//! │     get / put / get-blob / put-blob handlers        │
//! ├─────────────────────────────────────────────────────┤
//! │                  blobgate-store                     │
//! │            (S3 backend, memory backend)             │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod key;
pub mod middleware;
pub mod routes;
pub mod secrets;
pub mod server;
pub mod state;

pub use config::{BackendConfig, GatewayConfig};
pub use error::{ApiError, ConfigError};
pub use key::ObjectKey;
pub use server::{run_server, run_server_with_shutdown, serve};
pub use state::AppState;
