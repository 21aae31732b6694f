//! Server startup and lifecycle

use crate::{routes, AppState, GatewayConfig};
use axum::Router;
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::conn::auto::Builder as ConnBuilder,
    service::TowerToHyperService,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// How long in-flight connections get to finish after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Smallest read buffer hyper accepts
const MIN_BUF_SIZE: usize = 8192;

/// Run the gateway server until Ctrl-C or SIGTERM
pub async fn run_server(config: GatewayConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    run_server_with_shutdown(config, state, shutdown_signal()).await
}

/// Run server with graceful shutdown
pub async fn run_server_with_shutdown(
    config: GatewayConfig,
    state: Arc<AppState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = routes::create_router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;

    info!("Blobgate listening on http://{}", listener.local_addr()?);

    serve(listener, app, &config, shutdown_signal).await?;

    info!("Gateway shutdown complete");

    Ok(())
}

/// Accept connections on `listener` and serve `app` until `shutdown_signal`
/// resolves.
///
/// Request headers must arrive within `read_timeout` and may not exceed
/// `max_header_bytes`. Each connection runs on its own task.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    config: &GatewayConfig,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let (signal_tx, signal_rx) = watch::channel(());
    let (close_tx, close_rx) = watch::channel(());
    let mut shutdown_signal = std::pin::pin!(shutdown_signal);

    loop {
        let (socket, peer) = tokio::select! {
            res = listener.accept() => match res {
                Ok(conn) => conn,
                Err(err) => {
                    error!("error accepting connection: {err}");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            },
            _ = shutdown_signal.as_mut() => {
                info!("Shutdown signal received");
                break;
            }
        };

        debug!(%peer, "Accepted connection");
        let service = TowerToHyperService::new(app.clone());
        let read_timeout = config.read_timeout;
        let max_header_bytes = config.max_header_bytes.max(MIN_BUF_SIZE);
        let mut signal_rx = signal_rx.clone();
        let close_rx = close_rx.clone();

        tokio::spawn(async move {
            let mut conn_builder = ConnBuilder::new(TokioExecutor::new());
            conn_builder
                .http1()
                .timer(TokioTimer::new())
                .header_read_timeout(read_timeout)
                .max_buf_size(max_header_bytes);

            let conn = conn_builder.serve_connection_with_upgrades(TokioIo::new(socket), service);
            let mut conn = std::pin::pin!(conn);

            let result = tokio::select! {
                res = conn.as_mut() => res,
                _ = signal_rx.changed() => {
                    conn.as_mut().graceful_shutdown();
                    conn.as_mut().await
                }
            };
            if let Err(err) = result {
                debug!(%peer, "connection closed with error: {err}");
            }

            drop(close_rx);
        });
    }

    drop(listener);
    drop(close_rx);
    drop(signal_rx);
    let _ = signal_tx.send(());

    if tokio::time::timeout(SHUTDOWN_GRACE, close_tx.closed()).await.is_err() {
        warn!("Waited {:?} for graceful shutdown, aborting...", SHUTDOWN_GRACE);
    } else {
        debug!("Gracefully shutdown!");
    }

    Ok(())
}

/// Resolve on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received"),
        _ = terminate => info!("SIGTERM received"),
    }
}
