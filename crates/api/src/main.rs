use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use modellab_api::background;
use modellab_api::config::ServerConfig;
use modellab_api::router::build_app_router;
use modellab_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "modellab_api=debug,modellab_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Job registry ---
    let registry = Arc::new(config.pipeline.build_registry());
    registry
        .artifacts()
        .init()
        .await
        .expect("Failed to create upload directory");
    tracing::info!(
        upload_dir = %config.pipeline.upload_dir.display(),
        commands = config.pipeline.commands.len(),
        "Job registry ready"
    );

    // --- Retention ---
    let retention_cancel = CancellationToken::new();
    let retention_handle = config.pipeline.retention.map(|retention| {
        tokio::spawn(background::job_retention::run(
            Arc::clone(&registry),
            retention,
            config.pipeline.sweep_interval,
            retention_cancel.clone(),
        ))
    });

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        registry: Arc::clone(&registry),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    retention_cancel.cancel();
    if let Some(handle) = retention_handle {
        match tokio::time::timeout(Duration::from_secs(5), handle).await {
            Ok(Err(e)) => tracing::error!(error = %e, "Job retention task failed"),
            Err(_) => tracing::warn!("Job retention did not stop in time"),
            Ok(Ok(())) => tracing::info!("Job retention stopped"),
        }
    }

    let in_flight = registry.in_flight();
    if in_flight > 0 {
        tracing::info!(in_flight, "Waiting for running jobs");
    }
    let limit = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(limit, registry.drain()).await.is_err() {
        tracing::warn!(
            in_flight = registry.in_flight(),
            "Shutdown timeout reached with jobs still running"
        );
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
