use std::net::SocketAddr;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nova_api::config::WorkerConfig;
use nova_api::router::build_router;
use nova_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "nova_api=debug,nova_comfyui=debug,nova_training=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env().expect("Invalid configuration");
    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        comfyui = %config.engine.api_url,
        kohya = %config.training.engine_root.display(),
        "Loaded worker configuration",
    );

    // --- Output directories ---
    std::fs::create_dir_all(&config.engine.output_dir)
        .expect("Failed to create artifact output directory");
    std::fs::create_dir_all(&config.training.output_root)
        .expect("Failed to create training output directory");

    let shutdown_grace = Duration::from_secs(config.server.shutdown_timeout_secs);
    let addr = SocketAddr::new(
        config.server.host.parse().expect("Invalid HOST address"),
        config.server.port,
    );

    // --- App state ---
    let shutdown = CancellationToken::new();
    let state = AppState::new(config, shutdown.clone()).expect("Failed to build worker state");
    let supervisor = state.supervisor.clone();

    // --- Router ---
    let app = build_router(state).expect("Failed to build router");

    // --- Start server ---
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    let signal_token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Abort in-flight poll loops so open requests can drain.
            signal_token.cancel();
        })
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, stopping training jobs");
    supervisor.shutdown(shutdown_grace).await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
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
