use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dataops_store::{MemoryStore, RedisStore, SharedStore};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dataops_api::config::{ServerConfig, StoreBackend};
use dataops_api::router::build_app_router;
use dataops_api::services::metadata::HttpMetadataClient;
use dataops_api::services::queue::HttpQueueClient;
use dataops_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dataops_api=debug,dataops_store=debug,tower_http=debug".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        backend = ?config.store.backend,
        "Loaded server configuration",
    );

    // --- Store ---
    let store: SharedStore = match config.store.backend {
        StoreBackend::Redis => {
            let store = RedisStore::connect(&config.store.redis_url, config.store.pool_size)
                .expect("Failed to create Redis pool");
            tracing::info!(pool_size = config.store.pool_size, "Redis connection pool created");
            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; state is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    // The store may come up after us; /v1/health/ reports it until then.
    match dataops_store::health_check(store.as_ref()).await {
        Ok(()) => tracing::info!("Store health check passed"),
        Err(e) => tracing::warn!(error = %e, "Store health check failed at startup"),
    }

    // --- Service clients ---
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .expect("Failed to build HTTP client");
    let metadata = Arc::new(HttpMetadataClient::with_client(
        http.clone(),
        config.metadata_service.clone(),
    ));
    let queue = Arc::new(HttpQueueClient::with_client(http, config.queue_service.clone()));

    // --- App state ---
    let shutdown = CancellationToken::new();
    let state = AppState {
        store,
        config: Arc::new(config.clone()),
        metadata,
        queue,
        shutdown: shutdown.clone(),
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

    let serve_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { serve_shutdown.cancelled().await })
            .await
    });

    shutdown_signal().await;
    // Stops accepting connections and ends every open SSE tail.
    shutdown.cancel();

    // --- Drain ---
    match tokio::time::timeout(Duration::from_secs(config.shutdown_timeout_secs), server).await {
        Ok(Ok(Ok(()))) => tracing::info!("Graceful shutdown complete"),
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "Server error"),
        Ok(Err(e)) => tracing::error!(error = %e, "Server task panicked"),
        Err(_) => tracing::warn!(
            timeout_secs = config.shutdown_timeout_secs,
            "Shutdown timed out with requests still in flight",
        ),
    }
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
