//! graphflow-server — the HTTP session API binary.
//!
//! `tracing_subscriber` registry init, `dotenvy`, `Config::from_env`, an
//! axum router with CORS and trace layers, graceful shutdown on
//! Ctrl+C/SIGTERM.

mod config;
mod error;
mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use graphflow_engine::{FunctionRegistry, WorkflowEngine};
use graphflow_store::postgres::PgGraphStore;

use crate::config::{AppState, Config};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "graphflow_server=info,graphflow_engine=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env();
    let bind_addr = config.bind_addr();

    info!(bind_addr, "starting graphflow-server");

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to graph store database");

    let store = PgGraphStore::new(pool);
    store.migrate().await.expect("failed to run graph store migrations");

    let registry = FunctionRegistry::with_builtins();
    let engine = Arc::new(WorkflowEngine::with_iteration_max(
        Arc::new(store),
        registry,
        config.iteration_max,
    ));
    let state = AppState::new(engine);

    let app = Router::new()
        .route("/session", post(handlers::create_session))
        .route("/session/:id/message", post(handlers::send_message))
        .route("/session/:id", get(handlers::get_session))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await.expect("failed to bind to address");
    info!(bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
