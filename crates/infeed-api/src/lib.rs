//! Infeed API /v1: operator REST endpoints over the decision cycle
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod session;
pub mod state;

use axum::{
    middleware::from_fn,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use config::ServiceConfig;
pub use state::AppState;

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/input", post(handlers::submit_input))
        .route(
            "/v1/connection",
            post(handlers::open_connection).delete(handlers::close_connection),
        )
        .route("/v1/fields/{type_name}", get(handlers::get_fields))
        .route(
            "/v1/policies/{type_name}",
            get(handlers::get_policies)
                .post(handlers::select_type)
                .delete(handlers::deselect_type),
        )
        .route(
            "/v1/policies/{type_name}/{field}",
            put(handlers::set_policy).delete(handlers::exclude_field),
        )
        .route("/v1/decisions", get(handlers::list_decisions))
        .route(
            "/v1/initiated",
            get(handlers::list_initiated).post(handlers::initiate_input),
        )
        .route("/v1/initiated/{id}/finish", post(handlers::finish_initiated))
        .route(
            "/v1/infeed",
            get(handlers::current_infeed).post(handlers::start_infeed),
        )
        .route("/v1/infeed/placed", post(handlers::packs_placed))
        .route("/v1/infeed/abort", post(handlers::abort_infeed))
        .route("/v1/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(from_fn(middleware::log_requests))
        .layer(middleware::cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: ServiceConfig) -> anyhow::Result<()> {
    let addr = config.listen_addr.clone();
    let state = Arc::new(AppState::new(config)?);
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Infeed API listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Infeed API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
