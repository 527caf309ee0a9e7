use axum::debug_handler;
use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use gemini_client::config::Config;
use gemini_client::observability::Health;
use meal_planner_mcp::middleware::generation_client;
use meal_planner_mcp::{
    InMemoryPlanStore, MealPlanService, MealPlannerMcpHandler, PlannerSettings, http,
};

const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

struct AppState {
    health: Health,
    metrics: PrometheusHandle,
}

#[debug_handler]
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.health.clone())
}

#[debug_handler]
async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state.metrics.render();
    ([("content-type", "text/plain; version=0.0.4")], body)
}

/// Body limit from `MAX_HTTP_BODY_SIZE`, ignoring unparsable values.
fn max_body_size_from(raw: Option<String>) -> usize {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_MAX_BODY_BYTES)
}

fn address_from(raw: Option<String>) -> SocketAddr {
    raw.and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000)))
}


#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Configure logging from env var `MEAL_PLANNER_LOG_LEVEL` (or fallback to `RUST_LOG`, default `info`).
    let log_env = std::env::var("MEAL_PLANNER_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(format!("{log_env},rmcp=warn"))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,rmcp=warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::info!(%log_env, "meal_planner_mcp:http: log filter");

    let handle = PrometheusBuilder::new().install_recorder()?;

    let (config, health) = match Config::from_env() {
        Ok(cfg) => {
            let health = Health::readiness(&cfg);
            (Some(cfg), health)
        }
        Err(e) => {
            tracing::warn!(error = %e, "generation backend not configured; serving fallback plans only");
            (None, Health::degraded())
        }
    };
    let client = generation_client(config.as_ref())?;
    let settings = PlannerSettings::from_env()?;
    let service = Arc::new(MealPlanService::new(
        Arc::new(InMemoryPlanStore::new()),
        client,
        settings,
    ));

    let state = Arc::new(AppState {
        health,
        metrics: handle,
    });

    let max_body_size = max_body_size_from(std::env::var("MAX_HTTP_BODY_SIZE").ok());

    // MCP over streamable HTTP, sharing the same service and store
    let handler = MealPlannerMcpHandler::new(service.clone());
    let factory = move || -> Result<_, std::io::Error> { Ok(handler.clone()) };
    let session = Arc::new(
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default(),
    );
    let mcp_service = rmcp::transport::streamable_http_server::tower::StreamableHttpService::new(
        factory,
        session,
        rmcp::transport::streamable_http_server::tower::StreamableHttpServerConfig::default(),
    );

    let app = Router::new()
        .route("/health", get(crate::health))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(http::router(service))
        .nest_service("/mcp", mcp_service)
        .layer(axum::extract::DefaultBodyLimit::max(max_body_size));

    let addr = address_from(std::env::var("ADDRESS").ok());
    info!(%addr, max_body_bytes = max_body_size, "starting HTTP server");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };

    let server = axum::serve(listener, app.into_make_service());
    if let Err(e) = server
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!("failed to install ctrl+c handler: {e}");
            }
        })
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
