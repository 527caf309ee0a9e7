use std::sync::Arc;

use gemini_client::config::Config;
use meal_planner_mcp::middleware::generation_client;
use meal_planner_mcp::{InMemoryPlanStore, MealPlanService, MealPlannerMcpHandler, PlannerSettings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configure logging from env var `MEAL_PLANNER_LOG_LEVEL` (or fallback to `RUST_LOG`, default `info`).
    let log_env = std::env::var("MEAL_PLANNER_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());

    // Append per-target overrides to keep rmcp internals quiet by default
    let combined_filter = format!("{},rmcp=warn,serve_inner=warn", log_env);
    let env_filter = tracing_subscriber::EnvFilter::try_new(combined_filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,rmcp=warn,serve_inner=warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::info!("meal_planner_mcp: log filter: {}", log_env);

    let config = match Config::from_env() {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            tracing::warn!(error = %e, "generation backend not configured; every plan will use the fallback");
            None
        }
    };
    let client = generation_client(config.as_ref())?;
    let settings = PlannerSettings::from_env()?;
    let service = MealPlanService::new(Arc::new(InMemoryPlanStore::new()), client, settings);
    let handler = MealPlannerMcpHandler::new(Arc::new(service));

    tracing::info!(
        "meal_planner_mcp: registered {} tools",
        handler.tool_count()
    );

    // stdio transport; stdout carries the protocol, logs go to stderr
    tracing::info!("meal_planner_mcp: starting stdio MCP server...");
    let transport = (tokio::io::stdin(), tokio::io::stdout());
    let server = rmcp::serve_server(handler, transport).await?;

    tracing::info!("meal_planner_mcp: service initialized as server");

    server.waiting().await?;

    Ok(())
}
