mod bank;
mod handlers;
mod metrics;
mod routes;

use anyhow::Context;
use axum::Router;
use bank::{JsonBank, QuestionSource};
use gradex_judge::{JudgeClient, JudgeConfig, Runner};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub struct AppState {
    pub runner: Runner<JudgeClient>,
    pub tests: Box<dyn QuestionSource>,
    pub assignments: Box<dyn QuestionSource>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("gradex API booting...");

    let config = JudgeConfig::from_env();
    info!(
        judge_url = %config.base_url,
        poll_interval_ms = config.runner.poll.interval.as_millis() as u64,
        max_poll_attempts = config.runner.poll.max_attempts,
        "execution service configured"
    );

    let test_bank = std::env::var("GRADEX_TEST_BANK")
        .unwrap_or_else(|_| "config/tests.json".to_string());
    let assignment_bank = std::env::var("GRADEX_ASSIGNMENT_BANK")
        .unwrap_or_else(|_| "config/assignments.json".to_string());

    let tests =
        JsonBank::load("test", Path::new(&test_bank)).context("failed to load test bank")?;
    let assignments = JsonBank::load("assignment", Path::new(&assignment_bank))
        .context("failed to load assignment bank")?;

    let runner = Runner::new(JudgeClient::new(config.base_url.clone()), config.runner.clone());

    let state = Arc::new(AppState {
        runner,
        tests: Box::new(tests),
        assignments: Box::new(assignments),
    });

    // Build router
    let app = Router::new().merge(routes::routes()).with_state(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("HTTP server listening on {}", addr);
    info!("Ready to judge submissions");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
