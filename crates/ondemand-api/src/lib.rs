//! ondemand-api — HTTP trigger surface for the lifecycle handlers.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/start` | Start the instance, returns `StartResult` |
//! | POST | `/stop` | Run the idle-stop check, returns `StopResult` |
//! | GET | `/status` | Describe the instance, returns `StatusResult` |
//! | GET | `/healthz` | Liveness probe |
//!
//! Success bodies are the result types themselves. A failed provider call
//! is a non-2xx response with `{"error": "..."}`; nothing is retried here.

pub mod handlers;

use axum::Router;
use axum::routing::{get, post};
use ondemand_lifecycle::Lifecycle;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub lifecycle: Lifecycle,
}

/// Build the complete API router.
pub fn build_router(lifecycle: Lifecycle) -> Router {
    let state = ApiState { lifecycle };

    Router::new()
        .route("/start", post(handlers::start_instance))
        .route("/stop", post(handlers::stop_if_idle))
        .route("/status", get(handlers::instance_status))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}
