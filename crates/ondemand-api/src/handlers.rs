//! HTTP handlers.
//!
//! Each handler delegates to [`Lifecycle`](ondemand_lifecycle::Lifecycle)
//! and serializes the result at the boundary.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::warn;

use ondemand_controller::ControllerError;

use crate::ApiState;

#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(err: &ControllerError) -> axum::response::Response {
    let status = if err.is_timeout() {
        StatusCode::GATEWAY_TIMEOUT
    } else {
        StatusCode::BAD_GATEWAY
    };
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
        .into_response()
}

/// POST /start
pub async fn start_instance(State(state): State<ApiState>) -> impl IntoResponse {
    match state.lifecycle.handle_start().await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            warn!(instance = %state.lifecycle.instance(), error = %e, "start failed");
            error_response(&e)
        }
    }
}

/// POST /stop
pub async fn stop_if_idle(State(state): State<ApiState>) -> impl IntoResponse {
    match state.lifecycle.handle_idle_stop().await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            warn!(instance = %state.lifecycle.instance(), error = %e, "idle-stop check failed");
            error_response(&e)
        }
    }
}

/// GET /status
pub async fn instance_status(State(state): State<ApiState>) -> impl IntoResponse {
    match state.lifecycle.status().await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            warn!(instance = %state.lifecycle.instance(), error = %e, "status query failed");
            error_response(&e)
        }
    }
}

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}
