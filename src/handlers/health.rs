// src/handlers/health.rs

use axum::{
    Json,
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;

use crate::config::AppState;

// GET /health
pub async fn health(State(app_state): State<AppState>) -> Response {
    let uptime = app_state.started_at.elapsed().as_secs_f64();

    match sqlx::query("SELECT 1").execute(&app_state.db_pool).await {
        Ok(_) => Json(json!({
            "success": true,
            "status": "healthy",
            "timestamp": Utc::now().to_rfc3339(),
            "uptime": uptime,
            "environment": app_state.config.environment.name(),
            "version": env!("CARGO_PKG_VERSION"),
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "status": "unhealthy",
                    "timestamp": Utc::now().to_rfc3339(),
                    "error": "Database connection failed",
                })),
            )
                .into_response()
        }
    }
}

pub async fn not_found(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": "Route not found",
            "path": uri.path(),
        })),
    )
        .into_response()
}
