//! Service banner and health check

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

const ENDPOINTS: &[&str] = &[
    "/api/v1/issuers",
    "/api/v1/issuers/{id}",
    "/api/v1/scores",
    "/api/v1/scores/{issuer_id}/history",
    "/api/v1/explain/{score_id}",
    "/api/v1/refresh",
    "/health",
    "/ws/latest",
];

pub fn system_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Credit Intelligence Backend is running",
        "version": env!("CARGO_PKG_VERSION"),
        "docs": "/",
        "features": [
            "Issuer-level and asset-class-level scores",
            "Per-feature TreeSHAP explanations",
            "Historical score trends",
            "WebSocket live updates",
        ],
        "endpoints": ENDPOINTS,
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "Backend is healthy" }))
}
