//! Manual refresh trigger

use axum::{extract::State, routing::post, Extension, Json, Router};
use serde_json::{json, Value};

use crate::request_id::RequestId;
use crate::{AppError, AppState, RefreshMode};

pub fn refresh_routes() -> Router<AppState> {
    Router::new().route("/api/v1/refresh", post(refresh_scores))
}

async fn refresh_scores(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
) -> Result<Json<Value>, AppError> {
    match state.config.refresh_mode {
        RefreshMode::Acknowledge => {
            tracing::info!("Refresh {} acknowledged without a scoring run", request_id);
            Ok(Json(json!({ "status": "ok", "message": "Data refresh triggered" })))
        }
        RefreshMode::Pipeline => {
            tracing::info!("Refresh {} running scoring pipeline", request_id);
            let report = state.pipeline.run_cycle().await?;
            Ok(Json(json!({
                "status": "ok",
                "message": format!("Scored {} issuers", report.scores.len()),
                "report": report,
            })))
        }
    }
}
