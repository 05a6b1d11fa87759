//! Score API Routes
//!
//! Latest score per issuer, an issuer's score history and the strongest
//! feature attributions behind one score.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use credit_core::CreditError;
use credit_store::{AttributionView, LatestScore, ScorePoint};
use serde::Deserialize;

use crate::{AppError, AppState};

/// Attributions returned per explanation
const EXPLAIN_TOP_N: usize = 8;

#[derive(Deserialize)]
pub struct ScoresQuery {
    pub asset_class: Option<String>,
}

pub fn score_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/scores", get(latest_scores))
        .route("/api/v1/scores/:issuer_id/history", get(score_history))
        .route("/api/v1/explain/:score_id", get(explain_score))
}

async fn latest_scores(
    State(state): State<AppState>,
    Query(query): Query<ScoresQuery>,
) -> Result<Json<Vec<LatestScore>>, AppError> {
    // an empty filter means no filter
    let asset_class = query.asset_class.as_deref().filter(|s| !s.is_empty());
    Ok(Json(state.store.latest_scores(asset_class).await?))
}

async fn score_history(
    State(state): State<AppState>,
    Path(issuer_id): Path<i64>,
) -> Result<Json<Vec<ScorePoint>>, AppError> {
    if state.store.get_issuer(issuer_id).await?.is_none() {
        return Err(CreditError::issuer_not_found(issuer_id).into());
    }
    Ok(Json(state.store.score_history(issuer_id).await?))
}

async fn explain_score(
    State(state): State<AppState>,
    Path(score_id): Path<i64>,
) -> Result<Json<Vec<AttributionView>>, AppError> {
    if state.store.get_score(score_id).await?.is_none() {
        return Err(CreditError::score_not_found(score_id).into());
    }
    Ok(Json(state.store.top_attributions(score_id, EXPLAIN_TOP_N).await?))
}
