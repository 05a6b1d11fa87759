//! Issuer API Routes

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use credit_core::CreditError;
use credit_store::Issuer;

use crate::{AppError, AppState};

pub fn issuer_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/issuers", get(list_issuers))
        .route("/api/v1/issuers/:issuer_id", get(get_issuer))
}

async fn list_issuers(State(state): State<AppState>) -> Result<Json<Vec<Issuer>>, AppError> {
    Ok(Json(state.store.list_issuers().await?))
}

async fn get_issuer(
    State(state): State<AppState>,
    Path(issuer_id): Path<i64>,
) -> Result<Json<Issuer>, AppError> {
    let issuer = state
        .store
        .get_issuer(issuer_id)
        .await?
        .ok_or(CreditError::issuer_not_found(issuer_id))?;
    Ok(Json(issuer))
}
