//! Credit Intelligence API server
//!
//! Serves issuers, latest scores, score history and per-score attributions
//! over JSON, plus a WebSocket that announces when the score table changes.

pub mod config;
pub mod runtime;

mod issuer_routes;
mod refresh_routes;
mod request_id;
mod score_routes;
mod security_headers;
mod system_routes;
mod ws_routes;

#[cfg(test)]
mod api_tests;

use anyhow::Context;
use axum::{
    body::Body,
    http::{HeaderValue, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    Json, Router,
};
use credit_core::CreditError;
use credit_pipeline::ScoringPipeline;
use credit_store::CreditStore;
use scoring_engine::ScoringError;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{ApiConfig, RefreshMode};
pub use runtime::AppRuntime;

#[derive(Clone)]
pub struct AppState {
    pub store: CreditStore,
    pub pipeline: Arc<ScoringPipeline>,
    pub config: Arc<ApiConfig>,
}

/// Handler error carrying the HTTP status it should be reported with.
///
/// Anything convertible into `anyhow::Error` can be `?`-propagated; the status
/// is picked from the first `CreditError` or `ScoringError` in the chain.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: impl Into<anyhow::Error>) -> Self {
        Self {
            status,
            error: error.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

fn status_for(error: &anyhow::Error) -> StatusCode {
    for cause in error.chain() {
        if let Some(err) = cause.downcast_ref::<CreditError>() {
            return match err {
                CreditError::NotFound { .. } => StatusCode::NOT_FOUND,
                CreditError::ModelNotFitted => StatusCode::SERVICE_UNAVAILABLE,
                CreditError::InvalidData(_) => StatusCode::BAD_REQUEST,
                CreditError::Ingestion(_) | CreditError::Database(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
        }
        if let Some(err) = cause.downcast_ref::<ScoringError>() {
            return match err {
                ScoringError::ModelNotFitted => StatusCode::SERVICE_UNAVAILABLE,
                ScoringError::FeatureMismatch { .. } | ScoringError::InvalidTrainingSet(_) => {
                    StatusCode::BAD_REQUEST
                }
            };
        }
    }
    StatusCode::INTERNAL_SERVER_ERROR
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let error = err.into();
        Self {
            status: status_for(&error),
            error,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed ({}): {:#}", self.status, self.error);
        } else {
            tracing::debug!("Request rejected ({}): {}", self.status, self.error);
        }

        let body = Json(serde_json::json!({ "error": self.error.to_string() }));
        (self.status, body).into_response()
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    // a wildcard cannot be combined with credentials, so it wins outright
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .merge(system_routes::system_routes())
        .merge(issuer_routes::issuer_routes())
        .merge(score_routes::score_routes())
        .merge(refresh_routes::refresh_routes())
        .merge(ws_routes::ws_routes())
        .with_state(state)
        .layer(middleware::from_fn(security_headers::security_headers_middleware))
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .layer(cors)
}

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("Starting Credit Intelligence API");

    let config = ApiConfig::from_env().context("Invalid configuration")?;
    let addr = config.bind_address();

    let runtime = AppRuntime::init(config).await?;
    let app = create_router(runtime.state());

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    runtime.shutdown().await;
    Ok(())
}
