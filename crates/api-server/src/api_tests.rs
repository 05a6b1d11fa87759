#[cfg(test)]
mod tests {
    use super::super::*;
    use axum::http::Method;
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn test_app(refresh_mode: RefreshMode) -> Router {
        let mut config = ApiConfig::default();
        config.db_url = "sqlite::memory:".to_string();
        config.scheduler_interval = Duration::ZERO;
        config.refresh_mode = refresh_mode;
        config.forest.n_estimators = 25;

        let runtime = AppRuntime::init(config).await.unwrap();
        create_router(runtime.state())
    }

    async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
        send(app, Method::GET, uri).await
    }

    #[tokio::test]
    async fn test_health_and_banner() {
        let app = test_app(RefreshMode::Acknowledge).await;

        let (status, body) = get(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = get(&app, "/").await;
        assert_eq!(status, StatusCode::OK);
        let endpoints = body["endpoints"].as_array().unwrap();
        assert!(endpoints.iter().any(|e| e == "/ws/latest"));
        assert!(endpoints.iter().any(|e| e == "/api/v1/explain/{score_id}"));
    }

    #[tokio::test]
    async fn test_response_headers() {
        let app = test_app(RefreshMode::Acknowledge).await;

        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "req-abc-123")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-abc-123");
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(response.headers()["cache-control"], "no-store");

        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let generated = response.headers()["x-request-id"].to_str().unwrap();
        assert_eq!(generated.len(), 36);
    }

    #[tokio::test]
    async fn test_empty_store() {
        let app = test_app(RefreshMode::Acknowledge).await;

        let (status, body) = get(&app, "/api/v1/issuers").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));

        let (status, body) = get(&app, "/api/v1/scores").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let app = test_app(RefreshMode::Acknowledge).await;

        let (status, body) = get(&app, "/api/v1/issuers/99").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Issuer not found: 99");

        let (status, _) = get(&app, "/api/v1/scores/99/history").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = get(&app, "/api/v1/explain/1234").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Credit score not found: 1234");
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_rejected() {
        let app = test_app(RefreshMode::Acknowledge).await;
        let (status, _) = get(&app, "/api/v1/issuers/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_acknowledge_refresh_scores_nothing() {
        let app = test_app(RefreshMode::Acknowledge).await;

        let (status, body) = send(&app, Method::POST, "/api/v1/refresh").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body.get("report").is_none());

        let (_, scores) = get(&app, "/api/v1/scores").await;
        assert_eq!(scores, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_pipeline_refresh_end_to_end() {
        let app = test_app(RefreshMode::Pipeline).await;

        let (status, body) = send(&app, Method::POST, "/api/v1/refresh").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["report"]["scores"].as_array().unwrap().len(), 2);

        let (_, issuers) = get(&app, "/api/v1/issuers").await;
        let names: Vec<&str> = issuers
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["ABC Bank", "XYZ Steel"]);

        let (status, scores) = get(&app, "/api/v1/scores").await;
        assert_eq!(status, StatusCode::OK);
        let scores = scores.as_array().unwrap();
        assert_eq!(scores.len(), 2);
        for entry in scores {
            let score = entry["score"].as_f64().unwrap();
            assert!((300.0..=900.0).contains(&score));
            assert_eq!(entry["model_version"], "rf-1.0");
        }

        let (_, filtered) = get(&app, "/api/v1/scores?asset_class=Financials").await;
        let filtered = filtered.as_array().unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0]["issuer"], "ABC Bank");

        let (_, unfiltered) = get(&app, "/api/v1/scores?asset_class=").await;
        assert_eq!(unfiltered.as_array().unwrap().len(), 2);

        let issuer_id = filtered[0]["issuer_id"].as_i64().unwrap();
        let score_id = filtered[0]["score_id"].as_i64().unwrap();

        let (_, issuer) = get(&app, &format!("/api/v1/issuers/{issuer_id}")).await;
        assert_eq!(issuer["asset_class"], "Financials");

        let (status, history) = get(&app, &format!("/api/v1/scores/{issuer_id}/history")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history.as_array().unwrap().len(), 1);
        assert_eq!(history[0]["id"].as_i64().unwrap(), score_id);

        let (status, explanation) = get(&app, &format!("/api/v1/explain/{score_id}")).await;
        assert_eq!(status, StatusCode::OK);
        let rows = explanation.as_array().unwrap();
        assert_eq!(rows.len(), 6);
        let weights: Vec<f64> = rows.iter().map(|r| r["shap"].as_f64().unwrap().abs()).collect();
        assert!(weights.windows(2).all(|w| w[0] >= w[1]));
        let sentiment = rows.iter().find(|r| r["feature"] == "news_sentiment").unwrap();
        assert_eq!(sentiment["value"].as_f64().unwrap(), 0.35);
    }

    #[test]
    fn test_error_status_mapping() {
        let not_found = anyhow::Error::new(CreditError::issuer_not_found(1)).context("loading issuer");
        assert_eq!(AppError::from(not_found).status(), StatusCode::NOT_FOUND);

        assert_eq!(
            AppError::from(CreditError::ModelNotFitted).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::from(ScoringError::FeatureMismatch { expected: 6, actual: 4 }).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(CreditError::Database("locked".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(anyhow::anyhow!("disk on fire")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::with_status(StatusCode::CONFLICT, anyhow::anyhow!("busy")).status(),
            StatusCode::CONFLICT
        );
    }
}
