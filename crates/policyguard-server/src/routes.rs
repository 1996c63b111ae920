//! HTTP API surface.
//!
//! One request operation: `POST /api/analyze-policy` with
//! `{ "policyUrl": string, "userId": integer }`. Missing fields are rejected
//! with a client error before any I/O; any pipeline failure surfaces as a
//! server error carrying a human-readable message. `GET /api/health` probes
//! store connectivity.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use policyguard_pipeline::{AnalysisOrchestrator, PolicyStore};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub store: Arc<dyn PolicyStore>,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/analyze-policy", post(analyze_policy_handler))
        .route("/api/health", get(health_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest {
    policy_url: Option<String>,
    user_id: Option<i64>,
}

async fn analyze_policy_handler(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = body else {
        return client_error("Request body must be JSON");
    };

    let (Some(policy_url), Some(user_id)) = (request.policy_url, request.user_id) else {
        return client_error("Missing policyUrl or userId");
    };

    match state.orchestrator.analyze(&policy_url, user_id).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) if err.is_client_error() => client_error(&err.to_string()),
        Err(err) => {
            tracing::error!(error = %err, policy_url, "analysis failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Analysis failed",
                    "message": err.to_string(),
                })),
            )
                .into_response()
        }
    }
}

async fn health_handler(State(state): State<AppState>) -> Response {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": Utc::now(),
            })),
        )
            .into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "error",
                    "message": "Database unavailable",
                })),
            )
                .into_response()
        }
    }
}

fn client_error(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use policyguard_core::{ChunkerConfig, Practice};
    use policyguard_pipeline::{FetchError, PatternClassifier, PolicyFetcher, SqliteStore};

    struct StaticFetcher(String);

    #[async_trait::async_trait]
    impl PolicyFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            Ok(self.0.clone())
        }
    }

    async fn test_state(policy_text: &str) -> AppState {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        store
            .upsert_rule(1, Practice::DataSelling, false, 10)
            .await
            .unwrap();

        let orchestrator = AnalysisOrchestrator::builder()
            .fetcher(Arc::new(StaticFetcher(policy_text.to_string())))
            .classifier(Arc::new(PatternClassifier::new()))
            .store(store.clone())
            .chunker(ChunkerConfig {
                min_tokens: 4,
                max_tokens: 8,
            })
            .build()
            .unwrap();

        AppState {
            orchestrator: Arc::new(orchestrator),
            store,
        }
    }

    fn json_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/analyze-policy")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_analyze_policy_returns_report() {
        let app = router(test_state("We sell your data to third parties.").await);

        let response = app
            .oneshot(json_request(
                r#"{"policyUrl": "https://example.com/privacy", "userId": 1}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["domain"], "example.com");
        assert!(body["risk_score"].as_u64().unwrap() > 0);
        assert_eq!(body["violations"][0]["user_rule"], true);
    }

    #[tokio::test]
    async fn test_missing_fields_rejected() {
        let app = router(test_state("irrelevant").await);

        let response = app
            .oneshot(json_request(r#"{"policyUrl": "https://example.com"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Missing policyUrl or userId");
    }

    #[tokio::test]
    async fn test_invalid_policy_url_is_client_error() {
        let app = router(test_state("irrelevant").await);

        let response = app
            .oneshot(json_request(r#"{"policyUrl": "not a url", "userId": 1}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_body_rejected() {
        let app = router(test_state("irrelevant").await);

        let response = app.oneshot(json_request("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_ok() {
        let app = router(test_state("irrelevant").await);

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }
}
