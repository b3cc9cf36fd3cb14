//! Bill Extractor - maps Veryfi document extraction onto a billing line-item schema.

mod config;
mod error;
mod mapper;
mod schema;
mod veryfi;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use config::{AppConfig, MappingPolicy};
use error::ExtractError;
use schema::{ExtractRequest, ExtractResponse, FailureResponse};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, Instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use veryfi::{DocumentProvider, VeryfiClient};

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    provider: Arc<dyn DocumentProvider>,
    mapping: MappingPolicy,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "bill_extractor=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    let veryfi = VeryfiClient::new(config.veryfi.clone())?;
    info!("Veryfi client initialized");

    let state = AppState {
        provider: Arc::new(veryfi),
        mapping: config.mapping,
    };

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/extract-bill-data", post(extract_bill_data))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Send the document URL to the provider and return mapped bill data.
async fn extract_bill_data(
    State(state): State<AppState>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            error!("Rejected request body: {}", rejection.body_text());
            let body = FailureResponse::new(format!("Invalid request body. {}", rejection.body_text()));
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response();
        }
    };

    let request_id = uuid::Uuid::new_v4();
    let span = info_span!("extract", %request_id, provider = state.provider.name());

    async move {
        match run_extraction(&state, &req.document).await {
            Ok(response) => {
                info!(
                    "Extraction complete: {} items",
                    response.data.total_item_count
                );
                (StatusCode::OK, Json(response)).into_response()
            }
            Err(e) => {
                error!("Extraction failed ({}): {}", e.status_code(), e);
                e.into_response()
            }
        }
    }
    .instrument(span)
    .await
}

async fn run_extraction(state: &AppState, document_url: &str) -> Result<ExtractResponse, ExtractError> {
    info!("Received document: {}", document_url);
    let raw = state.provider.process_document_url(document_url).await?;
    let data = mapper::map_document(&raw, &state.mapping)?;
    Ok(ExtractResponse::success(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Provider stand-in that replays a fixed outcome.
    struct StubProvider {
        outcome: fn() -> Result<Value, ExtractError>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl DocumentProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn process_document_url(&self, _file_url: &str) -> Result<Value, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    fn app_with(outcome: fn() -> Result<Value, ExtractError>) -> (Router, Arc<StubProvider>) {
        let provider = Arc::new(StubProvider {
            outcome,
            calls: AtomicUsize::new(0),
        });
        let state = AppState {
            provider: provider.clone(),
            mapping: MappingPolicy::default(),
        };
        (router(state), provider)
    }

    fn extract_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/extract-bill-data")
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    const DOCUMENT: &str = r#"{"document": "https://example.com/bill.pdf"}"#;

    #[tokio::test]
    async fn test_success_envelope() {
        let (app, provider) = app_with(|| {
            Ok(json!({
                "line_items": [
                    {"description": "Paracetamol", "total": "12.50", "price": 6.25, "quantity": 2}
                ],
                "vendor": {"name": "City Pharmacy"},
                "total": 12.50
            }))
        });

        let (status, body) = send(app, extract_request(DOCUMENT)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            body,
            json!({
                "is_success": true,
                "token_usage": {"total_tokens": 0, "input_tokens": 0, "output_tokens": 0},
                "data": {
                    "pagewise_line_items": [{
                        "page_no": "1",
                        "page_type": "Pharmacy",
                        "bill_items": [{
                            "item_name": "Paracetamol",
                            "item_amount": 12.5,
                            "item_rate": 6.25,
                            "item_quantity": 2.0
                        }]
                    }],
                    "total_item_count": 1,
                    "reconciled_amount": 12.5
                }
            })
        );
    }

    #[tokio::test]
    async fn test_configuration_error_envelope() {
        let (app, _) = app_with(|| {
            Err(ExtractError::Configuration(
                "Veryfi credentials not configured".to_string(),
            ))
        });

        let (status, body) = send(app, extract_request(DOCUMENT)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({
                "is_success": false,
                "message": "Failed to process document. Veryfi credentials not configured"
            })
        );
    }

    #[tokio::test]
    async fn test_provider_error_envelope() {
        let (app, _) = app_with(|| {
            Err(ExtractError::Provider {
                status: 404,
                body: r#"{"error":"not found"}"#.to_string(),
            })
        });

        let (status, body) = send(app, extract_request(DOCUMENT)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["is_success"], json!(false));
        let message = body["message"].as_str().unwrap();
        assert!(message.starts_with("Failed to process document."));
        assert!(message.contains(r#"{"error":"not found"}"#));
    }

    #[tokio::test]
    async fn test_mapping_error_envelope() {
        let (app, _) = app_with(|| Ok(json!({"line_items": [{"total": "n/a"}]})));

        let (status, body) = send(app, extract_request(DOCUMENT)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["is_success"], json!(false));
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_invalid_body_skips_provider() {
        let (app, provider) = app_with(|| Ok(json!({})));

        let (status, body) = send(app, extract_request(r#"{"url": "x"}"#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["is_success"], json!(false));
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request body."));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app_with(|| Ok(json!({})));
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
