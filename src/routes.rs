use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::extract;
use crate::llm::CompletionProvider;
use crate::models::OcrRequest;

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn CompletionProvider>,
    /// Upper bound on a request body; card photos arrive base64-encoded.
    pub max_body_bytes: usize,
}

pub fn router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_body_bytes);
    Router::new()
        .route("/", get(root).head(status_check))
        .route("/ocr", post(ocr_endpoint))
        .layer(body_limit)
        .layer(middleware::from_fn(log_requests))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn log_requests(request: Request, next: Next) -> Response {
    let url = request_url(&request);
    tracing::info!("Incoming request: {} {}", request.method(), url);
    let response = next.run(request).await;
    tracing::info!(
        "Request to {} completed with status: {}",
        url,
        response.status().as_u16()
    );
    response
}

/// Absolute URL of the request, rebuilt from the `Host` header when the
/// request line only carries a path.
fn request_url(request: &Request) -> String {
    let uri = request.uri();
    if uri.authority().is_some() {
        return uri.to_string();
    }
    match request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
    {
        Some(host) => format!("http://{}{}", host, uri),
        None => uri.to_string(),
    }
}

async fn root() -> impl IntoResponse {
    Json(json!({"status": "OCR Backend is running"}))
}

async fn status_check() -> StatusCode {
    StatusCode::OK
}

async fn ocr_endpoint(State(state): State<AppState>, Json(req): Json<OcrRequest>) -> Response {
    match extract::extract_card(state.provider.as_ref(), &req.base64_image).await {
        Ok(fields) => (StatusCode::OK, Json(fields)).into_response(),
        Err(e) => {
            tracing::error!(error = ?e, "An error occurred during model processing: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": e.to_string()})),
            )
                .into_response()
        }
    }
}
