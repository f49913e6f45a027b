//! Local file gateway.
//!
//! Serves `GET /api/documents/:id/file` by streaming the PDF from the backend,
//! so a browser-based reader can open documents from the same origin.

use crate::api::{ApiClient, ApiError};
use crate::config::GatewayConfig;
use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const DEFAULT_CONTENT_TYPE: &str = "application/pdf";
const DEFAULT_CONTENT_DISPOSITION: &str = "inline; filename=\"document.pdf\"";

/// Shared state of the gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub client: Arc<ApiClient>,
}

/// Build the gateway router.
pub fn router(client: Arc<ApiClient>) -> Router {
    Router::new()
        .route(&ApiClient::document_file_path(":id"), get(document_file))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(GatewayState { client })
}

/// Bind `config.host:config.port` and serve until the process exits.
pub async fn serve(client: Arc<ApiClient>, config: &GatewayConfig) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("File gateway listening on http://{}", addr);
    info!("Proxying to {}", client.base_url());

    axum::serve(listener, router(client))
        .await
        .context("File gateway stopped unexpectedly")
}

async fn health(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "backend": state.client.base_url(),
    }))
}

async fn document_file(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.client.fetch_document_file(&id).await {
        Ok(upstream) => forward_file(upstream),
        Err(ApiError::Status { status, message }) => {
            warn!("Backend refused file {}: {} {}", id, status, message);
            empty_response(status)
        }
        Err(ApiError::InvalidId { .. }) => {
            warn!("Refusing file request for invalid id {:?}", id);
            empty_response(StatusCode::BAD_REQUEST)
        }
        Err(e) => {
            error!("Failed to fetch file {}: {}", id, e);
            empty_response(StatusCode::BAD_GATEWAY)
        }
    }
}

fn forward_file(upstream: reqwest::Response) -> Response {
    let content_type = header_or(&upstream, header::CONTENT_TYPE, DEFAULT_CONTENT_TYPE);
    let disposition = header_or(
        &upstream,
        header::CONTENT_DISPOSITION,
        DEFAULT_CONTENT_DISPOSITION,
    );

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(upstream.bytes_stream()),
    )
        .into_response()
}

fn header_or(
    upstream: &reqwest::Response,
    name: header::HeaderName,
    default: &'static str,
) -> HeaderValue {
    upstream
        .headers()
        .get(&name)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(default))
}

fn empty_response(status: StatusCode) -> Response {
    (status, Body::empty()).into_response()
}
