use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Response, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::events::StreamState;
use crate::lookup::{DocsResults, Lookup, MappingKind, MappingResults};

#[derive(Clone)]
pub struct AppState {
    lookup: Lookup,
    stream: watch::Receiver<StreamState>,
}

#[derive(Debug, Deserialize)]
pub struct McpRequest {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DocsRequest {
    pub query: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    stream: StreamState,
    documents: usize,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            message: message.into(),
        }),
    )
}

pub fn router(lookup: Lookup, stream: watch::Receiver<StreamState>) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/mcp", post(mcp))
        .route("/docs", post(docs))
        .route("/metrics", get(metrics))
        .with_state(AppState { lookup, stream })
}

/// Start the HTTP server and run until shutdown.
pub async fn serve(
    addr: SocketAddr,
    lookup: Lookup,
    stream: watch::Receiver<StreamState>,
) -> Result<()> {
    let app = router(lookup, stream);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind HTTP address {addr}"))?;
    tracing::info!(%addr, "lookup service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .with_context(|| format!("failed to run HTTP server on {addr}"))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        stream: *state.stream.borrow(),
        documents: state.lookup.index().docs().len(),
    })
}

async fn mcp(
    State(state): State<AppState>,
    Json(request): Json<McpRequest>,
) -> Result<Json<MappingResults>, ApiError> {
    if request.name.trim().is_empty() {
        return Err(bad_request("name is required"));
    }
    let kind: MappingKind = request
        .kind
        .parse()
        .map_err(|err: anyhow::Error| bad_request(err.to_string()))?;

    Ok(Json(state.lookup.mappings(
        kind,
        request.name.trim(),
        request.owner.as_deref(),
    )))
}

async fn docs(
    State(state): State<AppState>,
    Json(request): Json<DocsRequest>,
) -> Result<Json<DocsResults>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(bad_request("query is required"));
    }
    Ok(Json(state.lookup.docs(request.query.trim())))
}

async fn metrics() -> Result<Response<Body>, StatusCode> {
    match crate::telemetry::export_prometheus() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")
            .body(Body::from(body))
            .map_err(|err| {
                tracing::error!(error = %err, "failed to build metrics response");
                StatusCode::INTERNAL_SERVER_ERROR
            }),
        Err(err) => {
            tracing::error!(error = %err, "failed to export metrics");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
