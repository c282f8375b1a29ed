//! Minimal HTTP front end.
//!
//! - `GET /` returns a plain-text banner
//! - `GET /healthz` returns `{"status": "ok"}`
//! - `POST /predict` takes `{"text": "..."}` and returns a verdict
//!
//! `/predict` accepts cross-origin calls from any origin and marks its
//! responses as reachable from public pages on a private network, so a
//! browser extension can call a server on localhost.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::map_response,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{error, info};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::classifier::{Classify, Verdict};

pub const BANNER: &str = "Toxic Comment Detector API";

const PRIVATE_NETWORK_HEADER: &str = "access-control-allow-private-network";

#[derive(Clone)]
pub struct AppState {
    classifier: Arc<dyn Classify>,
}

impl AppState {
    pub fn new(classifier: Arc<dyn Classify>) -> Self {
        Self { classifier }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let predict_routes = Router::new()
        .route("/predict", post(predict))
        .layer(cors)
        .layer(map_response(add_private_network_header));

    Router::new()
        .route("/", get(home))
        .route("/healthz", get(healthz))
        .merge(predict_routes)
        .with_state(state)
}

/// Binds `addr` and serves until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("toxiscore listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn home() -> &'static str {
    BANNER
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn add_private_network_header(mut response: Response) -> Response {
    response.headers_mut().insert(
        HeaderName::from_static(PRIVATE_NETWORK_HEADER),
        HeaderValue::from_static("true"),
    );
    response
}

/// Pulls the comment out of a request body. Anything that is not a JSON
/// object with a string `text` field counts as missing input.
fn extract_text(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value.as_object()?.get("text")?.as_str().map(str::to_string)
}

async fn predict(State(state): State<AppState>, body: Bytes) -> Response {
    let Some(text) = extract_text(&body) else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "Text input is missing" }))).into_response();
    };
    info!("Received text: {}", text);

    let classifier = Arc::clone(&state.classifier);
    let result = tokio::task::spawn_blocking(move || classifier.classify(&text)).await;

    match result {
        Ok(Ok(verdict)) => {
            info!("Sending result: {}", verdict_summary(&verdict));
            Json(verdict).into_response()
        }
        Ok(Err(e)) => internal_error(&e),
        Err(join_error) => internal_error(&join_error),
    }
}

fn verdict_summary(verdict: &Verdict) -> String {
    serde_json::to_string(verdict).unwrap_or_else(|_| verdict.label.to_string())
}

fn internal_error(err: &dyn std::fmt::Display) -> Response {
    error!("Exception in /predict: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal Server Error", "message": err.to_string() })),
    )
        .into_response()
}
