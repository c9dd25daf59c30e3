//! HTTP API
//!
//! Read-only JSON view of the data store plus a Prometheus endpoint.

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::hub::Hub;
use crate::mqtt::MqttPublisher;
use crate::sunspec::{schema, Block, SharedStore};

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub hub: String,
    pub store: SharedStore,
    pub metrics: Option<PrometheusHandle>,
    pub mqtt: Option<Arc<MqttPublisher>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/quantities", get(list_quantities))
        .route("/api/quantities/:key", get(get_quantity))
        .route("/api/status", get(device_status))
        .route("/metrics", get(render_metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let store = state.store.read().await;
    let mut updated = serde_json::Map::new();
    for block in Block::ALL {
        updated.insert(block.to_string(), json!(store.last_updated(block)));
    }
    Json(json!({
        "status": "ok",
        "hub": state.hub,
        "quantities": store.len(),
        "updated": updated,
        "mqtt_connected": state.mqtt.as_ref().map(|mqtt| mqtt.is_connected()),
    }))
}

async fn list_quantities(State(state): State<AppState>) -> Response {
    let snapshot = state.store.read().await.snapshot();
    Json(snapshot).into_response()
}

async fn get_quantity(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    let Some((block, _)) = schema::find(&key) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown quantity '{}'", key) })),
        )
            .into_response();
    };

    let store = state.store.read().await;
    match store.get(&key) {
        Some(record) => Json(record.clone()).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": format!("{} block not read yet", block) })),
        )
            .into_response(),
    }
}

async fn device_status(State(state): State<AppState>) -> Response {
    match state.store.read().await.status() {
        Some(status) => Json(json!({
            "code": status.code(),
            "description": status.description(),
        }))
        .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "inverter not read yet" })),
        )
            .into_response(),
    }
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Serve the API until shutdown. The server counts as a hub consumer while it runs.
pub async fn serve(
    config: &ServerConfig,
    state: AppState,
    hub: Arc<Hub>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let mut updates = hub.subscribe().await;
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP API listening on {}", addr);

    // keep the subscription drained so it never lags
    let drain = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => debug!("API view refreshed at {}", update.timestamp),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
        .with_context(|| "HTTP server error")?;

    drain.abort();
    Ok(())
}
