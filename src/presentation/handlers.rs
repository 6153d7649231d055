// HTTP request handlers
use crate::infrastructure::chunked_json::stream_from_updates;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::infrastructure::view_mapper::dashboard_to_dto;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct AutoRefreshRequest {
    pub enabled: bool,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current dashboard
pub async fn get_dashboard(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let dashboard = state.monitor.dashboard().await;
    respond(&dashboard_to_dto(&dashboard), accepts_brotli(&headers)).await
}

/// Stream the dashboard, then every update as it is applied
pub async fn stream_dashboard(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    // subscribe first so no update slips between the snapshot and the stream
    let rx = state.monitor.subscribe();
    let initial = dashboard_to_dto(&state.monitor.dashboard().await);
    stream_from_updates(initial, rx, accepts_brotli(&headers))
}

/// Manual refresh. A failed fetch is reported inside the dashboard.
pub async fn refresh(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    if let Err(e) = state.monitor.poll().await {
        tracing::debug!("Manual refresh failed: {}", e);
    }
    let dashboard = state.monitor.dashboard().await;
    respond(&dashboard_to_dto(&dashboard), accepts_brotli(&headers)).await
}

pub async fn set_auto_refresh(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AutoRefreshRequest>,
) -> StatusCode {
    state.monitor.set_auto_refresh(request.enabled).await;
    StatusCode::NO_CONTENT
}

async fn respond<T: serde::Serialize>(data: &T, compress: bool) -> axum::response::Response {
    match json_response(data, compress).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}
