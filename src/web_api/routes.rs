//! API Routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::detection_box_store::ItemDraft;
use crate::inventory_store::InventoryItem;
use crate::models::ApiResponse;
use crate::state::AppState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(super::health_check))
        // Detections
        .route("/api/detections", get(list_detections))
        .route("/api/detections/:id/select", post(select_box))
        // Inventory
        .route("/api/inventory", get(list_inventory))
        .route("/api/inventory", post(add_item))
        .route("/api/inventory/:id", delete(remove_item))
        .route("/api/inventory/undo", post(undo_delete))
        // Polling controls
        .route("/api/polling/status", get(polling_status))
        .route("/api/polling/start", post(start_polling))
        .route("/api/polling/stop", post(stop_polling))
        .with_state(state)
}

// ========================================
// Detection Handlers
// ========================================

async fn list_detections(State(state): State<AppState>) -> impl IntoResponse {
    let boxes = state.box_store.snapshot().await;
    Json(ApiResponse::success(boxes))
}

async fn select_box(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let outcome = state.box_store.select(&id).await;
    Json(ApiResponse::success(outcome))
}

// ========================================
// Inventory Handlers
// ========================================

async fn list_inventory(State(state): State<AppState>) -> impl IntoResponse {
    let items = state.inventory.snapshot().await;
    let has_pending = state.inventory.has_pending().await;

    Json(ApiResponse::success(json!({
        "items": items,
        "has_pending": has_pending,
    })))
}

async fn add_item(
    State(state): State<AppState>,
    Json(draft): Json<ItemDraft>,
) -> impl IntoResponse {
    let item = InventoryItem {
        id: draft.id,
        name: draft.name,
        category: draft.category,
        added_at: Utc::now(),
        expiration_date: draft.expiration_date,
    };

    match state.inventory.add(item.clone()).await {
        Ok(()) => (StatusCode::CREATED, Json(ApiResponse::success(item))).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn remove_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.inventory.remove(&id).await {
        Ok(()) => Json(ApiResponse::success(json!({ "removed": id }))).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn undo_delete(State(state): State<AppState>) -> impl IntoResponse {
    let restored = state.inventory.undo().await;
    Json(ApiResponse::success(json!({ "restored": restored })))
}

// ========================================
// Polling Handlers
// ========================================

#[derive(Debug, Default, Deserialize)]
struct StartPollingRequest {
    interval_ms: Option<u64>,
}

async fn polling_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.scheduler.status().await;
    Json(ApiResponse::success(status))
}

async fn start_polling(
    State(state): State<AppState>,
    req: Option<Json<StartPollingRequest>>,
) -> impl IntoResponse {
    let interval_ms = req
        .and_then(|Json(r)| r.interval_ms)
        .unwrap_or(state.config.poll_interval_ms);

    state
        .scheduler
        .start(Duration::from_millis(interval_ms))
        .await;

    Json(ApiResponse::success(json!({ "interval_ms": interval_ms })))
}

async fn stop_polling(State(state): State<AppState>) -> impl IntoResponse {
    state.scheduler.stop().await;
    Json(ApiResponse::<()>::success(()))
}
