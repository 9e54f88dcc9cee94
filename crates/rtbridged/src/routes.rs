//! HTTP command surface.
//!
//! Two propagation policies, visible in the response codes: the
//! single-ticket route surfaces typed failures as error statuses, the
//! batch sync route always answers 200 and reports failures only
//! through its counters.

use crate::server::AppStateArc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use rtbridge_common::{
    BridgeError, DeviceSnapshot, InventoryAction, SyncOutcome, TicketOutcome, VERSION,
};
use serde::{Deserialize, Serialize};
use tracing::info;

pub fn api_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/ticket/create", post(create_ticket))
        .route("/v1/assets/sync", post(sync_assets))
        .route("/v1/devices", get(list_devices))
        .route("/v1/devices", put(upsert_device))
        .route("/v1/devices/:id", delete(remove_device))
}

#[derive(Debug, Deserialize)]
struct CreateTicketRequest {
    #[serde(default)]
    device_id: String,
    subject: String,
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct SyncRequest {
    #[serde(default)]
    device_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    version: &'static str,
    devices: usize,
}

#[derive(Debug, Serialize)]
struct UpsertResponse {
    device_id: String,
    action: InventoryAction,
}

fn error_status(err: &BridgeError) -> StatusCode {
    match err {
        BridgeError::DeviceNotFound(_) => StatusCode::NOT_FOUND,
        BridgeError::Connection(_) | BridgeError::Auth(_) | BridgeError::Api { .. } => {
            StatusCode::BAD_GATEWAY
        }
    }
}

async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    use crate::inventory::Inventory;
    Json(HealthResponse {
        version: VERSION,
        devices: state.registry.list_devices().await.len(),
    })
}

async fn create_ticket(
    State(state): State<AppStateArc>,
    Json(req): Json<CreateTicketRequest>,
) -> Result<Json<TicketOutcome>, (StatusCode, String)> {
    info!("ticket request for device {:?}: {}", req.device_id, req.subject);
    state
        .coordinator
        .create_or_update_ticket(&req.device_id, &req.subject, &req.text)
        .await
        .map(Json)
        .map_err(|err| (error_status(&err), err.to_string()))
}

async fn sync_assets(
    State(state): State<AppStateArc>,
    req: Option<Json<SyncRequest>>,
) -> Json<SyncOutcome> {
    let req = req.map(|Json(r)| r).unwrap_or_default();
    let outcome = state.coordinator.sync_assets(req.device_id.as_deref()).await;
    Json(outcome)
}

async fn list_devices(State(state): State<AppStateArc>) -> Json<Vec<DeviceSnapshot>> {
    use crate::inventory::Inventory;
    Json(state.registry.list_devices().await)
}

async fn upsert_device(
    State(state): State<AppStateArc>,
    Json(snapshot): Json<DeviceSnapshot>,
) -> Result<(StatusCode, Json<UpsertResponse>), (StatusCode, String)> {
    if snapshot.id.trim().is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "device id must not be empty".to_string(),
        ));
    }
    let device_id = snapshot.id.clone();
    let action = state.registry.upsert(snapshot).await;
    let status = match action {
        InventoryAction::Added => StatusCode::CREATED,
        _ => StatusCode::OK,
    };
    Ok((status, Json(UpsertResponse { device_id, action })))
}

async fn remove_device(
    State(state): State<AppStateArc>,
    Path(id): Path<String>,
) -> StatusCode {
    if state.registry.remove(&id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
