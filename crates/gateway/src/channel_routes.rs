//! Channel provisioning, reconciliation, and pairing.

use std::sync::Arc;

use {
    axum::{
        Json, Router,
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
        routing::{delete, get, post},
    },
    serde::Deserialize,
    serde_json::json,
};

use crate::{auth::OwnerId, error::ApiError, state::AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_channels).post(create_channel))
        .route("/sync", post(sync_channels))
        .route("/{id}", delete(delete_channel))
        .route("/{id}/state", get(channel_state))
        .route("/{id}/pairing", post(refresh_pairing))
}

async fn list_channels(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
) -> Result<impl IntoResponse, ApiError> {
    let channels = state.channels.store().list_for_owner(&owner.0).await?;
    Ok(Json(channels))
}

#[derive(Debug, Deserialize)]
struct CreateChannelRequest {
    display_name: String,
    phone_address: String,
}

async fn create_channel(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Json(req): Json<CreateChannelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.display_name.trim().is_empty() || req.phone_address.trim().is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "display_name and phone_address are required",
        ));
    }
    let provisioned = state
        .channels
        .provision(&owner.0, &req.display_name, &req.phone_address)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "channel created, scan the pairing code to connect",
            "channel": provisioned.channel,
            "qr_base64": provisioned.qr_base64,
        })),
    ))
}

async fn delete_channel(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.channels.remove(&owner.0, &id).await?;
    Ok(Json(json!({ "message": "channel deleted" })))
}

async fn channel_state(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let connection_state = state.channels.connection_state(&owner.0, &id).await?;
    Ok(Json(json!({ "state": connection_state })))
}

async fn refresh_pairing(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let artifact = state.channels.refresh_pairing(&owner.0, &id).await?;
    Ok(Json(json!({
        "qr_base64": artifact.qr_base64,
        "pairing_code": artifact.pairing_code,
    })))
}

async fn sync_channels(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
) -> Result<impl IntoResponse, ApiError> {
    let channels = state.channels.sync_owner(&owner.0).await?;
    Ok(Json(channels))
}
