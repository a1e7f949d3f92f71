//! Campaign CRUD and control actions.

use std::sync::Arc;

use {
    axum::{
        Json, Router,
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
    },
    serde::Deserialize,
    serde_json::json,
};

use outreach_campaigns::{CampaignDraft, ControlAction, ControlOutcome};

use crate::{auth::OwnerId, error::ApiError, state::AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_campaigns).post(create_campaign))
        .route("/{id}", get(campaign_details).delete(delete_campaign))
        .route("/{id}/control", post(control_campaign))
}

async fn list_campaigns(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
) -> Result<impl IntoResponse, ApiError> {
    let campaigns = state.campaigns.list(&owner.0).await?;
    Ok(Json(campaigns))
}

async fn create_campaign(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Json(draft): Json<CampaignDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let campaign = state.campaigns.create(&owner.0, draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "campaign created as draft",
            "campaign_id": campaign.id,
        })),
    ))
}

async fn campaign_details(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (campaign, recipients) = state.campaigns.details(&owner.0, &id).await?;
    Ok(Json(json!({
        "campaign": campaign,
        "recipients": recipients,
    })))
}

async fn delete_campaign(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.campaigns.delete(&owner.0, &id).await?;
    Ok(Json(json!({ "message": "campaign deleted" })))
}

#[derive(Debug, Deserialize)]
struct ControlRequest {
    action: ControlAction,
}

async fn control_campaign(
    State(state): State<Arc<AppState>>,
    owner: OwnerId,
    Path(id): Path<String>,
    Json(req): Json<ControlRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.campaigns.control(&owner.0, &id, req.action).await?;
    let response = match outcome {
        ControlOutcome::Accepted => (
            StatusCode::ACCEPTED,
            Json(json!({ "message": "campaign accepted for processing" })),
        ),
        ControlOutcome::Applied => (
            StatusCode::OK,
            Json(json!({ "message": "campaign status updated" })),
        ),
    };
    Ok(response)
}
