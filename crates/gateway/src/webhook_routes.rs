//! Provider webhook ingress.

use std::sync::Arc;

use {
    axum::{body::Bytes, extract::State, http::StatusCode},
    tracing::debug,
};

use outreach_channels::ProviderEvent;

use crate::state::AppState;

/// Acknowledge immediately regardless of downstream outcome, then process
/// on a detached task. Malformed payloads are logged and dropped — a non-200
/// here would only provoke provider-side retry storms.
pub async fn provider_webhook(State(state): State<Arc<AppState>>, body: Bytes) -> StatusCode {
    match serde_json::from_slice::<ProviderEvent>(&body) {
        Ok(event) => {
            let webhook = Arc::clone(&state.webhook);
            tokio::spawn(async move {
                webhook.process(event).await;
            });
        },
        Err(e) => debug!(error = %e, "unparseable webhook payload, ignored"),
    }
    StatusCode::OK
}
