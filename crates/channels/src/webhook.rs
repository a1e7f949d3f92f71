//! Processing of provider-pushed connectivity events.
//!
//! The HTTP handler acknowledges immediately and hands the parsed payload to
//! [`WebhookReceiver::process`] on a detached task; failures here are logged
//! and never surface back to the provider.

use std::sync::Arc;

use {
    serde::Deserialize,
    tracing::{debug, warn},
};

use crate::registry::ChannelRegistry;

/// Event payload pushed by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEvent {
    pub event: String,
    /// Provider-facing channel identity.
    #[serde(rename = "instance", alias = "instanceName")]
    pub external_name: Option<String>,
    #[serde(default)]
    pub data: ProviderEventData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderEventData {
    pub state: Option<String>,
}

/// Ingress for asynchronous provider events.
pub struct WebhookReceiver {
    registry: Arc<ChannelRegistry>,
}

impl WebhookReceiver {
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        Self { registry }
    }

    /// Handle one provider event. Unknown event kinds and unknown channels
    /// are ignored; registry failures are logged only.
    pub async fn process(&self, event: ProviderEvent) {
        match event.event.as_str() {
            "connection.update" => {
                let (Some(external_name), Some(state)) = (event.external_name, event.data.state)
                else {
                    debug!("connection.update missing channel name or state, ignored");
                    return;
                };
                match self
                    .registry
                    .apply_connection_update(&external_name, &state)
                    .await
                {
                    Ok(Some(_)) => debug!(external_name, state, "channel status updated"),
                    Ok(None) => {},
                    Err(e) => warn!(external_name, error = %e, "webhook processing failed"),
                }
            },
            other => debug!(event = other, "unhandled provider event"),
        }
    }
}
