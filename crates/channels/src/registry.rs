//! Provisioning and reconciliation of channels against provider truth.

use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use tracing::{debug, info, warn};

use {
    outreach_broadcast::{Event, ProgressBroadcaster},
    outreach_provider::{PairingArtifact, ProviderClient},
};

use crate::{
    error::{Error, Result},
    store::ChannelStore,
    types::Channel,
};

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Freshly provisioned channel plus the pairing artifact to show the user.
#[derive(Debug)]
pub struct Provisioned {
    pub channel: Channel,
    pub qr_base64: Option<String>,
}

/// Owns the local channel cache and keeps it consistent with the provider.
///
/// The provider is the sole source of truth for connectivity fields; the
/// registry only ever overwrites local values with provider values.
pub struct ChannelRegistry {
    store: Arc<dyn ChannelStore>,
    provider: Arc<dyn ProviderClient>,
    broadcaster: Arc<ProgressBroadcaster>,
}

impl ChannelRegistry {
    pub fn new(
        store: Arc<dyn ChannelStore>,
        provider: Arc<dyn ProviderClient>,
        broadcaster: Arc<ProgressBroadcaster>,
    ) -> Self {
        Self {
            store,
            provider,
            broadcaster,
        }
    }

    pub fn store(&self) -> &Arc<dyn ChannelStore> {
        &self.store
    }

    /// Provision a channel with the provider and persist the local record.
    pub async fn provision(
        &self,
        owner_id: &str,
        display_name: &str,
        phone_address: &str,
    ) -> Result<Provisioned> {
        let provisioned = self
            .provider
            .create_channel(display_name, phone_address)
            .await?;

        let channel = Channel {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            display_name: display_name.to_string(),
            external_name: provisioned.external_name,
            phone_address: phone_address.to_string(),
            pairing_secret: provisioned.pairing_secret,
            status: "pending".to_string(),
            external_owner_address: None,
            profile_name: None,
            webhook_url: None,
            created_at_ms: now_ms(),
        };
        self.store.insert(&channel).await?;
        info!(channel = %channel.id, external = %channel.external_name, "channel provisioned");

        Ok(Provisioned {
            channel,
            qr_base64: provisioned.qr_base64,
        })
    }

    /// Deprovision with the provider, then drop the local record.
    ///
    /// A channel already gone on the provider side still deletes locally.
    pub async fn remove(&self, owner_id: &str, channel_id: &str) -> Result<()> {
        let channel = self
            .store
            .get_for_owner(channel_id, owner_id)
            .await?
            .ok_or_else(|| Error::channel_not_found(channel_id))?;

        match self.provider.delete_channel(&channel.external_name).await {
            Ok(()) => {},
            Err(e) if e.is_not_found() => {
                warn!(external = %channel.external_name, "channel already gone on provider");
            },
            Err(e) => return Err(e.into()),
        }

        self.store.delete(&channel.id).await?;
        info!(channel = %channel.id, "channel removed");
        Ok(())
    }

    /// Provider-reported connection state for an owned channel.
    pub async fn connection_state(&self, owner_id: &str, channel_id: &str) -> Result<String> {
        let channel = self
            .store
            .get_for_owner(channel_id, owner_id)
            .await?
            .ok_or_else(|| Error::channel_not_found(channel_id))?;
        Ok(self.provider.connection_state(&channel.external_name).await?)
    }

    /// Fetch a fresh pairing artifact for an owned channel.
    pub async fn refresh_pairing(
        &self,
        owner_id: &str,
        channel_id: &str,
    ) -> Result<PairingArtifact> {
        let channel = self
            .store
            .get_for_owner(channel_id, owner_id)
            .await?
            .ok_or_else(|| Error::channel_not_found(channel_id))?;
        Ok(self.provider.request_pairing(&channel.external_name).await?)
    }

    /// Reconcile all channels of one owner against the provider's bulk
    /// listing, overwriting local connectivity fields where a provider
    /// record matches by external name. Returns the refreshed local list.
    pub async fn sync_owner(&self, owner_id: &str) -> Result<Vec<Channel>> {
        let provider_channels = self.provider.list_channels().await?;
        let local = self.store.list_for_owner(owner_id).await?;

        for channel in &local {
            let Some(remote) = provider_channels
                .iter()
                .find(|p| p.external_name == channel.external_name)
            else {
                debug!(external = %channel.external_name, "no provider record for channel");
                continue;
            };
            let status = remote.connection_status.as_deref().unwrap_or(&channel.status);
            self.store
                .apply_reconciliation(
                    &channel.id,
                    status,
                    remote.owner_jid.as_deref(),
                    remote.profile_name.as_deref(),
                )
                .await?;
        }
        info!(owner_id, count = local.len(), "channels reconciled");

        self.store.list_for_owner(owner_id).await
    }

    /// Apply a provider-pushed connectivity update and notify the owner's
    /// observers. Unknown channels are ignored.
    pub async fn apply_connection_update(
        &self,
        external_name: &str,
        state: &str,
    ) -> Result<Option<Channel>> {
        let Some(channel) = self
            .store
            .set_status_by_external_name(external_name, state)
            .await?
        else {
            debug!(external_name, "connection update for unknown channel, ignored");
            return Ok(None);
        };

        self.broadcaster.emit(&channel.owner_id, Event::ChannelStatusUpdate {
            channel_name: channel.external_name.clone(),
            status: channel.status.clone(),
        });
        Ok(Some(channel))
    }
}
