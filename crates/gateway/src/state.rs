use std::sync::Arc;

use {async_trait::async_trait, sqlx::SqlitePool};

use {
    outreach_broadcast::ProgressBroadcaster,
    outreach_campaigns::{CampaignService, ChannelDirectory, SqliteCampaignStore},
    outreach_channels::{ChannelRegistry, ChannelStore, SqliteChannelStore, WebhookReceiver},
    outreach_provider::ProviderClient,
};

/// Shared state handed to every handler.
pub struct AppState {
    pub campaigns: Arc<CampaignService>,
    pub channels: Arc<ChannelRegistry>,
    pub webhook: Arc<WebhookReceiver>,
    pub broadcaster: Arc<ProgressBroadcaster>,
}

impl AppState {
    /// Wire up stores, registry, engine, and broadcaster over a shared pool.
    /// Migrations must already have been run on the pool.
    pub fn build(pool: SqlitePool, provider: Arc<dyn ProviderClient>) -> Arc<Self> {
        let broadcaster = Arc::new(ProgressBroadcaster::new());

        let channel_store: Arc<dyn ChannelStore> =
            Arc::new(SqliteChannelStore::with_pool(pool.clone()));
        let channels = Arc::new(ChannelRegistry::new(
            Arc::clone(&channel_store),
            Arc::clone(&provider),
            Arc::clone(&broadcaster),
        ));
        let webhook = Arc::new(WebhookReceiver::new(Arc::clone(&channels)));

        let campaigns = CampaignService::new(
            Arc::new(SqliteCampaignStore::with_pool(pool)),
            provider,
            Arc::clone(&broadcaster),
            Arc::new(StoreChannelDirectory {
                store: channel_store,
            }),
        );

        Arc::new(Self {
            campaigns,
            channels,
            webhook,
            broadcaster,
        })
    }
}

/// [`ChannelDirectory`] backed by the channel store.
struct StoreChannelDirectory {
    store: Arc<dyn ChannelStore>,
}

#[async_trait]
impl ChannelDirectory for StoreChannelDirectory {
    async fn external_name(
        &self,
        owner_id: &str,
        channel_id: &str,
    ) -> anyhow::Result<Option<String>> {
        let channel = self
            .store
            .get_for_owner(channel_id, owner_id)
            .await
            .map_err(anyhow::Error::new)?;
        Ok(channel.map(|c| c.external_name))
    }
}
