//! Campaign orchestration: creation, control actions, and the in-memory
//! registry of running dispatch tasks.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use {
    async_trait::async_trait,
    tokio::{sync::Mutex, task::JoinHandle},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info},
};

use {outreach_broadcast::ProgressBroadcaster, outreach_provider::ProviderClient};

use crate::{
    engine::{self, RunContext},
    error::{Error, Result},
    store::CampaignStore,
    types::{
        Campaign, CampaignDraft, CampaignStatus, CampaignSummary, ControlAction, Recipient,
    },
};

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Resolves the provider-facing name of a channel owned by a given owner.
///
/// Implemented by the gateway over the channel store; a separate trait keeps
/// this crate independent of the channel registry.
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// `None` when the channel does not exist or is not owned by `owner_id`.
    async fn external_name(
        &self,
        owner_id: &str,
        channel_id: &str,
    ) -> anyhow::Result<Option<String>>;
}

/// How a control action was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    /// Start accepted; dispatch continues in the background.
    Accepted,
    /// Pause/stop persisted synchronously.
    Applied,
}

struct RunHandle {
    cancel: CancellationToken,
    join: Option<JoinHandle<()>>,
}

/// Campaign orchestrator. Owns the per-campaign task registry so running
/// dispatches can be awaited, cancelled, and shut down gracefully.
pub struct CampaignService {
    store: Arc<dyn CampaignStore>,
    provider: Arc<dyn ProviderClient>,
    broadcaster: Arc<ProgressBroadcaster>,
    channels: Arc<dyn ChannelDirectory>,
    runs: Mutex<HashMap<String, RunHandle>>,
}

impl CampaignService {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        provider: Arc<dyn ProviderClient>,
        broadcaster: Arc<ProgressBroadcaster>,
        channels: Arc<dyn ChannelDirectory>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            provider,
            broadcaster,
            channels,
            runs: Mutex::new(HashMap::new()),
        })
    }

    pub fn store(&self) -> &Arc<dyn CampaignStore> {
        &self.store
    }

    /// Validate and persist a new campaign in `draft` state, with its
    /// recipient list, atomically.
    pub async fn create(&self, owner_id: &str, draft: CampaignDraft) -> Result<Campaign> {
        draft.validate()?;
        if self
            .channels
            .external_name(owner_id, &draft.channel_id)
            .await?
            .is_none()
        {
            return Err(Error::channel_not_found(&draft.channel_id));
        }

        let campaign = Campaign {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            channel_id: draft.channel_id,
            name: draft.name,
            parts: draft.parts,
            use_placeholders: draft.use_placeholders,
            delay_speed: draft.delay_speed,
            delay_from_secs: draft.delay_from_secs,
            delay_to_secs: draft.delay_to_secs,
            sending_mode: draft.sending_mode,
            status: CampaignStatus::Draft,
            created_at_ms: now_ms(),
        };
        self.store.create(&campaign, &draft.addresses).await?;
        info!(campaign = %campaign.id, recipients = draft.addresses.len(), "campaign created");
        Ok(campaign)
    }

    pub async fn list(&self, owner_id: &str) -> Result<Vec<CampaignSummary>> {
        self.store.list_for_owner(owner_id).await
    }

    pub async fn details(
        &self,
        owner_id: &str,
        campaign_id: &str,
    ) -> Result<(Campaign, Vec<Recipient>)> {
        let campaign = self
            .store
            .get_for_owner(campaign_id, owner_id)
            .await?
            .ok_or_else(|| Error::campaign_not_found(campaign_id))?;
        let recipients = self.store.recipients(campaign_id).await?;
        Ok((campaign, recipients))
    }

    /// Delete a campaign. Guarded: an active (running/paused) campaign
    /// cannot be deleted.
    pub async fn delete(&self, owner_id: &str, campaign_id: &str) -> Result<()> {
        let campaign = self
            .store
            .get_for_owner(campaign_id, owner_id)
            .await?
            .ok_or_else(|| Error::campaign_not_found(campaign_id))?;
        if campaign.status.is_active() {
            return Err(Error::conflict(format!(
                "campaign in '{}' state cannot be deleted",
                campaign.status.as_str()
            )));
        }
        self.store.delete(&campaign.id).await?;
        info!(campaign = %campaign.id, "campaign deleted");
        Ok(())
    }

    /// Apply a control action. Start spawns a detached dispatch task;
    /// pause/stop persist the new status first and then signal the
    /// running task's cancellation token.
    pub async fn control(
        self: &Arc<Self>,
        owner_id: &str,
        campaign_id: &str,
        action: ControlAction,
    ) -> Result<ControlOutcome> {
        let campaign = self
            .store
            .get_for_owner(campaign_id, owner_id)
            .await?
            .ok_or_else(|| Error::campaign_not_found(campaign_id))?;

        match action {
            ControlAction::Start => {
                self.start(campaign).await?;
                Ok(ControlOutcome::Accepted)
            },
            ControlAction::Pause => {
                if campaign.status != CampaignStatus::Running {
                    return Err(Error::conflict(format!(
                        "campaign in '{}' state cannot be paused",
                        campaign.status.as_str()
                    )));
                }
                self.store
                    .set_status(&campaign.id, CampaignStatus::Paused)
                    .await?;
                self.signal_cancel(&campaign.id).await;
                info!(campaign = %campaign.id, "campaign paused");
                Ok(ControlOutcome::Applied)
            },
            ControlAction::Stop => {
                if !campaign.status.is_active() {
                    return Err(Error::conflict(format!(
                        "campaign in '{}' state cannot be stopped",
                        campaign.status.as_str()
                    )));
                }
                self.store
                    .set_status(&campaign.id, CampaignStatus::Stopped)
                    .await?;
                self.signal_cancel(&campaign.id).await;
                info!(campaign = %campaign.id, "campaign stopped");
                Ok(ControlOutcome::Applied)
            },
        }
    }

    async fn start(self: &Arc<Self>, campaign: Campaign) -> Result<()> {
        if !campaign.status.can_start() {
            return Err(Error::conflict(format!(
                "campaign in '{}' state cannot be started",
                campaign.status.as_str()
            )));
        }
        let channel_external_name = self
            .channels
            .external_name(&campaign.owner_id, &campaign.channel_id)
            .await?
            .ok_or_else(|| Error::channel_not_found(&campaign.channel_id))?;

        // Atomic check-and-set: also enforces one running campaign per
        // channel, so two concurrent starts cannot both pass.
        if !self.store.try_mark_running(&campaign.id).await? {
            return Err(Error::conflict(
                "channel is already running another campaign",
            ));
        }

        let mut campaign = campaign;
        campaign.status = CampaignStatus::Running;
        let campaign_id = campaign.id.clone();
        let cancel = CancellationToken::new();
        let ctx = RunContext {
            store: Arc::clone(&self.store),
            provider: Arc::clone(&self.provider),
            broadcaster: Arc::clone(&self.broadcaster),
            campaign,
            channel_external_name,
            cancel: cancel.clone(),
        };

        // Register under the lock before the task can finish, so an
        // immediate pause still finds the handle.
        let mut runs = self.runs.lock().await;
        let svc = Arc::clone(self);
        let task_id = campaign_id.clone();
        let join = tokio::spawn(async move {
            engine::run(ctx).await;
            svc.runs.lock().await.remove(&task_id);
        });
        runs.insert(campaign_id, RunHandle {
            cancel,
            join: Some(join),
        });
        Ok(())
    }

    async fn signal_cancel(&self, campaign_id: &str) {
        let runs = self.runs.lock().await;
        if let Some(handle) = runs.get(campaign_id) {
            handle.cancel.cancel();
        } else {
            debug!(campaign = %campaign_id, "no running task to cancel");
        }
    }

    /// Whether a dispatch task for this campaign is currently registered.
    pub async fn is_dispatching(&self, campaign_id: &str) -> bool {
        self.runs.lock().await.contains_key(campaign_id)
    }

    /// Await completion of a campaign's dispatch task, if one is running.
    pub async fn wait(&self, campaign_id: &str) {
        let join = {
            let mut runs = self.runs.lock().await;
            runs.get_mut(campaign_id).and_then(|h| h.join.take())
        };
        if let Some(join) = join {
            let _ = join.await;
        }
    }

    /// Cancel all running dispatches and await their termination.
    pub async fn shutdown(&self) {
        let handles: Vec<RunHandle> = {
            let mut runs = self.runs.lock().await;
            runs.drain().map(|(_, h)| h).collect()
        };
        for mut handle in handles {
            handle.cancel.cancel();
            if let Some(join) = handle.join.take() {
                let _ = join.await;
            }
        }
        info!("campaign service shut down");
    }
}
