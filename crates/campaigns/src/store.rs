use async_trait::async_trait;

use crate::{
    error::Result,
    types::{Campaign, CampaignStatus, CampaignSummary, Recipient, StatusCounts},
};

/// Persistent storage for campaigns and their recipients. Single source of
/// truth for campaign status.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Insert a campaign and its recipient list atomically.
    async fn create(&self, campaign: &Campaign, addresses: &[String]) -> Result<()>;

    async fn get_for_owner(&self, id: &str, owner_id: &str) -> Result<Option<Campaign>>;

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<CampaignSummary>>;

    /// Current status only — the engine's cancellation poll.
    async fn status(&self, id: &str) -> Result<Option<CampaignStatus>>;

    async fn set_status(&self, id: &str, status: CampaignStatus) -> Result<()>;

    /// Atomic start guard: transition to `running` only if the campaign is in
    /// a startable state AND no other campaign on the same channel is
    /// currently `running`. Returns whether the transition happened.
    async fn try_mark_running(&self, id: &str) -> Result<bool>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// All recipients still `pending`, in ascending id order.
    async fn pending_recipients(&self, campaign_id: &str) -> Result<Vec<Recipient>>;

    /// Full recipient list in ascending id order.
    async fn recipients(&self, campaign_id: &str) -> Result<Vec<Recipient>>;

    /// Mark a batch of recipients `failed` with a shared log message.
    async fn mark_recipients_failed(
        &self,
        campaign_id: &str,
        recipient_ids: &[i64],
        log_message: &str,
    ) -> Result<()>;

    async fn mark_recipient_sent(
        &self,
        recipient_id: i64,
        log_message: &str,
        sent_at_ms: i64,
    ) -> Result<()>;

    async fn mark_recipient_failed(&self, recipient_id: i64, log_message: &str) -> Result<()>;

    async fn status_counts(&self, campaign_id: &str) -> Result<StatusCounts>;
}
