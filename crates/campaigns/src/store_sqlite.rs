//! SQLite-backed campaign store using sqlx.

use {
    async_trait::async_trait,
    sqlx::{Row, SqlitePool, sqlite::SqliteRow},
};

use crate::{
    error::Result,
    store::CampaignStore,
    types::{
        Campaign, CampaignStatus, CampaignSummary, DelaySpeed, Recipient, RecipientStatus,
        SendingMode, StatusCounts,
    },
};

/// SQLite-backed persistence for campaigns and recipients.
pub struct SqliteCampaignStore {
    pool: SqlitePool,
}

impl SqliteCampaignStore {
    /// Create a store using an existing pool (migrations must already be run).
    ///
    /// Call [`crate::run_migrations`] before using this constructor.
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_campaign(row: &SqliteRow) -> Result<Campaign> {
    let parts_json: String = row.get("message_parts");
    let status: String = row.get("status");
    let speed: String = row.get("delay_speed");
    let mode: String = row.get("sending_mode");
    Ok(Campaign {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        channel_id: row.get("channel_id"),
        name: row.get("name"),
        parts: serde_json::from_str(&parts_json)?,
        use_placeholders: row.get::<i64, _>("use_placeholders") != 0,
        delay_speed: DelaySpeed::parse(&speed),
        delay_from_secs: row.get::<i64, _>("delay_from_seconds") as u32,
        delay_to_secs: row.get::<i64, _>("delay_to_seconds") as u32,
        sending_mode: SendingMode::parse(&mode),
        status: CampaignStatus::parse(&status)?,
        created_at_ms: row.get("created_at_ms"),
    })
}

fn row_to_recipient(row: &SqliteRow) -> Result<Recipient> {
    let status: String = row.get("status");
    Ok(Recipient {
        id: row.get("id"),
        campaign_id: row.get("campaign_id"),
        address: row.get("address"),
        status: RecipientStatus::parse(&status)?,
        log_message: row.get("log_message"),
        sent_at_ms: row.get("sent_at_ms"),
    })
}

#[async_trait]
impl CampaignStore for SqliteCampaignStore {
    async fn create(&self, campaign: &Campaign, addresses: &[String]) -> Result<()> {
        let parts = serde_json::to_string(&campaign.parts)?;
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO campaigns (id, owner_id, channel_id, name, message_parts, \
             use_placeholders, delay_speed, delay_from_seconds, delay_to_seconds, sending_mode, \
             status, created_at_ms)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&campaign.id)
        .bind(&campaign.owner_id)
        .bind(&campaign.channel_id)
        .bind(&campaign.name)
        .bind(&parts)
        .bind(i64::from(campaign.use_placeholders))
        .bind(campaign.delay_speed.as_str())
        .bind(i64::from(campaign.delay_from_secs))
        .bind(i64::from(campaign.delay_to_secs))
        .bind(campaign.sending_mode.as_str())
        .bind(campaign.status.as_str())
        .bind(campaign.created_at_ms)
        .execute(&mut *tx)
        .await?;

        for address in addresses {
            sqlx::query(
                "INSERT INTO campaign_recipients (campaign_id, address, status) VALUES (?, ?, 'pending')",
            )
            .bind(&campaign.id)
            .bind(address)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_for_owner(&self, id: &str, owner_id: &str) -> Result<Option<Campaign>> {
        let row = sqlx::query("SELECT * FROM campaigns WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_campaign).transpose()
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<CampaignSummary>> {
        let rows = sqlx::query(
            "SELECT c.id, c.name, c.channel_id, c.status, c.created_at_ms,
                    (SELECT COUNT(*) FROM campaign_recipients r WHERE r.campaign_id = c.id) AS total,
                    (SELECT COUNT(*) FROM campaign_recipients r WHERE r.campaign_id = c.id AND r.status = 'sent') AS sent
             FROM campaigns c
             WHERE c.owner_id = ?
             ORDER BY c.created_at_ms DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let status: String = row.get("status");
            summaries.push(CampaignSummary {
                id: row.get("id"),
                name: row.get("name"),
                channel_id: row.get("channel_id"),
                status: CampaignStatus::parse(&status)?,
                created_at_ms: row.get("created_at_ms"),
                total_recipients: row.get("total"),
                sent_recipients: row.get("sent"),
            });
        }
        Ok(summaries)
    }

    async fn status(&self, id: &str) -> Result<Option<CampaignStatus>> {
        let row = sqlx::query("SELECT status FROM campaigns WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| {
            let status: String = r.get("status");
            CampaignStatus::parse(&status)
        })
        .transpose()
    }

    async fn set_status(&self, id: &str, status: CampaignStatus) -> Result<()> {
        sqlx::query("UPDATE campaigns SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn try_mark_running(&self, id: &str) -> Result<bool> {
        // Single conditional UPDATE: the startable-state check and the
        // one-running-campaign-per-channel rule are evaluated atomically with
        // the write, so two concurrent starts cannot both win.
        let result = sqlx::query(
            "UPDATE campaigns SET status = 'running'
             WHERE id = ?
               AND status IN ('draft', 'paused', 'stopped')
               AND NOT EXISTS (
                   SELECT 1 FROM campaigns other
                   WHERE other.channel_id = campaigns.channel_id
                     AND other.status = 'running'
               )",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM campaign_recipients WHERE campaign_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM campaigns WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn pending_recipients(&self, campaign_id: &str) -> Result<Vec<Recipient>> {
        let rows = sqlx::query(
            "SELECT * FROM campaign_recipients WHERE campaign_id = ? AND status = 'pending' \
             ORDER BY id ASC",
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_recipient).collect()
    }

    async fn recipients(&self, campaign_id: &str) -> Result<Vec<Recipient>> {
        let rows =
            sqlx::query("SELECT * FROM campaign_recipients WHERE campaign_id = ? ORDER BY id ASC")
                .bind(campaign_id)
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(row_to_recipient).collect()
    }

    async fn mark_recipients_failed(
        &self,
        campaign_id: &str,
        recipient_ids: &[i64],
        log_message: &str,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for id in recipient_ids {
            sqlx::query(
                "UPDATE campaign_recipients SET status = 'failed', log_message = ? \
                 WHERE id = ? AND campaign_id = ?",
            )
            .bind(log_message)
            .bind(id)
            .bind(campaign_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn mark_recipient_sent(
        &self,
        recipient_id: i64,
        log_message: &str,
        sent_at_ms: i64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE campaign_recipients SET status = 'sent', log_message = ?, sent_at_ms = ? \
             WHERE id = ?",
        )
        .bind(log_message)
        .bind(sent_at_ms)
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_recipient_failed(&self, recipient_id: i64, log_message: &str) -> Result<()> {
        sqlx::query("UPDATE campaign_recipients SET status = 'failed', log_message = ? WHERE id = ?")
            .bind(log_message)
            .bind(recipient_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn status_counts(&self, campaign_id: &str) -> Result<StatusCounts> {
        let row = sqlx::query(
            "SELECT
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'sent') AS sent,
                COUNT(*) FILTER (WHERE status = 'failed') AS failed
             FROM campaign_recipients WHERE campaign_id = ?",
        )
        .bind(campaign_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(StatusCounts {
            pending: row.get("pending"),
            sent: row.get("sent"),
            failed: row.get("failed"),
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn make_store() -> SqliteCampaignStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::run_migrations(&pool).await.unwrap();
        SqliteCampaignStore::with_pool(pool)
    }

    fn make_campaign(id: &str, channel: &str) -> Campaign {
        Campaign {
            id: id.into(),
            owner_id: "alice".into(),
            channel_id: channel.into(),
            name: format!("campaign {id}"),
            parts: vec![crate::types::MessagePart::Text {
                content: "Hello {{name}}".into(),
            }],
            use_placeholders: true,
            delay_speed: DelaySpeed::Medium,
            delay_from_secs: 5,
            delay_to_secs: 10,
            sending_mode: SendingMode::Internal,
            status: CampaignStatus::Draft,
            created_at_ms: 1000,
        }
    }

    fn addresses(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("551199999000{i}")).collect()
    }

    #[tokio::test]
    async fn create_round_trips_campaign_and_recipients() {
        let store = make_store().await;
        store
            .create(&make_campaign("c1", "ch1"), &addresses(3))
            .await
            .unwrap();

        let campaign = store.get_for_owner("c1", "alice").await.unwrap().unwrap();
        assert_eq!(campaign.status, CampaignStatus::Draft);
        assert_eq!(campaign.parts.len(), 1);
        assert_eq!(campaign.delay_speed, DelaySpeed::Medium);

        let recipients = store.recipients("c1").await.unwrap();
        assert_eq!(recipients.len(), 3);
        assert!(recipients.iter().all(|r| r.status == RecipientStatus::Pending));
        // Ascending id order is the processing order.
        assert!(recipients.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn ownership_scoping_hides_foreign_campaigns() {
        let store = make_store().await;
        store
            .create(&make_campaign("c1", "ch1"), &addresses(1))
            .await
            .unwrap();
        assert!(store.get_for_owner("c1", "bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn try_mark_running_wins_once_per_channel() {
        let store = make_store().await;
        store
            .create(&make_campaign("c1", "ch1"), &addresses(1))
            .await
            .unwrap();
        store
            .create(&make_campaign("c2", "ch1"), &addresses(1))
            .await
            .unwrap();

        assert!(store.try_mark_running("c1").await.unwrap());
        // Same channel: second start must lose.
        assert!(!store.try_mark_running("c2").await.unwrap());
        assert_eq!(
            store.status("c2").await.unwrap().unwrap(),
            CampaignStatus::Draft
        );
    }

    #[tokio::test]
    async fn try_mark_running_allows_different_channels() {
        let store = make_store().await;
        store
            .create(&make_campaign("c1", "ch1"), &addresses(1))
            .await
            .unwrap();
        store
            .create(&make_campaign("c2", "ch2"), &addresses(1))
            .await
            .unwrap();

        assert!(store.try_mark_running("c1").await.unwrap());
        assert!(store.try_mark_running("c2").await.unwrap());
    }

    #[tokio::test]
    async fn try_mark_running_rejects_terminal_states() {
        let store = make_store().await;
        store
            .create(&make_campaign("c1", "ch1"), &addresses(1))
            .await
            .unwrap();
        store
            .set_status("c1", CampaignStatus::Completed)
            .await
            .unwrap();
        assert!(!store.try_mark_running("c1").await.unwrap());
    }

    #[tokio::test]
    async fn recipient_updates_and_counts_keep_invariant() {
        let store = make_store().await;
        store
            .create(&make_campaign("c1", "ch1"), &addresses(4))
            .await
            .unwrap();
        let recipients = store.recipients("c1").await.unwrap();

        store
            .mark_recipient_sent(recipients[0].id, "Sent successfully.", 2000)
            .await
            .unwrap();
        store
            .mark_recipients_failed("c1", &[recipients[1].id], "Not a valid WhatsApp number")
            .await
            .unwrap();

        let counts = store.status_counts("c1").await.unwrap();
        assert_eq!(counts.sent, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.pending, 2);
        assert_eq!(counts.total(), 4);

        let pending = store.pending_recipients("c1").await.unwrap();
        assert_eq!(pending.len(), 2);

        let failed = store
            .recipients("c1")
            .await
            .unwrap()
            .into_iter()
            .find(|r| r.id == recipients[1].id)
            .unwrap();
        assert_eq!(failed.log_message.as_deref(), Some("Not a valid WhatsApp number"));
    }

    #[tokio::test]
    async fn list_reports_progress_counts() {
        let store = make_store().await;
        store
            .create(&make_campaign("c1", "ch1"), &addresses(2))
            .await
            .unwrap();
        let recipients = store.recipients("c1").await.unwrap();
        store
            .mark_recipient_sent(recipients[0].id, "Sent successfully.", 2000)
            .await
            .unwrap();

        let list = store.list_for_owner("alice").await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].total_recipients, 2);
        assert_eq!(list[0].sent_recipients, 1);
    }

    #[tokio::test]
    async fn delete_removes_campaign_and_recipients() {
        let store = make_store().await;
        store
            .create(&make_campaign("c1", "ch1"), &addresses(2))
            .await
            .unwrap();
        store.delete("c1").await.unwrap();
        assert!(store.get_for_owner("c1", "alice").await.unwrap().is_none());
        assert!(store.recipients("c1").await.unwrap().is_empty());
    }
}
