//! SQLite-backed channel store using sqlx.

use {
    async_trait::async_trait,
    sqlx::{Row, SqlitePool, sqlite::SqliteRow},
};

use crate::{error::Result, store::ChannelStore, types::Channel};

/// SQLite-backed persistence for channel records.
pub struct SqliteChannelStore {
    pool: SqlitePool,
}

impl SqliteChannelStore {
    /// Create a store using an existing pool (migrations must already be run).
    ///
    /// Call [`crate::run_migrations`] before using this constructor.
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_channel(row: &SqliteRow) -> Channel {
    Channel {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        display_name: row.get("display_name"),
        external_name: row.get("external_name"),
        phone_address: row.get("phone_address"),
        pairing_secret: row.get("pairing_secret"),
        status: row.get("status"),
        external_owner_address: row.get("external_owner_address"),
        profile_name: row.get("profile_name"),
        webhook_url: row.get("webhook_url"),
        created_at_ms: row.get("created_at_ms"),
    }
}

const ALL_COLUMNS: &str = "id, owner_id, display_name, external_name, phone_address, \
                           pairing_secret, status, external_owner_address, profile_name, \
                           webhook_url, created_at_ms";

#[async_trait]
impl ChannelStore for SqliteChannelStore {
    async fn insert(&self, channel: &Channel) -> Result<()> {
        sqlx::query(
            "INSERT INTO channels (id, owner_id, display_name, external_name, phone_address, \
             pairing_secret, status, external_owner_address, profile_name, webhook_url, created_at_ms)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&channel.id)
        .bind(&channel.owner_id)
        .bind(&channel.display_name)
        .bind(&channel.external_name)
        .bind(&channel.phone_address)
        .bind(&channel.pairing_secret)
        .bind(&channel.status)
        .bind(&channel.external_owner_address)
        .bind(&channel.profile_name)
        .bind(&channel.webhook_url)
        .bind(channel.created_at_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_for_owner(&self, id: &str, owner_id: &str) -> Result<Option<Channel>> {
        let row = sqlx::query(&format!(
            "SELECT {ALL_COLUMNS} FROM channels WHERE id = ? AND owner_id = ?"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_channel))
    }

    async fn get_by_external_name(&self, external_name: &str) -> Result<Option<Channel>> {
        let row = sqlx::query(&format!(
            "SELECT {ALL_COLUMNS} FROM channels WHERE external_name = ?"
        ))
        .bind(external_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_channel))
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Channel>> {
        let rows = sqlx::query(&format!(
            "SELECT {ALL_COLUMNS} FROM channels WHERE owner_id = ? ORDER BY created_at_ms DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_channel).collect())
    }

    async fn apply_reconciliation(
        &self,
        id: &str,
        status: &str,
        external_owner_address: Option<&str>,
        profile_name: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE channels SET status = ?, external_owner_address = ?, profile_name = ? \
             WHERE id = ?",
        )
        .bind(status)
        .bind(external_owner_address)
        .bind(profile_name)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_status_by_external_name(
        &self,
        external_name: &str,
        status: &str,
    ) -> Result<Option<Channel>> {
        let result = sqlx::query("UPDATE channels SET status = ? WHERE external_name = ?")
            .bind(status)
            .bind(external_name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_external_name(external_name).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM channels WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn make_store() -> SqliteChannelStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::run_migrations(&pool).await.unwrap();
        SqliteChannelStore::with_pool(pool)
    }

    fn make_channel(id: &str, owner: &str) -> Channel {
        Channel {
            id: id.into(),
            owner_id: owner.into(),
            display_name: format!("Channel {id}"),
            external_name: format!("ext-{id}"),
            phone_address: "5511999990000".into(),
            pairing_secret: "tok".into(),
            status: "pending".into(),
            external_owner_address: None,
            profile_name: None,
            webhook_url: None,
            created_at_ms: 1000,
        }
    }

    #[tokio::test]
    async fn insert_and_get_scoped_by_owner() {
        let store = make_store().await;
        store.insert(&make_channel("1", "alice")).await.unwrap();

        assert!(store.get_for_owner("1", "alice").await.unwrap().is_some());
        // Another owner cannot see it.
        assert!(store.get_for_owner("1", "bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_owner_scoped() {
        let store = make_store().await;
        store.insert(&make_channel("1", "alice")).await.unwrap();
        store.insert(&make_channel("2", "alice")).await.unwrap();
        store.insert(&make_channel("3", "bob")).await.unwrap();

        assert_eq!(store.list_for_owner("alice").await.unwrap().len(), 2);
        assert_eq!(store.list_for_owner("bob").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reconciliation_overwrites_connectivity_fields() {
        let store = make_store().await;
        store.insert(&make_channel("1", "alice")).await.unwrap();

        store
            .apply_reconciliation("1", "open", Some("5511999990000@s.whatsapp.net"), Some("Acme"))
            .await
            .unwrap();

        let channel = store.get_for_owner("1", "alice").await.unwrap().unwrap();
        assert_eq!(channel.status, "open");
        assert_eq!(
            channel.external_owner_address.as_deref(),
            Some("5511999990000@s.whatsapp.net")
        );
        assert_eq!(channel.profile_name.as_deref(), Some("Acme"));
    }

    #[tokio::test]
    async fn status_update_by_external_name_returns_channel() {
        let store = make_store().await;
        store.insert(&make_channel("1", "alice")).await.unwrap();

        let updated = store
            .set_status_by_external_name("ext-1", "close")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, "close");
        assert_eq!(updated.owner_id, "alice");
    }

    #[tokio::test]
    async fn status_update_unknown_external_name_is_none() {
        let store = make_store().await;
        let updated = store
            .set_status_by_external_name("ext-unknown", "open")
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn delete_removes_channel() {
        let store = make_store().await;
        store.insert(&make_channel("1", "alice")).await.unwrap();
        store.delete("1").await.unwrap();
        assert!(store.get_for_owner("1", "alice").await.unwrap().is_none());
    }
}
