use async_trait::async_trait;

use crate::{error::Result, types::Channel};

/// Persistent storage for channel records.
#[async_trait]
pub trait ChannelStore: Send + Sync {
    async fn insert(&self, channel: &Channel) -> Result<()>;
    async fn get_for_owner(&self, id: &str, owner_id: &str) -> Result<Option<Channel>>;
    async fn get_by_external_name(&self, external_name: &str) -> Result<Option<Channel>>;
    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Channel>>;
    /// Overwrite connectivity fields from a provider record (reconciliation).
    async fn apply_reconciliation(
        &self,
        id: &str,
        status: &str,
        external_owner_address: Option<&str>,
        profile_name: Option<&str>,
    ) -> Result<()>;
    /// Set the status of the channel with the given provider identity and
    /// return the updated record, or `None` if no such channel exists.
    async fn set_status_by_external_name(
        &self,
        external_name: &str,
        status: &str,
    ) -> Result<Option<Channel>>;
    async fn delete(&self, id: &str) -> Result<()>;
}
