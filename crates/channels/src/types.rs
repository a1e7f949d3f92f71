use serde::Serialize;

/// A provisioned messaging channel bound to one phone address.
///
/// The local record is an eventually-consistent cache of provider state:
/// `status`, `external_owner_address`, and `profile_name` are overwritten
/// from provider truth during reconciliation and webhook processing, never
/// merged.
#[derive(Debug, Clone, Serialize)]
pub struct Channel {
    pub id: String,
    pub owner_id: String,
    pub display_name: String,
    /// Provider-facing identity.
    pub external_name: String,
    pub phone_address: String,
    /// Provider-issued token scoped to this channel.
    #[serde(skip_serializing)]
    pub pairing_secret: String,
    /// Connectivity status in provider vocabulary (pending/connecting/open/close/...).
    pub status: String,
    pub external_owner_address: Option<String>,
    pub profile_name: Option<String>,
    pub webhook_url: Option<String>,
    pub created_at_ms: i64,
}
