use serde::{Deserialize, Serialize};

/// Result of provisioning a new channel with the provider.
#[derive(Debug, Clone)]
pub struct ProvisionedChannel {
    /// Provider-facing identity of the channel.
    pub external_name: String,
    /// Provider-issued token scoped to this channel.
    pub pairing_secret: String,
    /// Base64-encoded QR code to pair the phone with the channel.
    pub qr_base64: Option<String>,
}

/// A fresh pairing artifact for an already-provisioned channel.
#[derive(Debug, Clone)]
pub struct PairingArtifact {
    pub qr_base64: Option<String>,
    pub pairing_code: Option<String>,
}

/// One entry of a bulk recipient existence check.
#[derive(Debug, Clone)]
pub struct RecipientCheck {
    pub address: String,
    pub exists: bool,
    /// Display name resolved by the provider, when available. Used for
    /// `{{name}}` placeholder substitution.
    pub resolved_name: Option<String>,
}

/// Provider-side view of a channel, as returned by the bulk listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderChannelInfo {
    #[serde(rename = "name")]
    pub external_name: String,
    pub owner_jid: Option<String>,
    pub profile_name: Option<String>,
    pub connection_status: Option<String>,
}

/// Kind of media message the provider can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }
}

// ── Wire DTOs ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct CreateInstanceResponse {
    pub instance: InstanceIdent,
    pub hash: String,
    pub qrcode: Option<QrCode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InstanceIdent {
    pub instance_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QrCode {
    pub base64: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConnectionStateResponse {
    pub instance: ConnectionStateInner,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConnectionStateInner {
    pub state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConnectResponse {
    pub base64: Option<String>,
    pub pairing_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NumberCheckEntry {
    pub number: String,
    pub exists: bool,
    pub name: Option<String>,
}
