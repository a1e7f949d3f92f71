//! HTTP implementation of the provider contract.

use {
    async_trait::async_trait,
    serde_json::json,
    tracing::{debug, warn},
};

use crate::{
    error::{Error, Result},
    types::{
        ConnectResponse, ConnectionStateResponse, CreateInstanceResponse, MediaKind,
        NumberCheckEntry, PairingArtifact, ProviderChannelInfo, ProvisionedChannel, RecipientCheck,
    },
};

/// Capability set the rest of the system consumes. Implemented by
/// [`EvolutionClient`] for the real provider and by fakes in engine tests.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Provision a new channel bound to a phone address.
    async fn create_channel(&self, display_name: &str, phone: &str) -> Result<ProvisionedChannel>;

    /// Deprovision a channel. A provider-side 404 is treated as success.
    async fn delete_channel(&self, external_name: &str) -> Result<()>;

    /// Current connectivity state of a channel, in provider vocabulary.
    async fn connection_state(&self, external_name: &str) -> Result<String>;

    /// Fetch a fresh pairing artifact (QR code / pairing code) for a channel.
    async fn request_pairing(&self, external_name: &str) -> Result<PairingArtifact>;

    /// Check which of the given addresses exist on the messaging network.
    async fn bulk_check_recipients(
        &self,
        external_name: &str,
        addresses: &[String],
    ) -> Result<Vec<RecipientCheck>>;

    /// Send a text message, with a provider-side simulated typing delay.
    async fn send_text(
        &self,
        external_name: &str,
        address: &str,
        text: &str,
        typing_delay_ms: u64,
    ) -> Result<()>;

    /// Send a media message. Mime type is derived from the URL extension.
    async fn send_media(
        &self,
        external_name: &str,
        address: &str,
        kind: MediaKind,
        url: &str,
        caption: Option<&str>,
    ) -> Result<()>;

    /// List all channels known to the provider (bulk reconciliation).
    async fn list_channels(&self) -> Result<Vec<ProviderChannelInfo>>;
}

/// Reqwest-backed client for an Evolution API deployment.
pub struct EvolutionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl EvolutionClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http.get(self.url(path)).header("apikey", &self.api_key)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http.post(self.url(path)).header("apikey", &self.api_key)
    }

    fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .delete(self.url(path))
            .header("apikey", &self.api_key)
    }
}

/// Turn a non-success response into an [`Error::Api`], extracting the
/// provider's `message` field when the body is JSON.
async fn api_error(resp: reqwest::Response) -> Error {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| match v.get("message") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                "no response body".to_string()
            } else {
                body
            }
        });
    Error::Api { status, message }
}

async fn expect_success(resp: reqwest::Response) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        Err(api_error(resp).await)
    }
}

/// Derive a mime type from a media URL's file extension.
///
/// The provider wants an explicit mime type alongside the media URL; unknown
/// extensions fall back to a generic binary type and let the provider sniff.
pub(crate) fn mime_for_url(url: &str) -> &'static str {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    match path.rsplit('.').next().map(str::to_ascii_lowercase).as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("mp3") => "audio/mpeg",
        Some("ogg" | "oga") => "audio/ogg",
        Some("m4a") => "audio/mp4",
        Some("wav") => "audio/wav",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl ProviderClient for EvolutionClient {
    async fn create_channel(&self, display_name: &str, phone: &str) -> Result<ProvisionedChannel> {
        debug!(display_name, "creating provider channel");
        let resp = self
            .post("/instance/create")
            .json(&json!({
                "instanceName": display_name,
                "token": "",
                "number": phone,
                "qrcode": true,
                "integration": "WHATSAPP-BAILEYS",
            }))
            .send()
            .await?;
        let parsed: CreateInstanceResponse = expect_success(resp).await?.json().await?;
        Ok(ProvisionedChannel {
            external_name: parsed.instance.instance_name,
            pairing_secret: parsed.hash,
            qr_base64: parsed.qrcode.and_then(|q| q.base64),
        })
    }

    async fn delete_channel(&self, external_name: &str) -> Result<()> {
        debug!(external_name, "deleting provider channel");
        let resp = self
            .delete(&format!("/instance/delete/{external_name}"))
            .send()
            .await?;
        match expect_success(resp).await {
            Ok(_) => Ok(()),
            // Already gone on the provider side counts as deleted.
            Err(e) if e.is_not_found() => {
                warn!(external_name, "channel missing on provider, treating delete as success");
                Ok(())
            },
            Err(e) => Err(e),
        }
    }

    async fn connection_state(&self, external_name: &str) -> Result<String> {
        let resp = self
            .get(&format!("/instance/connectionState/{external_name}"))
            .send()
            .await?;
        let parsed: ConnectionStateResponse = expect_success(resp).await?.json().await?;
        Ok(parsed.instance.state)
    }

    async fn request_pairing(&self, external_name: &str) -> Result<PairingArtifact> {
        let resp = self
            .get(&format!("/instance/connect/{external_name}"))
            .send()
            .await?;
        let parsed: ConnectResponse = expect_success(resp).await?.json().await?;
        Ok(PairingArtifact {
            qr_base64: parsed.base64,
            pairing_code: parsed.pairing_code,
        })
    }

    async fn bulk_check_recipients(
        &self,
        external_name: &str,
        addresses: &[String],
    ) -> Result<Vec<RecipientCheck>> {
        debug!(external_name, count = addresses.len(), "bulk recipient check");
        let resp = self
            .post(&format!("/chat/whatsappNumbers/{external_name}"))
            .json(&json!({ "numbers": addresses }))
            .send()
            .await?;
        let entries: Vec<NumberCheckEntry> = expect_success(resp).await?.json().await?;
        Ok(entries
            .into_iter()
            .map(|e| RecipientCheck {
                address: e.number,
                exists: e.exists,
                resolved_name: e.name,
            })
            .collect())
    }

    async fn send_text(
        &self,
        external_name: &str,
        address: &str,
        text: &str,
        typing_delay_ms: u64,
    ) -> Result<()> {
        let resp = self
            .post(&format!("/message/sendText/{external_name}"))
            .json(&json!({
                "number": address,
                "text": text,
                "delay": typing_delay_ms,
            }))
            .send()
            .await?;
        expect_success(resp).await?;
        Ok(())
    }

    async fn send_media(
        &self,
        external_name: &str,
        address: &str,
        kind: MediaKind,
        url: &str,
        caption: Option<&str>,
    ) -> Result<()> {
        let mut body = json!({
            "number": address,
            "mediatype": kind.as_str(),
            "mimetype": mime_for_url(url),
            "media": url,
        });
        if let Some(caption) = caption
            && let Some(obj) = body.as_object_mut()
        {
            obj.insert("caption".into(), serde_json::Value::String(caption.into()));
        }
        let resp = self
            .post(&format!("/message/sendMedia/{external_name}"))
            .json(&body)
            .send()
            .await?;
        expect_success(resp).await?;
        Ok(())
    }

    async fn list_channels(&self) -> Result<Vec<ProviderChannelInfo>> {
        let resp = self.get("/instance/fetchInstances").send().await?;
        let parsed: Vec<ProviderChannelInfo> = expect_success(resp).await?.json().await?;
        Ok(parsed)
    }
}
