//! Shared test doubles for engine and service tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use {
    async_trait::async_trait,
    tokio::sync::{Notify, Semaphore},
};

use outreach_provider::{
    MediaKind, PairingArtifact, ProviderChannelInfo, ProviderClient, ProvisionedChannel,
    RecipientCheck, error::Error as ProviderError,
};

use crate::service::ChannelDirectory;

/// One recorded provider send, with a timestamp for pacing assertions.
#[derive(Debug, Clone)]
pub struct SendRecord {
    pub address: String,
    pub text: String,
    pub typing_delay_ms: u64,
    pub media_url: Option<String>,
    pub at: tokio::time::Instant,
}

/// Gate that can hold sends open until the test releases them.
#[derive(Clone)]
pub struct SendGate {
    pub started: Arc<Notify>,
    pub release: Arc<Semaphore>,
}

/// Scriptable in-memory provider.
#[derive(Default)]
pub struct FakeProvider {
    checks: Mutex<HashMap<String, (bool, Option<String>)>>,
    pub sends: Mutex<Vec<SendRecord>>,
    fail_sends_to: Mutex<HashSet<String>>,
    fail_bulk_check: AtomicBool,
    bulk_check_calls: AtomicUsize,
    gate: Mutex<Option<SendGate>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script one address's bulk-check result.
    pub fn with_recipient(self, address: &str, exists: bool, name: Option<&str>) -> Self {
        self.checks
            .lock()
            .unwrap()
            .insert(address.to_string(), (exists, name.map(str::to_string)));
        self
    }

    /// Make sends to this address fail.
    pub fn failing_send_to(self, address: &str) -> Self {
        self.fail_sends_to.lock().unwrap().insert(address.to_string());
        self
    }

    /// Make the whole bulk check call fail.
    pub fn failing_bulk_check(self) -> Self {
        self.fail_bulk_check.store(true, Ordering::Relaxed);
        self
    }

    /// Install a gate: every send notifies `started` and then waits for a
    /// permit on `release`.
    pub fn gated(self) -> (Self, SendGate) {
        let gate = SendGate {
            started: Arc::new(Notify::new()),
            release: Arc::new(Semaphore::new(0)),
        };
        *self.gate.lock().unwrap() = Some(gate.clone());
        (self, gate)
    }

    pub fn bulk_check_calls(&self) -> usize {
        self.bulk_check_calls.load(Ordering::Relaxed)
    }

    async fn pass_gate(&self) {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.started.notify_one();
            gate.release.acquire().await.unwrap().forget();
        }
    }

    fn record_send(&self, address: &str, text: &str, typing: u64, media_url: Option<&str>) {
        self.sends.lock().unwrap().push(SendRecord {
            address: address.to_string(),
            text: text.to_string(),
            typing_delay_ms: typing,
            media_url: media_url.map(str::to_string),
            at: tokio::time::Instant::now(),
        });
    }

    fn check_failure(&self, address: &str) -> outreach_provider::Result<()> {
        if self.fail_sends_to.lock().unwrap().contains(address) {
            return Err(ProviderError::Api {
                status: 400,
                message: "send rejected".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ProviderClient for FakeProvider {
    async fn create_channel(
        &self,
        display_name: &str,
        _phone: &str,
    ) -> outreach_provider::Result<ProvisionedChannel> {
        Ok(ProvisionedChannel {
            external_name: display_name.to_string(),
            pairing_secret: "tok".into(),
            qr_base64: None,
        })
    }

    async fn delete_channel(&self, _external_name: &str) -> outreach_provider::Result<()> {
        Ok(())
    }

    async fn connection_state(&self, _external_name: &str) -> outreach_provider::Result<String> {
        Ok("open".into())
    }

    async fn request_pairing(
        &self,
        _external_name: &str,
    ) -> outreach_provider::Result<PairingArtifact> {
        Ok(PairingArtifact {
            qr_base64: None,
            pairing_code: None,
        })
    }

    async fn bulk_check_recipients(
        &self,
        _external_name: &str,
        addresses: &[String],
    ) -> outreach_provider::Result<Vec<RecipientCheck>> {
        self.bulk_check_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_bulk_check.load(Ordering::Relaxed) {
            return Err(ProviderError::Api {
                status: 503,
                message: "provider unavailable".into(),
            });
        }
        let checks = self.checks.lock().unwrap();
        Ok(addresses
            .iter()
            .map(|address| {
                let (exists, name) = checks
                    .get(address)
                    .cloned()
                    .unwrap_or((false, None));
                RecipientCheck {
                    address: address.clone(),
                    exists,
                    resolved_name: name,
                }
            })
            .collect())
    }

    async fn send_text(
        &self,
        _external_name: &str,
        address: &str,
        text: &str,
        typing_delay_ms: u64,
    ) -> outreach_provider::Result<()> {
        self.pass_gate().await;
        self.check_failure(address)?;
        self.record_send(address, text, typing_delay_ms, None);
        Ok(())
    }

    async fn send_media(
        &self,
        _external_name: &str,
        address: &str,
        _kind: MediaKind,
        url: &str,
        caption: Option<&str>,
    ) -> outreach_provider::Result<()> {
        self.pass_gate().await;
        self.check_failure(address)?;
        self.record_send(address, caption.unwrap_or_default(), 0, Some(url));
        Ok(())
    }

    async fn list_channels(&self) -> outreach_provider::Result<Vec<ProviderChannelInfo>> {
        Ok(Vec::new())
    }
}

/// Directory that resolves every owned channel to a fixed external name.
pub struct StaticDirectory {
    pub external_name: String,
}

impl StaticDirectory {
    pub fn new(external_name: &str) -> Self {
        Self {
            external_name: external_name.to_string(),
        }
    }
}

#[async_trait]
impl ChannelDirectory for StaticDirectory {
    async fn external_name(
        &self,
        _owner_id: &str,
        _channel_id: &str,
    ) -> anyhow::Result<Option<String>> {
        Ok(Some(self.external_name.clone()))
    }
}

/// Directory that owns nothing.
pub struct EmptyDirectory;

#[async_trait]
impl ChannelDirectory for EmptyDirectory {
    async fn external_name(
        &self,
        _owner_id: &str,
        _channel_id: &str,
    ) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}
