//! The campaign dispatch loop: bulk address validation, per-recipient
//! sending with humanized pacing, cooperative pause/stop, and progress
//! fan-out.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use {
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
};

use {
    outreach_broadcast::{Event, ProgressBroadcaster, RecipientProgress},
    outreach_provider::{MediaKind, ProviderClient},
};

use crate::{
    error::Result,
    pacing,
    store::CampaignStore,
    types::{Campaign, CampaignStatus, MessagePart, Recipient, RecipientStatus, substitute_name},
};

pub(crate) const INVALID_ADDRESS_LOG: &str = "Not a valid WhatsApp number";
pub(crate) const SENT_LOG: &str = "Sent successfully.";

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Everything one campaign run needs. Built by the service when a start is
/// accepted; the run owns its snapshot of the campaign definition (the
/// template is immutable after creation) and re-reads only the status.
pub(crate) struct RunContext {
    pub store: Arc<dyn CampaignStore>,
    pub provider: Arc<dyn ProviderClient>,
    pub broadcaster: Arc<ProgressBroadcaster>,
    pub campaign: Campaign,
    pub channel_external_name: String,
    pub cancel: CancellationToken,
}

enum RunOutcome {
    /// Every recipient was processed; the campaign is done.
    Completed,
    /// Pause/stop took effect between recipients; remaining recipients stay
    /// `pending` and the status written by the control action stands.
    Halted,
}

/// Drive one accepted campaign run to completion.
///
/// Recipient-scoped provider errors are absorbed inside the loop; anything
/// else escaping [`dispatch`] fails the whole campaign.
pub(crate) async fn run(ctx: RunContext) {
    let campaign_id = ctx.campaign.id.clone();
    let owner_id = ctx.campaign.owner_id.clone();
    info!(campaign = %campaign_id, "campaign run started");

    match dispatch(&ctx).await {
        Ok(RunOutcome::Completed) => {
            if let Err(e) = ctx
                .store
                .set_status(&campaign_id, CampaignStatus::Completed)
                .await
            {
                error!(campaign = %campaign_id, error = %e, "failed to persist completed status");
                return;
            }
            ctx.broadcaster.emit(&owner_id, Event::CampaignStatusUpdate {
                campaign_id: campaign_id.clone(),
                status: CampaignStatus::Completed.as_str().to_string(),
            });
            info!(campaign = %campaign_id, "campaign completed");
        },
        Ok(RunOutcome::Halted) => {
            info!(campaign = %campaign_id, "campaign run halted");
        },
        Err(e) => {
            error!(campaign = %campaign_id, error = %e, "campaign run failed");
            if let Err(e) = ctx
                .store
                .set_status(&campaign_id, CampaignStatus::Failed)
                .await
            {
                error!(campaign = %campaign_id, error = %e, "failed to persist failed status");
            }
            ctx.broadcaster.emit(&owner_id, Event::CampaignStatusUpdate {
                campaign_id,
                status: CampaignStatus::Failed.as_str().to_string(),
            });
        },
    }
}

async fn dispatch(ctx: &RunContext) -> Result<RunOutcome> {
    let campaign = &ctx.campaign;

    let pending = ctx.store.pending_recipients(&campaign.id).await?;
    if pending.is_empty() {
        info!(campaign = %campaign.id, "no pending recipients");
        return Ok(RunOutcome::Completed);
    }

    // One provider round-trip validates the whole batch. Addresses the
    // provider does not report as existing are failed up front and never
    // sent to.
    let addresses: Vec<String> = pending.iter().map(|r| r.address.clone()).collect();
    let checks = ctx
        .provider
        .bulk_check_recipients(&ctx.channel_external_name, &addresses)
        .await?;
    let known: HashMap<String, Option<String>> = checks
        .into_iter()
        .filter(|c| c.exists)
        .map(|c| (c.address, c.resolved_name))
        .collect();

    let (valid, invalid): (Vec<Recipient>, Vec<Recipient>) = pending
        .into_iter()
        .partition(|r| known.contains_key(&r.address));

    if !invalid.is_empty() {
        let ids: Vec<i64> = invalid.iter().map(|r| r.id).collect();
        ctx.store
            .mark_recipients_failed(&campaign.id, &ids, INVALID_ADDRESS_LOG)
            .await?;
        ctx.broadcaster.emit(&campaign.owner_id, Event::CampaignProgress {
            campaign_id: campaign.id.clone(),
            updated_recipients: ids
                .iter()
                .map(|&id| RecipientProgress {
                    id,
                    status: RecipientStatus::Failed.as_str().to_string(),
                    log_message: Some(INVALID_ADDRESS_LOG.to_string()),
                })
                .collect(),
        });
        warn!(campaign = %campaign.id, count = ids.len(), "recipients failed address validation");
    }

    for recipient in valid {
        // Cooperative cancellation point: consulted only between recipients,
        // never mid-recipient.
        if ctx.cancel.is_cancelled() {
            return Ok(RunOutcome::Halted);
        }
        match ctx.store.status(&campaign.id).await? {
            Some(CampaignStatus::Running) => {},
            Some(status) => {
                info!(campaign = %campaign.id, status = status.as_str(), "halting run");
                return Ok(RunOutcome::Halted);
            },
            None => {
                warn!(campaign = %campaign.id, "campaign vanished mid-run, halting");
                return Ok(RunOutcome::Halted);
            },
        }

        let resolved_name = known.get(&recipient.address).and_then(|n| n.as_deref());
        match deliver(ctx, &recipient, resolved_name).await {
            Ok(()) => {
                ctx.store
                    .mark_recipient_sent(recipient.id, SENT_LOG, now_ms())
                    .await?;
                ctx.broadcaster.emit(&campaign.owner_id, Event::CampaignProgress {
                    campaign_id: campaign.id.clone(),
                    updated_recipients: vec![RecipientProgress {
                        id: recipient.id,
                        status: RecipientStatus::Sent.as_str().to_string(),
                        log_message: Some(SENT_LOG.to_string()),
                    }],
                });
            },
            Err(message) => {
                warn!(
                    campaign = %campaign.id,
                    recipient = recipient.id,
                    error = %message,
                    "recipient send failed"
                );
                ctx.store.mark_recipient_failed(recipient.id, &message).await?;
                ctx.broadcaster.emit(&campaign.owner_id, Event::CampaignProgress {
                    campaign_id: campaign.id.clone(),
                    updated_recipients: vec![RecipientProgress {
                        id: recipient.id,
                        status: RecipientStatus::Failed.as_str().to_string(),
                        log_message: Some(message),
                    }],
                });
            },
        }

        // Humanization delay before the next recipient. A cancel wakes the
        // sleep early; the halt still happens at this recipient boundary.
        let delay = pacing::recipient_delay(campaign.delay_from_secs, campaign.delay_to_secs);
        tokio::select! {
            () = tokio::time::sleep(delay) => {},
            () = ctx.cancel.cancelled() => return Ok(RunOutcome::Halted),
        }
    }

    Ok(RunOutcome::Completed)
}

/// Send every message part to one recipient, in template order.
///
/// The first failing part aborts the rest for this recipient; the captured
/// error text becomes the recipient's log message. Errors here are
/// recipient-scoped by construction and never fail the run.
async fn deliver(
    ctx: &RunContext,
    recipient: &Recipient,
    resolved_name: Option<&str>,
) -> std::result::Result<(), String> {
    let campaign = &ctx.campaign;
    let render = |text: &str| match resolved_name {
        Some(name) if campaign.use_placeholders => substitute_name(text, name),
        _ => text.to_string(),
    };

    for part in &campaign.parts {
        let sent = match part {
            MessagePart::Text { content } => {
                let text = render(content);
                let typing = pacing::typing_delay_ms(&text, campaign.delay_speed);
                ctx.provider
                    .send_text(&ctx.channel_external_name, &recipient.address, &text, typing)
                    .await
            },
            MessagePart::Image { url, caption } => {
                let caption = caption.as_deref().map(&render);
                ctx.provider
                    .send_media(
                        &ctx.channel_external_name,
                        &recipient.address,
                        MediaKind::Image,
                        url,
                        caption.as_deref(),
                    )
                    .await
            },
            MessagePart::Audio { url } => {
                ctx.provider
                    .send_media(
                        &ctx.channel_external_name,
                        &recipient.address,
                        MediaKind::Audio,
                        url,
                        None,
                    )
                    .await
            },
        };
        sent.map_err(|e| e.to_string())?;

        tokio::time::sleep(pacing::part_delay()).await;
    }
    Ok(())
}
