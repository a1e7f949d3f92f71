//! Campaign dispatch: stored multi-part message templates driven through an
//! external messaging provider, recipient by recipient, under a
//! pausable/stoppable execution model with humanized pacing.

mod engine;
pub mod error;
pub mod pacing;
pub mod service;
pub mod store;
pub mod store_sqlite;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

pub use {
    error::{Error, Result},
    service::{CampaignService, ChannelDirectory, ControlOutcome},
    store::CampaignStore,
    store_sqlite::SqliteCampaignStore,
    types::{
        Campaign, CampaignDraft, CampaignStatus, CampaignSummary, ControlAction, DelaySpeed,
        MessagePart, Recipient, RecipientStatus, SendingMode, StatusCounts,
    },
};

/// Run database migrations for the campaigns crate.
///
/// Creates the `campaigns` and `campaign_recipients` tables. Call at
/// application startup before using [`SqliteCampaignStore`] on a shared pool.
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
