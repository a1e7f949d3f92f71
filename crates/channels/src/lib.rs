//! Channel registry: persisted cache of provisioned messaging channels,
//! reconciled against provider truth on demand and via webhook pushes.

pub mod error;
pub mod registry;
pub mod store;
pub mod store_sqlite;
pub mod types;
pub mod webhook;

pub use {
    error::{Error, Result},
    registry::ChannelRegistry,
    store::ChannelStore,
    store_sqlite::SqliteChannelStore,
    types::Channel,
    webhook::{ProviderEvent, WebhookReceiver},
};

/// Run database migrations for the channels crate.
///
/// Creates the `channels` table. Call at application startup before using
/// [`SqliteChannelStore`] on a shared pool.
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
