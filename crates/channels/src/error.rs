use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Provider(#[from] outreach_provider::Error),

    #[error("channel not found: {channel_id}")]
    ChannelNotFound { channel_id: String },
}

impl Error {
    #[must_use]
    pub fn channel_not_found(channel_id: impl Into<String>) -> Self {
        Self::ChannelNotFound {
            channel_id: channel_id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
