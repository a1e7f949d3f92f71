use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Provider(#[from] outreach_provider::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),

    #[error("{message}")]
    Invalid { message: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("campaign not found: {campaign_id}")]
    CampaignNotFound { campaign_id: String },

    #[error("channel not found: {channel_id}")]
    ChannelNotFound { channel_id: String },
}

impl Error {
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn campaign_not_found(campaign_id: impl Into<String>) -> Self {
        Self::CampaignNotFound {
            campaign_id: campaign_id.into(),
        }
    }

    #[must_use]
    pub fn channel_not_found(channel_id: impl Into<String>) -> Self {
        Self::ChannelNotFound {
            channel_id: channel_id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
