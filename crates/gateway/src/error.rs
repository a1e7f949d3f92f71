//! Mapping of domain errors onto HTTP responses.

use {
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    serde_json::json,
    tracing::error,
};

/// HTTP-facing error: status code plus a client-readable message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

impl From<outreach_campaigns::Error> for ApiError {
    fn from(err: outreach_campaigns::Error) -> Self {
        use outreach_campaigns::Error;
        match err {
            Error::Invalid { message } => Self::new(StatusCode::BAD_REQUEST, message),
            Error::Conflict { message } => Self::new(StatusCode::CONFLICT, message),
            Error::CampaignNotFound { .. } | Error::ChannelNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, err.to_string())
            },
            Error::Provider(e) => Self::new(StatusCode::BAD_GATEWAY, e.to_string()),
            other => {
                error!(error = %other, "campaign request failed");
                Self::internal()
            },
        }
    }
}

impl From<outreach_channels::Error> for ApiError {
    fn from(err: outreach_channels::Error) -> Self {
        use outreach_channels::Error;
        match err {
            Error::ChannelNotFound { .. } => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            Error::Provider(e) => Self::new(StatusCode::BAD_GATEWAY, e.to_string()),
            other => {
                error!(error = %other, "channel request failed");
                Self::internal()
            },
        }
    }
}
