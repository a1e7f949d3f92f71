//! Owner identity extraction.
//!
//! Authentication and authorization live in front of this service; by the
//! time a request arrives, the upstream layer has resolved the caller and
//! injected their identity as a header. Requests without it are rejected.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

pub const OWNER_HEADER: &str = "x-owner-id";

/// The authenticated owner on whose behalf a request runs.
#[derive(Debug, Clone)]
pub struct OwnerId(pub String);

impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| Self(v.to_string()))
            .ok_or_else(|| ApiError::unauthorized("missing owner identity"))
    }
}
