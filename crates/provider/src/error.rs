use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("provider rejected request ({status}): {message}")]
    Api { status: u16, message: String },
}

impl Error {
    /// Whether the provider answered with a 404 — used to treat channel
    /// deletion as idempotent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
