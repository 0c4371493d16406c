use pulse_types::error::ErrorKind;

pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Outcome of a rejected delivery operation. Every variant is meant to reach
/// the caller as a distinct, displayable failure.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Malformed input: empty body, unknown category, oversized payload.
    #[error("{0}")]
    Validation(String),

    /// No resolvable caller.
    #[error("{0}")]
    Authentication(String),

    /// The caller's role may not perform this mutation.
    #[error("{0}")]
    Authorization(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl DeliveryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<rusqlite::Error> for DeliveryError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Internal(e.into())
    }
}
