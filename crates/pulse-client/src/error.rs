use pulse_types::error::ErrorKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The server answered and refused the operation.
    #[error("{kind}: {message}")]
    Rejected { kind: ErrorKind, message: String },

    /// No answer within the request timeout. The server may or may not have
    /// applied the operation.
    #[error("request timed out")]
    Timeout,

    /// The request never reached the server.
    #[error("could not reach server: {0}")]
    Connect(String),

    /// The connection failed mid-request.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// True when the operation may have taken effect despite the error. The
    /// caller should re-list rather than assume it failed.
    pub fn is_outcome_unknown(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transport(_))
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Rejected { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else if e.is_builder() {
            Self::Config(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeouts_and_transport_failures_are_unknown() {
        assert!(ClientError::Timeout.is_outcome_unknown());
        assert!(ClientError::Transport("reset".into()).is_outcome_unknown());
        assert!(!ClientError::Connect("refused".into()).is_outcome_unknown());
        let rejected = ClientError::Rejected {
            kind: ErrorKind::NotFound,
            message: "broadcast not found".into(),
        };
        assert!(!rejected.is_outcome_unknown());
        assert_eq!(rejected.kind(), Some(ErrorKind::NotFound));
        assert_eq!(rejected.to_string(), "not_found: broadcast not found");
    }
}
