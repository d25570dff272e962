use thiserror::Error;

/// Coarse classification used when deciding how a failure is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transport,
    Protocol,
    Application,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Rejected locally before any request was sent.
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Transport(String),
    #[error("{status} {body}")]
    Status { status: u16, body: String },
    #[error("invalid response body: {0}")]
    Protocol(String),
    /// Well-formed answer in which the service reports a failure.
    #[error("{}", .message.as_deref().unwrap_or("request rejected by the service"))]
    Rejected { status: u16, message: Option<String> },
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Transport(_) | Self::Status { .. } => ErrorKind::Transport,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Rejected { .. } => ErrorKind::Application,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Protocol(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        Self::Protocol(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_error_taxonomy() {
        assert_eq!(
            ClientError::Validation("empty".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ClientError::Status {
                status: 502,
                body: String::new()
            }
            .kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            ClientError::Protocol("eof".into()).kind(),
            ErrorKind::Protocol
        );
        assert_eq!(
            ClientError::Rejected {
                status: 400,
                message: None
            }
            .kind(),
            ErrorKind::Application
        );
    }

    #[test]
    fn rejected_without_message_has_fallback_text() {
        let err = ClientError::Rejected {
            status: 503,
            message: None,
        };
        assert_eq!(err.to_string(), "request rejected by the service");
    }
}
