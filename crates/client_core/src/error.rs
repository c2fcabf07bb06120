use shared::error::ErrorCode;
use thiserror::Error;

/// Failure reported by a remote authoring service.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("service returned {status}: {}", message.as_deref().unwrap_or("no message"))]
    Server {
        status: u16,
        code: Option<ErrorCode>,
        message: Option<String>,
    },
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response payload: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            code: None,
            message: Some(message.into()),
        }
    }

    /// Message supplied by the service itself, if it sent one.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            Self::Server { message, .. } => message.as_deref().filter(|m| !m.trim().is_empty()),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// The operation was superseded or explicitly cancelled. Never a user-facing failure.
    #[error("operation cancelled")]
    Cancelled,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl ClientError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Most specific message available for display, falling back to `generic`.
    pub fn user_message(&self, generic: &str) -> String {
        match self {
            Self::Remote(err) => err.remote_message().unwrap_or(generic).to_string(),
            Self::Validation(message) => message.clone(),
            Self::Cancelled => generic.to_string(),
        }
    }
}
