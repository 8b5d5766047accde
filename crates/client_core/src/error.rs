use shared::error::{ErrorKind, UserFacingError};
use thiserror::Error;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error: could not reach the generator service";
pub const TIMEOUT_ERROR_MESSAGE: &str = "Network error: the generator service timed out";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base url {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed response from {path}: {reason}")]
    Malformed { path: String, reason: String },
    #[error("server returned {status}: {}", message.as_deref().unwrap_or("<no error body>"))]
    Server { status: u16, message: Option<String> },
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Server { .. } => ErrorKind::Server,
            Self::InvalidBaseUrl { .. } => ErrorKind::Internal,
            Self::Timeout(_) | Self::Transport(_) | Self::Malformed { .. } => ErrorKind::Network,
        }
    }

    /// Message shown to the user. Server errors are surfaced verbatim; `fallback`
    /// covers a non-2xx response that carried no `error` field.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Server {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            Self::Server { .. } => fallback.to_string(),
            Self::Timeout(_) => TIMEOUT_ERROR_MESSAGE.to_string(),
            Self::Transport(_) | Self::Malformed { .. } => NETWORK_ERROR_MESSAGE.to_string(),
            Self::InvalidBaseUrl { .. } => self.to_string(),
        }
    }

    pub fn to_user_facing(&self, fallback: &str) -> UserFacingError {
        UserFacingError::new(self.kind(), self.user_message(fallback))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
