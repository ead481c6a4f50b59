// Error types for the B2 client. Every operation returns `B2Result<T>`;
// only `Client::upload_file` looks inside an error to decide on a retry.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for B2 operations.
pub type B2Result<T> = Result<T, B2Error>;

/// Errors that can occur while talking to B2.
#[derive(Debug, Error)]
pub enum B2Error {
    /// `b2_authorize_account` rejected the credentials (or failed).
    #[error("Authorization failed: {status} - {body}")]
    Authorization { status: StatusCode, body: String },

    /// Any other endpoint answered with a non-2xx status.
    #[error("Request failed: {status} - {body}")]
    Http { status: StatusCode, body: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl B2Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// HTTP status carried by the error, if the service answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Authorization { status, .. } | Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// B2 answers 401 when an upload token expired and 503 when the upload
    /// pod is busy; both are cured by fetching a new upload URL.
    pub fn is_retryable_upload(&self) -> bool {
        matches!(
            self,
            Self::Http { status, .. }
                if *status == StatusCode::UNAUTHORIZED
                    || *status == StatusCode::SERVICE_UNAVAILABLE
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(code: u16) -> B2Error {
        B2Error::Http {
            status: StatusCode::from_u16(code).unwrap(),
            body: String::new(),
        }
    }

    #[test]
    fn only_401_and_503_are_retryable() {
        assert!(http(401).is_retryable_upload());
        assert!(http(503).is_retryable_upload());
        assert!(!http(403).is_retryable_upload());
        assert!(!http(500).is_retryable_upload());
    }

    #[test]
    fn authorization_errors_are_not_upload_retryable() {
        let err = B2Error::Authorization {
            status: StatusCode::UNAUTHORIZED,
            body: "bad_auth_token".into(),
        };
        assert!(!err.is_retryable_upload());
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn display_includes_status_and_body() {
        let err = B2Error::Http {
            status: StatusCode::NOT_FOUND,
            body: "{\"code\":\"not_found\"}".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("404"));
        assert!(msg.contains("not_found"));
    }
}
