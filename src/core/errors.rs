use thiserror::Error;

use crate::core::models::SequencePosition;

#[derive(Error, Debug)]
pub enum PracticeError {
    #[error("Network error: {0}")]
    Network(Box<reqwest::Error>),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("HTTP error {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Malformed batch: {0}")]
    Validation(String),

    #[error("Position {0} already has a recorded result")]
    SubmissionConflict(SequencePosition),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("PracticeError: {0}")]
    Custom(String),
}

impl PracticeError {
    /// Transient failures the transport may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            PracticeError::Network(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            PracticeError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, PracticeError::Auth(_))
    }

    /// Short title used for user-facing notifications.
    pub fn title(&self) -> &'static str {
        match self {
            PracticeError::Network(_) => "Connection Problem",
            PracticeError::Auth(_) => "Signed Out",
            PracticeError::HttpStatus { .. } => "Server Error",
            PracticeError::Validation(_) => "Invalid Practice Data",
            PracticeError::SubmissionConflict(_) => "Already Submitted",
            PracticeError::Json(_) => "Unexpected Response",
            PracticeError::Io(_) => "File Error",
            PracticeError::Custom(_) => "Error",
        }
    }
}

impl From<reqwest::Error> for PracticeError {
    fn from(error: reqwest::Error) -> Self {
        PracticeError::Network(Box::new(error))
    }
}

impl From<std::io::Error> for PracticeError {
    fn from(error: std::io::Error) -> Self {
        PracticeError::Io(Box::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        let server = PracticeError::HttpStatus { status: 503, url: "http://x".into() };
        let throttled = PracticeError::HttpStatus { status: 429, url: "http://x".into() };
        let rejected = PracticeError::HttpStatus { status: 404, url: "http://x".into() };

        assert!(server.is_retryable());
        assert!(!throttled.is_retryable());
        assert!(!rejected.is_retryable());
        assert!(!PracticeError::Validation("dup".into()).is_retryable());
        assert!(!PracticeError::Auth("expired".into()).is_retryable());
    }

    #[test]
    fn test_titles_and_auth() {
        assert!(PracticeError::Auth("expired".into()).is_auth());
        assert!(!PracticeError::SubmissionConflict(3).is_auth());
        assert_eq!(PracticeError::Validation("x".into()).title(), "Invalid Practice Data");
    }
}
