use reqwest::StatusCode;
use thiserror::Error;

/// Everything that can go wrong while driving an account.
///
/// The cycle loop decides how to recover based on the variant: a broken
/// session stops the account for good, anything else is retried after a
/// backoff.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("session is no longer valid: {0}")]
    SessionInvalid(String),

    #[error("request failed with status {status}: {message}")]
    Transient { status: u16, message: String },

    #[error("{0}")]
    Unknown(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl BotError {
    /// Classify a non-success HTTP response.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            BotError::SessionInvalid(format!("{}: {}", status, body))
        } else {
            BotError::Transient {
                status: status.as_u16(),
                message: body,
            }
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, BotError::SessionInvalid(_))
    }
}

impl From<reqwest::Error> for BotError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => BotError::from_status(status, e.to_string()),
            None => BotError::Unknown(format!("HTTP request failed: {}", e)),
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(e: serde_json::Error) -> Self {
        BotError::Unknown(format!("Failed to decode payload: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_is_fatal() {
        let err = BotError::from_status(StatusCode::UNAUTHORIZED, "expired".to_string());
        assert!(err.is_fatal());
    }

    #[test]
    fn server_error_is_transient() {
        let err = BotError::from_status(StatusCode::BAD_GATEWAY, String::new());
        assert!(matches!(err, BotError::Transient { status: 502, .. }));
        assert!(!err.is_fatal());
    }
}
