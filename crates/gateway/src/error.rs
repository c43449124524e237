use serde::Deserialize;
use thiserror::Error;

/// The shapes the IAM backend uses to describe a failed request.
/// Any of the fields may be missing, and some endpoints answer with no body at all.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorBody {
    /// First non-empty of `error`, `error_description`, `detail`.
    pub fn message(&self) -> Option<&str> {
        [&self.error, &self.error_description, &self.detail]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|message| !message.trim().is_empty())
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum GatewayError {
    #[error("server answered with status {status}")]
    Status {
        status: u16,
        status_text: Option<String>,
        body: Option<ErrorBody>,
    },
    #[error("request could not be completed: {0}")]
    Transport(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("invalid request target: {0}")]
    InvalidUrl(String),
}

impl GatewayError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Best effort message for a human: the server's own explanation, then the status text.
    /// Transport and decode failures carry nothing worth showing.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Status {
                status_text, body, ..
            } => body
                .as_ref()
                .and_then(ErrorBody::message)
                .map(str::to_owned)
                .or_else(|| status_text.clone().filter(|text| !text.is_empty())),
            Self::InvalidUrl(reason) => Some(reason.clone()),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }

    pub fn describe(&self, fallback: &str) -> String {
        self.message().unwrap_or_else(|| fallback.to_owned())
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::InvalidUrl(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(body: Option<ErrorBody>, status_text: Option<&str>) -> GatewayError {
        GatewayError::Status {
            status: 400,
            status_text: status_text.map(str::to_owned),
            body,
        }
    }

    #[test]
    fn message_prefers_error_then_description_then_detail() {
        let body = ErrorBody {
            error: Some("invalid_client".into()),
            error_description: Some("bad client".into()),
            detail: Some("detail".into()),
        };
        assert_eq!(
            status_error(Some(body), Some("Bad Request")).message().as_deref(),
            Some("invalid_client")
        );

        let body = ErrorBody {
            error: Some("  ".into()),
            error_description: None,
            detail: Some("client name is required".into()),
        };
        assert_eq!(
            status_error(Some(body), Some("Bad Request")).message().as_deref(),
            Some("client name is required")
        );
    }

    #[test]
    fn message_falls_back_to_status_text_then_generic() {
        let err = status_error(Some(ErrorBody::default()), Some("Conflict"));
        assert_eq!(err.describe("Error saving client!"), "Conflict");

        let err = status_error(None, None);
        assert_eq!(err.describe("Error saving client!"), "Error saving client!");

        let err = GatewayError::Transport("connection refused".into());
        assert_eq!(err.describe("Error saving client!"), "Error saving client!");
    }

    #[test]
    fn not_found_is_detected_by_status() {
        let err = GatewayError::Status {
            status: 404,
            status_text: Some("Not Found".into()),
            body: None,
        };
        assert!(err.is_not_found());
        assert!(!GatewayError::Transport("reset".into()).is_not_found());
    }
}
