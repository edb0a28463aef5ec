use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("API request failed: {message}")]
    RequestFailed {
        message: String,
        status: Option<u16>,
    },

    #[error("Server error (status {status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    #[error("Client configuration error: {0}")]
    ConfigurationError(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Map a non-2xx status plus body text onto the taxonomy.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => ClientError::AuthenticationError(body),
            500..=599 => ClientError::ServerError {
                status,
                message: body,
            },
            _ => ClientError::RequestFailed {
                message: body,
                status: Some(status),
            },
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::ServerError { .. } | ClientError::NetworkError(_) | ClientError::Timeout(_)
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            ClientError::ServerError { status, message } => {
                format!("Server error ({}): {}", status, message)
            }
            ClientError::AuthenticationError(msg) => format!("Authentication error: {}", msg),
            ClientError::NetworkError(msg) => format!("Network error: {}", msg),
            ClientError::Timeout(secs) => format!("Request timed out after {} seconds", secs),
            ClientError::RequestFailed { message, status } => match status {
                Some(status) => format!("API error {}: {}", status, message),
                None => format!("API error: {}", message),
            },
            _ => self.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ClientError::Timeout(super::REQUEST_TIMEOUT_SECS)
        } else if error.is_decode() {
            ClientError::InvalidResponse(error.to_string())
        } else {
            ClientError::NetworkError(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_the_taxonomy() {
        assert!(matches!(
            ClientError::from_status(401, "nope".to_string()),
            ClientError::AuthenticationError(_)
        ));
        assert!(matches!(
            ClientError::from_status(503, "down".to_string()),
            ClientError::ServerError { status: 503, .. }
        ));
        assert!(matches!(
            ClientError::from_status(404, "missing".to_string()),
            ClientError::RequestFailed {
                status: Some(404),
                ..
            }
        ));
    }

    #[test]
    fn server_and_network_errors_are_retryable() {
        assert!(
            ClientError::ServerError {
                status: 500,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(ClientError::NetworkError("reset".to_string()).is_retryable());
        assert!(!ClientError::AuthenticationError("bad key".to_string()).is_retryable());
    }

    #[test]
    fn user_message_includes_the_status() {
        let error = ClientError::from_status(418, "teapot".to_string());
        assert_eq!(error.user_message(), "API error 418: teapot");
    }
}
