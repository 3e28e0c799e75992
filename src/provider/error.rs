use reqwest::StatusCode;

/// Failure at the provider fetch boundary.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: StatusCode,
        body: String,
    },

    #[error("failed to parse {endpoint} response: {message}")]
    Parse { endpoint: String, message: String },
}

impl FetchError {
    pub fn parse(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Transport errors, throttling and server errors may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            FetchError::Parse { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_retry_only_on_server_side_failures() {
        let status = |code: u16| FetchError::Status {
            endpoint: "x".to_string(),
            status: StatusCode::from_u16(code).unwrap(),
            body: String::new(),
        };
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(401).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!FetchError::parse("x", "bad json").is_retryable());
    }
}
