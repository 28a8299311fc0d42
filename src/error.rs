//! Error types for the portal client.

/// Every failure a dispatched action can end in.
///
/// None of these are retried; each one is terminal for the action that
/// triggered it and is shown to the user as plain text.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport failure or a response body that is not JSON.
    #[error("network error: {0}")]
    Network(String),

    /// The export step failed; the dependent call was never issued.
    #[error("{0}")]
    Export(String),

    /// An AI, Gemini, smart-command or chat invocation failed.
    #[error("{0}")]
    Feature(String),

    /// A direct portal command failed.
    #[error("{0}")]
    Command(String),

    /// A speech service is not available in this environment.
    #[error("{0}")]
    Unsupported(String),

    /// Terminal or child-process I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::ClientError;

    #[test]
    fn backend_messages_display_verbatim() {
        assert_eq!(
            ClientError::Export("quota exceeded".to_string()).to_string(),
            "quota exceeded"
        );
        assert_eq!(ClientError::Command("Failed".to_string()).to_string(), "Failed");
    }

    #[test]
    fn network_errors_are_prefixed() {
        let err = ClientError::Network("connection refused".to_string());
        assert_eq!(err.to_string(), "network error: connection refused");
    }
}
