#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("{operation} request timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },

    #[error("empty response from {provider}")]
    EmptyResponse { provider: &'static str },

    #[error("invalid Ollama base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_operation() {
        let err = LlmError::Timeout {
            operation: "chat",
            seconds: 300,
        };
        assert_eq!(err.to_string(), "chat request timed out after 300s");
    }

    #[test]
    fn other_is_transparent() {
        let err = LlmError::Other("model not found".into());
        assert_eq!(err.to_string(), "model not found");
    }
}
